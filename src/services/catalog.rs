use crate::models::{normalize_listings, CatalogStatusView, Listing};
use crate::services::marketplace::{MarketplaceClient, MarketplaceError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Freshness of the catalog data
#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    /// No refresh has completed yet
    Loading,
    Ready,
    /// The latest refresh failed; data is from an earlier refresh (or empty)
    Stale { error: String },
}

/// Immutable view of the catalog at one point in time
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub listings: Arc<Vec<Listing>>,
    pub categories: Arc<Vec<String>>,
    pub status: LoadStatus,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub quarantined: usize,
}

impl CatalogSnapshot {
    fn empty() -> Self {
        Self {
            listings: Arc::new(Vec::new()),
            categories: Arc::new(Vec::new()),
            status: LoadStatus::Loading,
            refreshed_at: None,
            quarantined: 0,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self.status, LoadStatus::Stale { .. })
    }

    pub fn find(&self, listing_id: &str) -> Option<&Listing> {
        self.listings.iter().find(|l| l.id == listing_id)
    }
}

impl From<&CatalogSnapshot> for CatalogStatusView {
    fn from(snapshot: &CatalogSnapshot) -> Self {
        let (state, error) = match &snapshot.status {
            LoadStatus::Loading => ("loading", None),
            LoadStatus::Ready => ("ready", None),
            LoadStatus::Stale { error } => ("stale", Some(error.clone())),
        };

        Self {
            state: state.to_string(),
            error,
            refreshed_at: snapshot.refreshed_at,
            listings: snapshot.listings.len(),
            quarantined: snapshot.quarantined,
        }
    }
}

/// Shared listings and categories, owned by the application state
///
/// Readers get a cheap snapshot and never wait on the network. `refresh`
/// replaces the snapshot on success and only flips the status on failure,
/// so callers keep serving the previous data and can offer a retry.
pub struct Catalog {
    client: Arc<MarketplaceClient>,
    snapshot: RwLock<CatalogSnapshot>,
}

impl Catalog {
    pub fn new(client: Arc<MarketplaceClient>) -> Self {
        Self {
            client,
            snapshot: RwLock::new(CatalogSnapshot::empty()),
        }
    }

    pub async fn snapshot(&self) -> CatalogSnapshot {
        self.snapshot.read().await.clone()
    }

    /// Fetch listings and categories and swap in a new snapshot
    pub async fn refresh(&self) -> Result<CatalogSnapshot, MarketplaceError> {
        tracing::info!("Refreshing catalog from {}", self.client.base_url());

        let fetched = tokio::try_join!(self.client.fetch_items(), self.client.fetch_categories());

        let (items, categories) = match fetched {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::error!("Catalog refresh failed, keeping previous data: {}", e);
                let mut snapshot = self.snapshot.write().await;
                snapshot.status = LoadStatus::Stale {
                    error: e.to_string(),
                };
                return Err(e);
            }
        };

        let batch = normalize_listings(items);
        if !batch.quarantined.is_empty() {
            tracing::warn!("Quarantined {} malformed listings", batch.quarantined.len());
        }

        let fresh = CatalogSnapshot {
            listings: Arc::new(batch.listings),
            categories: Arc::new(categories.into_iter().map(|c| c.name).collect()),
            status: LoadStatus::Ready,
            refreshed_at: Some(Utc::now()),
            quarantined: batch.quarantined.len(),
        };

        tracing::info!(
            "Catalog ready: {} listings, {} categories",
            fresh.listings.len(),
            fresh.categories.len()
        );

        *self.snapshot.write().await = fresh.clone();
        Ok(fresh)
    }
}
