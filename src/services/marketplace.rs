use crate::models::{BorrowRequest, Category, Message, UserProfile};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when talking to the marketplace backend
#[derive(Debug, Error)]
pub enum MarketplaceError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Marketplace REST API client
///
/// Handles the read side of the lending backend:
/// - Listings and categories for the discovery catalog
/// - User profiles (karma)
/// - Borrow requests for either side of a deal
/// - Chat threads and their read markers
pub struct MarketplaceClient {
    base_url: String,
    client: Client,
}

impl MarketplaceClient {
    /// Create a new marketplace client
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, MarketplaceError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T, MarketplaceError> {
        let url = self.url(path);
        tracing::debug!("Fetching {} from: {}", what, url);

        let response = self.client.get(&url).send().await?;
        let response = check_status(response, what).await?;

        response
            .json::<T>()
            .await
            .map_err(|e| MarketplaceError::InvalidResponse(format!("Failed to parse {}: {}", what, e)))
    }

    /// Fetch every listing as raw JSON records
    ///
    /// Records are left untyped so a single malformed one can be
    /// quarantined during normalization instead of failing the batch.
    pub async fn fetch_items(&self) -> Result<Vec<Value>, MarketplaceError> {
        let json: Value = self.get_json("items/all", "items").await?;

        match json {
            Value::Array(items) => {
                tracing::debug!("Fetched {} raw listings", items.len());
                Ok(items)
            }
            _ => Err(MarketplaceError::InvalidResponse("Expected an array of items".into())),
        }
    }

    /// Fetch category names
    pub async fn fetch_categories(&self) -> Result<Vec<Category>, MarketplaceError> {
        self.get_json("categories", "categories").await
    }

    /// Get a user's public profile by email
    pub async fn fetch_profile(&self, email: &str) -> Result<UserProfile, MarketplaceError> {
        let path = format!("users/profile-by-email/{}", urlencoding::encode(email));
        let profile: Option<UserProfile> = self.get_json(&path, "profile").await?;

        profile.ok_or_else(|| MarketplaceError::NotFound(format!("Profile not found for user {}", email)))
    }

    /// Requests for items the user owns
    pub async fn fetch_owner_requests(&self, email: &str) -> Result<Vec<BorrowRequest>, MarketplaceError> {
        let path = format!("requests/owner/{}", urlencoding::encode(email));
        self.get_json(&path, "owner requests").await
    }

    /// Requests the user made as a borrower
    pub async fn fetch_borrower_requests(&self, email: &str) -> Result<Vec<BorrowRequest>, MarketplaceError> {
        let path = format!("requests/borrower/{}", urlencoding::encode(email));
        self.get_json(&path, "borrower requests").await
    }

    /// Messages exchanged between two users
    pub async fn fetch_thread(&self, me: &str, peer: &str) -> Result<Vec<Message>, MarketplaceError> {
        let path = format!(
            "messages/thread/{}/{}",
            urlencoding::encode(me),
            urlencoding::encode(peer)
        );
        self.get_json(&path, "message thread").await
    }

    /// Mark every message from `peer` to `me` as read
    pub async fn mark_thread_read(&self, me: &str, peer: &str) -> Result<(), MarketplaceError> {
        let url = self.url(&format!(
            "messages/read-thread/{}/{}",
            urlencoding::encode(me),
            urlencoding::encode(peer)
        ));

        let response = self.client.patch(&url).send().await?;
        check_status(response, "read marker").await?;

        tracing::debug!("Marked thread {} <- {} as read", me, peer);
        Ok(())
    }
}

async fn check_status(response: Response, what: &str) -> Result<Response, MarketplaceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
    tracing::error!("Failed to fetch {}: {} - {}", what, status, body);

    if status == reqwest::StatusCode::NOT_FOUND {
        Err(MarketplaceError::NotFound(what.to_string()))
    } else {
        Err(MarketplaceError::ApiError(format!("Failed to fetch {}: {}", what, status)))
    }
}
