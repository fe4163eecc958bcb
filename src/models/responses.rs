use serde::{Deserialize, Serialize};

use crate::core::{format_distance, Badge, Countdown};
use crate::models::domain::{BorrowRequest, GeoPoint, Listing, Route};
use crate::services::routing::directions_url;

/// Listing as shown in the discover list and map popups
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingView {
    pub id: String,
    pub title: String,
    pub category: String,
    pub price: f64,
    #[serde(rename = "priceUnit")]
    pub price_unit: String,
    pub address: Option<String>,
    #[serde(rename = "isFavorite")]
    pub is_favorite: bool,
    pub image: Option<String>,
    pub status: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Kilometers from the user
    pub distance: Option<f64>,
    #[serde(rename = "distanceLabel")]
    pub distance_label: Option<String>,
    #[serde(rename = "directionsUrl")]
    pub directions_url: Option<String>,
}

impl From<&Listing> for ListingView {
    fn from(listing: &Listing) -> Self {
        Self {
            id: listing.id.clone(),
            title: listing.title.clone(),
            category: listing.category.clone(),
            price: listing.price,
            price_unit: listing.price_unit.clone(),
            address: listing.address.clone(),
            is_favorite: listing.favorite,
            image: listing.image.clone(),
            status: listing.status.clone(),
            lat: listing.position.map(|p| p.lat),
            lng: listing.position.map(|p| p.lng),
            distance: listing.distance_km,
            distance_label: listing.distance_km.map(format_distance),
            directions_url: listing.position.as_ref().map(directions_url),
        }
    }
}

/// Map pin for a listing with a known position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapMarker {
    pub id: String,
    pub title: String,
    pub lat: f64,
    pub lng: f64,
}

/// Catalog freshness as reported to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogStatusView {
    /// `loading`, `ready` or `stale`
    pub state: String,
    pub error: Option<String>,
    #[serde(rename = "refreshedAt")]
    pub refreshed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub listings: usize,
    pub quarantined: usize,
}

/// Response for the discover endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverResponse {
    pub items: Vec<ListingView>,
    pub markers: Vec<MapMarker>,
    pub categories: Vec<String>,
    pub center: GeoPoint,
    #[serde(rename = "userAccuracy")]
    pub user_accuracy: Option<String>,
    #[serde(rename = "totalResults")]
    pub total_results: usize,
    #[serde(rename = "totalCandidates")]
    pub total_candidates: usize,
    #[serde(rename = "catalogStatus")]
    pub catalog_status: CatalogStatusView,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub catalog: CatalogStatusView,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// Current route state for a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResponse {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "listingId")]
    pub listing_id: Option<String>,
    pub destination: Option<GeoPoint>,
    pub route: Option<Route>,
    /// Set when the latest lookup failed; `route` is then the previous one
    pub error: Option<String>,
}

/// Badge for a karma score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeResponse {
    pub email: Option<String>,
    pub karma: i64,
    pub badge: Badge,
    pub label: String,
    pub icon: String,
}

impl BadgeResponse {
    pub fn new(email: Option<String>, karma: i64) -> Self {
        let badge = Badge::from_karma(karma);
        Self {
            email,
            karma,
            badge,
            label: badge.label().to_string(),
            icon: badge.icon().to_string(),
        }
    }
}

/// Borrow request with its return countdown
#[derive(Debug, Clone, Serialize)]
pub struct RequestView {
    #[serde(flatten)]
    pub request: BorrowRequest,
    pub countdown: Option<Countdown>,
}

/// Both sides of a user's borrow requests
#[derive(Debug, Clone, Serialize)]
pub struct RequestsResponse {
    pub incoming: Vec<RequestView>,
    pub outgoing: Vec<RequestView>,
}
