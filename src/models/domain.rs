use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use thiserror::Error;

/// Upper bound of the global price range accepted by filters
pub const PRICE_CEILING: f64 = 5000.0;

/// Wire sentinel meaning "no filter" for category and max distance
pub const ALL_SENTINEL: &str = "all";

/// A geographic point in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite and within latitude/longitude ranges
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Position reported by the user's device, if location access was granted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserPosition {
    pub point: GeoPoint,
    #[serde(rename = "accuracyM", default)]
    pub accuracy_m: Option<f64>,
}

impl UserPosition {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            point: GeoPoint::new(lat, lng),
            accuracy_m: None,
        }
    }

    pub fn with_accuracy(mut self, accuracy_m: f64) -> Self {
        self.accuracy_m = Some(accuracy_m);
        self
    }
}

/// Listing record exactly as the marketplace backend returns it
///
/// Fields are optional and loosely typed; `Listing::try_from` turns this
/// into the canonical shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawListing {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(rename = "priceType", default)]
    pub price_type: Option<String>,
    #[serde(default)]
    pub location: Option<Value>,
    #[serde(default)]
    pub coordinates: Option<Value>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(rename = "isFavorite", default)]
    pub is_favorite: Option<bool>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Where a raw listing keeps its coordinate pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoordinateSource<'a> {
    /// `location.coordinates`, GeoJSON style `[lng, lat]`
    Nested(&'a Value),
    /// top-level `coordinates`, also `[lng, lat]`
    Flat(&'a Value),
}

impl<'a> CoordinateSource<'a> {
    /// Read a longitude-first pair; `None` unless both values are usable numbers
    pub fn resolve(&self) -> Option<GeoPoint> {
        let pair = match self {
            CoordinateSource::Nested(v) | CoordinateSource::Flat(v) => v.as_array()?,
        };
        if pair.len() < 2 {
            return None;
        }
        let point = GeoPoint::new(pair[1].as_f64()?, pair[0].as_f64()?);
        point.is_valid().then_some(point)
    }
}

impl RawListing {
    /// Coordinate sources in resolution priority order
    pub fn coordinate_sources(&self) -> Vec<CoordinateSource<'_>> {
        let mut sources = Vec::with_capacity(2);
        if let Some(nested) = self.location.as_ref().and_then(|l| l.get("coordinates")) {
            sources.push(CoordinateSource::Nested(nested));
        }
        if let Some(flat) = self.coordinates.as_ref() {
            sources.push(CoordinateSource::Flat(flat));
        }
        sources
    }

    /// First coordinate source that yields a valid point
    pub fn resolve_position(&self) -> Option<GeoPoint> {
        self.coordinate_sources().iter().find_map(|s| s.resolve())
    }
}

/// Why a raw listing could not enter the pipeline
#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("listing has no identifier")]
    MissingId,

    #[error("listing {0} has no title")]
    MissingTitle(String),

    #[error("listing {0} has an invalid price")]
    InvalidPrice(String),

    #[error("record is not a listing object: {0}")]
    Malformed(String),
}

/// Canonical listing shape used throughout the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub id: String,
    pub title: String,
    pub category: String,
    pub price: f64,
    pub price_unit: String,
    pub position: Option<GeoPoint>,
    pub address: Option<String>,
    pub favorite: bool,
    pub image: Option<String>,
    pub status: Option<String>,
    /// Kilometers from the user, set by the distance annotator
    pub distance_km: Option<f64>,
}

impl Listing {
    /// Parse and normalize a single backend record
    pub fn from_value(value: Value) -> Result<Self, NormalizeError> {
        let raw: RawListing =
            serde_json::from_value(value).map_err(|e| NormalizeError::Malformed(e.to_string()))?;
        Listing::try_from(raw)
    }
}

fn parse_price(value: &Value) -> Option<f64> {
    let price = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (price.is_finite() && price >= 0.0).then_some(price)
}

impl TryFrom<RawListing> for Listing {
    type Error = NormalizeError;

    fn try_from(raw: RawListing) -> Result<Self, Self::Error> {
        let id = raw
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or(NormalizeError::MissingId)?;
        let title = raw
            .title
            .clone()
            .ok_or_else(|| NormalizeError::MissingTitle(id.clone()))?;
        let price = raw
            .price
            .as_ref()
            .and_then(parse_price)
            .ok_or_else(|| NormalizeError::InvalidPrice(id.clone()))?;
        let position = raw.resolve_position();

        Ok(Listing {
            id,
            title,
            category: raw.category.unwrap_or_default(),
            price,
            price_unit: raw.price_type.unwrap_or_else(|| "day".to_string()),
            position,
            address: raw.address,
            favorite: raw.is_favorite.unwrap_or(false),
            image: raw.image,
            status: raw.status,
            distance_km: None,
        })
    }
}

/// Result of normalizing a whole backend batch
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    pub listings: Vec<Listing>,
    pub quarantined: Vec<NormalizeError>,
}

/// Normalize every record, setting aside the ones that fail
///
/// A bad record never aborts the rest of the batch.
pub fn normalize_listings(values: Vec<Value>) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();
    for value in values {
        match Listing::from_value(value) {
            Ok(listing) => batch.listings.push(listing),
            Err(e) => {
                tracing::warn!("Quarantined listing record: {}", e);
                batch.quarantined.push(e);
            }
        }
    }
    batch
}

/// Category selector
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(String),
}

impl FromStr for CategoryFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ALL_SENTINEL {
            Ok(CategoryFilter::All)
        } else {
            Ok(CategoryFilter::Only(s.to_string()))
        }
    }
}

/// Inclusive price bounds within `[0, PRICE_CEILING]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    low: f64,
    high: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    #[error("price bounds must satisfy 0 <= low <= high <= {ceiling}, got [{low}, {high}]")]
    InvalidPriceRange { low: f64, high: f64, ceiling: f64 },

    #[error("max distance must be a non-negative number of kilometers or \"all\", got {0}")]
    InvalidMaxDistance(String),

    #[error("unknown sort key: {0}")]
    UnknownSortKey(String),
}

impl PriceRange {
    pub fn new(low: f64, high: f64) -> Result<Self, FilterError> {
        if low.is_nan() || high.is_nan() || low < 0.0 || high > PRICE_CEILING || low > high {
            return Err(FilterError::InvalidPriceRange {
                low,
                high,
                ceiling: PRICE_CEILING,
            });
        }
        Ok(Self { low, high })
    }

    #[inline]
    pub fn contains(&self, price: f64) -> bool {
        price >= self.low && price <= self.high
    }
}

impl Default for PriceRange {
    fn default() -> Self {
        Self {
            low: 0.0,
            high: PRICE_CEILING,
        }
    }
}

/// Distance ceiling in kilometers
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaxDistance {
    Unbounded,
    Km(f64),
}

impl Default for MaxDistance {
    fn default() -> Self {
        MaxDistance::Km(10.0)
    }
}

impl FromStr for MaxDistance {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case(ALL_SENTINEL) {
            return Ok(MaxDistance::Unbounded);
        }
        match s.parse::<f64>() {
            Ok(km) if km.is_finite() && km >= 0.0 => Ok(MaxDistance::Km(km)),
            _ => Err(FilterError::InvalidMaxDistance(s.to_string())),
        }
    }
}

/// Ephemeral filter selections for one view
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterState {
    pub category: CategoryFilter,
    pub price: PriceRange,
    pub max_distance: MaxDistance,
    pub search: String,
    pub favorites_only: bool,
}

/// Ordering applied to the filtered set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortKey {
    #[default]
    #[serde(rename = "distance")]
    Distance,
    #[serde(rename = "price-low", alias = "price-asc")]
    PriceAsc,
    #[serde(rename = "price-high", alias = "price-desc")]
    PriceDesc,
    #[serde(rename = "name")]
    Name,
}

impl FromStr for SortKey {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "distance" => Ok(SortKey::Distance),
            "price-low" | "price-asc" => Ok(SortKey::PriceAsc),
            "price-high" | "price-desc" => Ok(SortKey::PriceDesc),
            "name" => Ok(SortKey::Name),
            other => Err(FilterError::UnknownSortKey(other.to_string())),
        }
    }
}

/// Driving route from the user to a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub waypoints: Vec<GeoPoint>,
}

/// Category record from the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
}

/// Public profile of a marketplace user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub karma: i64,
    #[serde(rename = "totalDeals", default)]
    pub total_deals: u32,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Borrow request between a borrower and an item owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowRequest {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "itemTitle", default)]
    pub item_title: String,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "borrowerEmail", default)]
    pub borrower_email: String,
    #[serde(rename = "ownerEmail", default)]
    pub owner_email: String,
    #[serde(rename = "returnTime", default)]
    pub return_time: Option<chrono::DateTime<chrono::Utc>>,
}

/// Chat message in a thread between two users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "senderEmail")]
    pub sender_email: String,
    #[serde(rename = "receiverEmail")]
    pub receiver_email: String,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "isRead", default)]
    pub is_read: bool,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}
