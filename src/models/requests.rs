use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::domain::{
    CategoryFilter, FilterError, FilterState, MaxDistance, PriceRange, SortKey, UserPosition,
    PRICE_CEILING,
};

/// Query string of the discover endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_discover_query", skip_on_field_errors = false))]
pub struct DiscoverQuery {
    #[serde(default)]
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[serde(rename = "minPrice", default)]
    #[validate(range(min = 0.0, max = 5000.0))]
    pub min_price: Option<f64>,
    #[serde(rename = "maxPrice", default)]
    #[validate(range(min = 0.0, max = 5000.0))]
    pub max_price: Option<f64>,
    #[serde(rename = "maxDistance", default)]
    pub max_distance: Option<String>,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub q: Option<String>,
    #[serde(rename = "favoritesOnly", default)]
    pub favorites_only: Option<bool>,
    #[serde(default)]
    pub sort: Option<SortKey>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: Option<f64>,
    #[validate(range(min = 0.0))]
    pub accuracy: Option<f64>,
}

fn validate_discover_query(query: &DiscoverQuery) -> Result<(), ValidationError> {
    let low = query.min_price.unwrap_or(0.0);
    let high = query.max_price.unwrap_or(PRICE_CEILING);
    if low > high {
        return Err(ValidationError::new("min_price_above_max_price"));
    }
    let coordinates = [query.lat, query.lng, query.accuracy];
    if coordinates.iter().flatten().any(|v| !v.is_finite()) {
        return Err(ValidationError::new("coordinates_must_be_finite"));
    }
    if query.lat.is_some() != query.lng.is_some() {
        return Err(ValidationError::new("lat_and_lng_must_be_paired"));
    }
    Ok(())
}

impl DiscoverQuery {
    /// Build the filter state, using `default_max_distance` when none is given
    pub fn filter_state(&self, default_max_distance: MaxDistance) -> Result<FilterState, FilterError> {
        let category: CategoryFilter = self
            .category
            .as_deref()
            .filter(|c| !c.is_empty())
            .and_then(|c| c.parse().ok())
            .unwrap_or_default();
        let price = PriceRange::new(
            self.min_price.unwrap_or(0.0),
            self.max_price.unwrap_or(PRICE_CEILING),
        )?;
        let max_distance = match self.max_distance.as_deref() {
            Some(raw) => raw.parse::<MaxDistance>()?,
            None => default_max_distance,
        };

        Ok(FilterState {
            category,
            price,
            max_distance,
            search: self.q.clone().unwrap_or_default(),
            favorites_only: self.favorites_only.unwrap_or(false),
        })
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort.unwrap_or_default()
    }

    /// User position, present only when both coordinates are given
    pub fn user_position(&self) -> Option<UserPosition> {
        let (lat, lng) = (self.lat?, self.lng?);
        let position = UserPosition::new(lat, lng);
        Some(match self.accuracy {
            Some(accuracy) => position.with_accuracy(accuracy),
            None => position,
        })
    }
}

/// Request a driving route to a listing
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RouteRequest {
    #[serde(alias = "session_id", rename = "sessionId", default)]
    #[validate(length(min = 1, max = 128))]
    pub session_id: Option<String>,
    #[validate(length(min = 1))]
    #[serde(alias = "listing_id", rename = "listingId")]
    pub listing_id: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
}
