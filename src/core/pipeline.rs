use crate::core::{annotate::annotate_distances, sort::sort_listings};
use crate::models::{FilterState, GeoPoint, Listing, SortKey, UserPosition, ALL_SENTINEL};

/// Map center used when the user's position is unknown (Dhaka)
pub const DEFAULT_CENTER: GeoPoint = GeoPoint {
    lat: 23.8103,
    lng: 90.4125,
};

/// Result of one discovery run
#[derive(Debug)]
pub struct DiscoveryResult {
    /// Filtered, sorted, distance-annotated listings
    pub listings: Vec<Listing>,
    /// `"all"` followed by every category of the input, first-seen order
    pub available_categories: Vec<String>,
    pub center: GeoPoint,
    pub total_candidates: usize,
}

impl DiscoveryResult {
    /// Listings that can be placed on a map
    pub fn mappable(&self) -> impl Iterator<Item = &Listing> {
        self.listings.iter().filter(|l| l.position.is_some())
    }
}

/// Discovery orchestrator - turns raw listings into the nearby-items view
///
/// # Pipeline Stages
/// 1. Distance annotation against the user position
/// 2. Filtering (category, price, max distance, search, favorites)
/// 3. Sorting by the selected key
#[derive(Debug, Clone)]
pub struct DiscoveryPipeline {
    default_center: GeoPoint,
}

impl DiscoveryPipeline {
    pub fn new(default_center: GeoPoint) -> Self {
        Self { default_center }
    }

    pub fn default_center(&self) -> GeoPoint {
        self.default_center
    }

    /// Run the full pipeline over a listing set
    ///
    /// # Arguments
    /// * `listings` - Normalized listings from the catalog
    /// * `user` - The user's position, if location access was granted
    /// * `filter` - Current filter selections
    /// * `sort` - Ordering for the result
    pub fn run(
        &self,
        listings: Vec<Listing>,
        user: Option<&UserPosition>,
        filter: &FilterState,
        sort: SortKey,
    ) -> DiscoveryResult {
        let total_candidates = listings.len();
        let available_categories = collect_categories(&listings);

        let annotated = annotate_distances(user, listings);
        let filtered = filter.apply(annotated);
        let sorted = sort_listings(&filtered, sort);

        tracing::debug!(
            "Discovery kept {} of {} listings (sort: {:?})",
            sorted.len(),
            total_candidates,
            sort
        );

        DiscoveryResult {
            listings: sorted,
            available_categories,
            center: user.map(|u| u.point).unwrap_or(self.default_center),
            total_candidates,
        }
    }
}

impl Default for DiscoveryPipeline {
    fn default() -> Self {
        Self::new(DEFAULT_CENTER)
    }
}

fn collect_categories(listings: &[Listing]) -> Vec<String> {
    let mut categories = vec![ALL_SENTINEL.to_string()];
    for listing in listings {
        if !categories.contains(&listing.category) {
            categories.push(listing.category.clone());
        }
    }
    categories
}
