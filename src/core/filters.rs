use crate::models::{CategoryFilter, FilterState, Listing, MaxDistance, PriceRange};

/// One predicate of the filter pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStage {
    Category,
    Price,
    MaxDistance,
    Search,
    Favorites,
}

impl FilterStage {
    /// Fixed pipeline order, narrowest-first
    pub const ORDER: [FilterStage; 5] = [
        FilterStage::Category,
        FilterStage::Price,
        FilterStage::MaxDistance,
        FilterStage::Search,
        FilterStage::Favorites,
    ];

    /// Check a single listing against this stage
    #[inline]
    pub fn matches(&self, listing: &Listing, state: &FilterState) -> bool {
        match self {
            FilterStage::Category => matches_category(listing, &state.category),
            FilterStage::Price => matches_price(listing, &state.price),
            FilterStage::MaxDistance => matches_max_distance(listing, state.max_distance),
            FilterStage::Search => matches_search(listing, &state.search),
            FilterStage::Favorites => matches_favorites(listing, state.favorites_only),
        }
    }
}

/// Stage 1: exact category match unless the selector is "all"
#[inline]
pub fn matches_category(listing: &Listing, category: &CategoryFilter) -> bool {
    match category {
        CategoryFilter::All => true,
        CategoryFilter::Only(name) => listing.category == *name,
    }
}

/// Stage 2: inclusive price bounds
#[inline]
pub fn matches_price(listing: &Listing, range: &PriceRange) -> bool {
    range.contains(listing.price)
}

/// Stage 3: distance ceiling
///
/// Unknown distance fails closed under a finite ceiling.
#[inline]
pub fn matches_max_distance(listing: &Listing, max_distance: MaxDistance) -> bool {
    match max_distance {
        MaxDistance::Unbounded => true,
        MaxDistance::Km(ceiling) => listing.distance_km.is_some_and(|d| d <= ceiling),
    }
}

/// Stage 4: case-insensitive substring of title or address
#[inline]
pub fn matches_search(listing: &Listing, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();

    listing.title.to_lowercase().contains(&needle)
        || listing
            .address
            .as_ref()
            .is_some_and(|address| address.to_lowercase().contains(&needle))
}

/// Stage 5: favorites only, when toggled on
#[inline]
pub fn matches_favorites(listing: &Listing, favorites_only: bool) -> bool {
    !favorites_only || listing.favorite
}

impl FilterState {
    /// Run all stages in the fixed pipeline order
    pub fn apply(&self, listings: Vec<Listing>) -> Vec<Listing> {
        self.apply_in_order(listings, &FilterStage::ORDER)
    }

    /// Run the given stages in the given order
    pub fn apply_in_order(&self, listings: Vec<Listing>, stages: &[FilterStage]) -> Vec<Listing> {
        stages.iter().fold(listings, |remaining, stage| {
            remaining
                .into_iter()
                .filter(|listing| stage.matches(listing, self))
                .collect()
        })
    }
}
