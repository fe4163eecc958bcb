// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    normalize_listings, BorrowRequest, Category, CategoryFilter, CoordinateSource, FilterError,
    FilterState, GeoPoint, Listing, MaxDistance, Message, NormalizeError, NormalizedBatch,
    PriceRange, RawListing, Route, SortKey, UserPosition, UserProfile, ALL_SENTINEL, PRICE_CEILING,
};
pub use requests::{DiscoverQuery, RouteRequest};
pub use responses::{
    BadgeResponse, CatalogStatusView, DiscoverResponse, ErrorResponse, HealthResponse,
    ListingView, MapMarker, RequestView, RequestsResponse, RouteResponse,
};
