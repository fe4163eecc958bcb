//! DharLink Discovery - nearby item discovery for the DharLink lending marketplace
//!
//! This library turns the marketplace's listings into the "nearby items" view:
//! distances from the user, a five-stage filter pipeline and a sort stage. It
//! also covers driving routes to a listing and the karma badge ladder.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{haversine_distance, Badge, DiscoveryPipeline, FilterStage};
pub use crate::models::{FilterState, GeoPoint, Listing, MaxDistance, PriceRange, SortKey, UserPosition};
