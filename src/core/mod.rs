// Core algorithm exports
pub mod annotate;
pub mod countdown;
pub mod distance;
pub mod filters;
pub mod karma;
pub mod pipeline;
pub mod sort;

pub use annotate::annotate_distances;
pub use countdown::Countdown;
pub use distance::{distance_between, format_accuracy, format_distance, haversine_distance};
pub use filters::FilterStage;
pub use karma::Badge;
pub use pipeline::{DiscoveryPipeline, DiscoveryResult, DEFAULT_CENTER};
pub use sort::sort_listings;
