// Service exports
pub mod catalog;
pub mod marketplace;
pub mod poller;
pub mod routing;

pub use catalog::{Catalog, CatalogSnapshot, LoadStatus};
pub use marketplace::{MarketplaceClient, MarketplaceError};
pub use poller::{PollHandle, Poller, ThreadSync};
pub use routing::{directions_url, OsrmClient, RouteBook, RouteProvider, RouteState, RouteTracker, RoutingError};
