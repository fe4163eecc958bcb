use crate::models::{GeoPoint, Route};
use moka::future::Cache;
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors from a route lookup
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RoutingError {
    #[error("routing request failed: {0}")]
    RequestError(String),

    #[error("routing service returned {0}")]
    ApiError(u16),

    #[error("no route between the given points")]
    NoRoute,

    #[error("invalid route geometry: {0}")]
    InvalidGeometry(String),
}

impl From<reqwest::Error> for RoutingError {
    fn from(e: reqwest::Error) -> Self {
        RoutingError::RequestError(e.to_string())
    }
}

/// Anything that can produce a route between two points
pub trait RouteProvider: Send + Sync {
    fn route(&self, from: GeoPoint, to: GeoPoint) -> impl Future<Output = Result<Route, RoutingError>> + Send;
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<Vec<f64>>,
}

/// OSRM HTTP client
///
/// Issues one `route` request per lookup with full GeoJSON overview.
pub struct OsrmClient {
    base_url: String,
    profile: String,
    client: Client,
}

impl OsrmClient {
    pub fn new(base_url: String, profile: String, timeout: Duration) -> Result<Self, RoutingError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            profile,
            client,
        })
    }

    fn route_url(&self, from: GeoPoint, to: GeoPoint) -> String {
        format!(
            "{}/route/v1/{}/{},{};{},{}?overview=full&geometries=geojson",
            self.base_url.trim_end_matches('/'),
            self.profile,
            from.lng,
            from.lat,
            to.lng,
            to.lat
        )
    }
}

impl RouteProvider for OsrmClient {
    async fn route(&self, from: GeoPoint, to: GeoPoint) -> Result<Route, RoutingError> {
        let url = self.route_url(from, to);
        tracing::debug!("Requesting route: {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let text = response.text().await?;
        let body: OsrmResponse = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(_) if !status.is_success() => return Err(RoutingError::ApiError(status.as_u16())),
            Err(e) => return Err(RoutingError::InvalidGeometry(e.to_string())),
        };

        // OSRM answers "NoRoute" with a 400 and an empty route list
        let Some(first) = body.routes.into_iter().next() else {
            return Err(if status.is_success() || status.as_u16() == 400 {
                RoutingError::NoRoute
            } else {
                RoutingError::ApiError(status.as_u16())
            });
        };
        if !status.is_success() {
            return Err(RoutingError::ApiError(status.as_u16()));
        }

        decode_geometry(&first.geometry.coordinates)
    }
}

/// Turn GeoJSON `[lng, lat]` pairs into ordered waypoints
pub fn decode_geometry(coordinates: &[Vec<f64>]) -> Result<Route, RoutingError> {
    let waypoints = coordinates
        .iter()
        .map(|pair| match pair.as_slice() {
            [lng, lat, ..] => {
                let point = GeoPoint::new(*lat, *lng);
                if point.is_valid() {
                    Ok(point)
                } else {
                    Err(RoutingError::InvalidGeometry(format!("out of range: {:?}", pair)))
                }
            }
            _ => Err(RoutingError::InvalidGeometry(format!("short coordinate: {:?}", pair))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    if waypoints.is_empty() {
        return Err(RoutingError::NoRoute);
    }
    Ok(Route { waypoints })
}

/// External turn-by-turn directions link for a destination
pub fn directions_url(destination: &GeoPoint) -> String {
    format!(
        "https://www.google.com/maps/dir/?api=1&destination={},{}",
        destination.lat, destination.lng
    )
}

/// Route shown for one session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteState {
    pub route: Option<Route>,
    /// Listing the current route leads to
    pub listing_id: Option<String>,
    pub destination: Option<GeoPoint>,
    /// Failure of the most recent lookup; the previous route is kept
    pub last_error: Option<RoutingError>,
}

/// Holds the current route of a session
///
/// Lookups are not cancelled when a newer one starts. Each applies its
/// outcome when it resolves, so the lookup that resolves last wins.
#[derive(Debug, Default)]
pub struct RouteTracker {
    state: RwLock<RouteState>,
}

impl RouteTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn current(&self) -> RouteState {
        self.state.read().await.clone()
    }

    /// Look up a route to a listing and apply the outcome
    pub async fn lookup<P: RouteProvider>(
        &self,
        provider: &P,
        from: GeoPoint,
        listing_id: &str,
        to: GeoPoint,
    ) -> RouteState {
        let outcome = provider.route(from, to).await;

        let mut state = self.state.write().await;
        match outcome {
            Ok(route) => {
                tracing::debug!("Route to {} has {} waypoints", listing_id, route.waypoints.len());
                state.route = Some(route);
                state.listing_id = Some(listing_id.to_string());
                state.destination = Some(to);
                state.last_error = None;
            }
            Err(e) => {
                tracing::warn!("Route lookup to {} failed, keeping previous route: {}", listing_id, e);
                state.last_error = Some(e);
            }
        }
        state.clone()
    }

    /// Drop the route and any error
    pub async fn clear(&self) {
        *self.state.write().await = RouteState::default();
    }
}

/// Route trackers keyed by session id, expiring when idle
#[derive(Clone)]
pub struct RouteBook {
    sessions: Cache<String, Arc<RouteTracker>>,
}

impl RouteBook {
    pub fn new(max_sessions: u64, idle_ttl: Duration) -> Self {
        let sessions = Cache::builder()
            .max_capacity(max_sessions)
            .time_to_idle(idle_ttl)
            .build();

        Self { sessions }
    }

    /// Tracker for a session, created on first use
    pub async fn tracker(&self, session_id: &str) -> Arc<RouteTracker> {
        self.sessions
            .get_with(session_id.to_string(), async { Arc::new(RouteTracker::new()) })
            .await
    }

    /// Tracker for a session only if it already exists
    pub async fn existing(&self, session_id: &str) -> Option<Arc<RouteTracker>> {
        self.sessions.get(session_id).await
    }

    pub async fn remove(&self, session_id: &str) {
        self.sessions.invalidate(session_id).await;
    }
}
