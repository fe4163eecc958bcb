// Integration tests for DharLink discovery

use actix_web::{http::StatusCode, test as http_test, web, App};
use dharlink_discovery::core::{DiscoveryPipeline, DEFAULT_CENTER};
use dharlink_discovery::models::{
    normalize_listings, CategoryFilter, FilterState, GeoPoint, MaxDistance, PriceRange, Route,
    SortKey, UserPosition,
};
use dharlink_discovery::routes::{
    configure_routes, handle_json_payload_error, handle_query_payload_error, AppState,
};
use dharlink_discovery::services::{
    Catalog, MarketplaceClient, OsrmClient, RouteBook, RouteProvider, RouteTracker, RoutingError,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_test::{assert_pending, assert_ready, task};

// Kilometers per degree of latitude on a 6371 km sphere
const KM_PER_DEG_LAT: f64 = 111.194_926_6;

fn user() -> UserPosition {
    UserPosition::new(23.8103, 90.4125)
}

/// A point `km` north of the user
fn north_of_user(km: f64) -> GeoPoint {
    GeoPoint::new(23.8103 + km / KM_PER_DEG_LAT, 90.4125)
}

/// A: tools, 100, 2 km; B: tools, 50, 8 km; C: garden, 200, 1 km; D: tools, 80, no position
fn marketplace_items() -> Value {
    let a = north_of_user(2.0);
    let b = north_of_user(8.0);
    let c = north_of_user(1.0);
    json!([
        {"_id": "A", "title": "Cordless Drill", "category": "tools", "price": 100,
         "location": {"coordinates": [a.lng, a.lat]}, "address": "Road 11, Banani"},
        {"_id": "B", "title": "Ladder", "category": "tools", "price": "50",
         "coordinates": [b.lng, b.lat]},
        {"_id": "C", "title": "Lawn Mower", "category": "garden", "price": 200,
         "location": {"coordinates": [c.lng, c.lat]}, "isFavorite": true},
        {"_id": "D", "title": "Hammer", "category": "tools", "price": 80},
        {"title": "No id at all", "price": 10}
    ])
}

fn ids(listings: &[dharlink_discovery::models::Listing]) -> Vec<&str> {
    listings.iter().map(|l| l.id.as_str()).collect()
}

#[test]
fn test_integration_discovery_scenarios() {
    let batch = normalize_listings(marketplace_items().as_array().unwrap().clone());
    assert_eq!(batch.listings.len(), 4);
    assert_eq!(batch.quarantined.len(), 1);

    let pipeline = DiscoveryPipeline::default();
    let user = user();

    let narrow = FilterState {
        category: CategoryFilter::Only("tools".to_string()),
        price: PriceRange::new(0.0, 150.0).unwrap(),
        max_distance: MaxDistance::Km(5.0),
        ..FilterState::default()
    };
    let result = pipeline.run(batch.listings.clone(), Some(&user), &narrow, SortKey::PriceAsc);
    assert_eq!(ids(&result.listings), vec!["A"]);

    // B is cheap enough and in the right category; only its distance keeps it out
    let mut wider = narrow.clone();
    wider.max_distance = MaxDistance::Km(10.0);
    let result = pipeline.run(batch.listings.clone(), Some(&user), &wider, SortKey::PriceAsc);
    assert_eq!(ids(&result.listings), vec!["B", "A"]);

    let open = FilterState {
        max_distance: MaxDistance::Unbounded,
        ..FilterState::default()
    };
    let result = pipeline.run(batch.listings.clone(), Some(&user), &open, SortKey::Distance);
    assert_eq!(ids(&result.listings), vec!["C", "A", "B", "D"]);
    assert_eq!(result.mappable().count(), 3);
    assert_eq!(result.center, user.point);
    assert_eq!(result.available_categories, vec!["all", "tools", "garden"]);

    let a = &result.listings[1];
    assert!((a.distance_km.unwrap() - 2.0).abs() < 0.01);

    let positioned: Vec<_> = batch.listings.into_iter().filter(|l| l.position.is_some()).collect();
    let result = pipeline.run(positioned, Some(&user), &open, SortKey::Distance);
    assert_eq!(ids(&result.listings), vec!["C", "A", "B"]);
}

#[test]
fn test_integration_without_position() {
    let batch = normalize_listings(marketplace_items().as_array().unwrap().clone());
    let pipeline = DiscoveryPipeline::default();

    let bounded = pipeline.run(batch.listings.clone(), None, &FilterState::default(), SortKey::Distance);
    assert!(bounded.listings.is_empty());
    assert_eq!(bounded.center, DEFAULT_CENTER);

    let open = FilterState {
        max_distance: MaxDistance::Unbounded,
        ..FilterState::default()
    };
    let unbounded = pipeline.run(batch.listings, None, &open, SortKey::Name);
    assert_eq!(ids(&unbounded.listings), vec!["A", "D", "B", "C"]);
    assert!(unbounded.listings.iter().all(|l| l.distance_km.is_none()));
}

/// Route provider whose answers are released by the test
#[derive(Default)]
struct ScriptedRoutes {
    pending: Mutex<HashMap<String, oneshot::Receiver<Result<Route, RoutingError>>>>,
}

impl ScriptedRoutes {
    fn key(to: GeoPoint) -> String {
        format!("{},{}", to.lat, to.lng)
    }

    fn script(&self, to: GeoPoint) -> oneshot::Sender<Result<Route, RoutingError>> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(Self::key(to), rx);
        tx
    }
}

impl RouteProvider for ScriptedRoutes {
    fn route(&self, _from: GeoPoint, to: GeoPoint) -> impl Future<Output = Result<Route, RoutingError>> + Send {
        let rx = self.pending.lock().unwrap().remove(&Self::key(to));
        async move {
            match rx {
                Some(rx) => rx.await.unwrap_or(Err(RoutingError::NoRoute)),
                None => Err(RoutingError::NoRoute),
            }
        }
    }
}

fn straight_route(from: GeoPoint, to: GeoPoint) -> Route {
    Route {
        waypoints: vec![from, to],
    }
}

#[test]
fn test_route_lookups_last_to_resolve_wins() {
    let origin = user().point;
    let to_a = north_of_user(2.0);
    let to_b = north_of_user(8.0);

    let provider = ScriptedRoutes::default();
    let release_a = provider.script(to_a);
    let release_b = provider.script(to_b);
    let tracker = RouteTracker::new();

    // A is requested first, B second
    let mut lookup_a = task::spawn(tracker.lookup(&provider, origin, "A", to_a));
    let mut lookup_b = task::spawn(tracker.lookup(&provider, origin, "B", to_b));
    assert_pending!(lookup_a.poll());
    assert_pending!(lookup_b.poll());

    // B resolves first
    release_b.send(Ok(straight_route(origin, to_b))).unwrap();
    assert!(lookup_b.is_woken());
    let state = assert_ready!(lookup_b.poll());
    assert_eq!(state.listing_id.as_deref(), Some("B"));

    // A resolves last and its route is the one left standing
    release_a.send(Ok(straight_route(origin, to_a))).unwrap();
    assert!(lookup_a.is_woken());
    let state = assert_ready!(lookup_a.poll());
    assert_eq!(state.listing_id.as_deref(), Some("A"));
    assert_eq!(state.destination, Some(to_a));
    assert_eq!(state.route, Some(straight_route(origin, to_a)));
    assert!(state.last_error.is_none());
}

#[tokio::test]
async fn test_route_failure_keeps_previous_route() {
    let origin = user().point;
    let to_a = north_of_user(2.0);
    let to_b = north_of_user(8.0);

    let provider = ScriptedRoutes::default();
    provider.script(to_a).send(Ok(straight_route(origin, to_a))).unwrap();
    provider.script(to_b).send(Err(RoutingError::ApiError(503))).unwrap();
    let tracker = RouteTracker::new();

    let first = tracker.lookup(&provider, origin, "A", to_a).await;
    assert!(first.last_error.is_none());

    let second = tracker.lookup(&provider, origin, "B", to_b).await;
    assert_eq!(second.route, Some(straight_route(origin, to_a)));
    assert_eq!(second.listing_id.as_deref(), Some("A"));
    assert_eq!(second.last_error, Some(RoutingError::ApiError(503)));
    assert_eq!(tracker.current().await, second);
}

async fn app_state(server: &mockito::ServerGuard) -> AppState {
    let marketplace = Arc::new(MarketplaceClient::new(server.url(), Duration::from_secs(5)).unwrap());
    let catalog = Arc::new(Catalog::new(marketplace.clone()));
    catalog.refresh().await.unwrap();

    AppState {
        catalog,
        marketplace,
        router: Arc::new(OsrmClient::new(server.url(), "driving".to_string(), Duration::from_secs(5)).unwrap()),
        route_book: RouteBook::new(100, Duration::from_secs(60)),
        pipeline: DiscoveryPipeline::default(),
        default_max_distance: MaxDistance::Km(10.0),
    }
}

async fn marketplace_server() -> mockito::ServerGuard {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/items/all")
        .with_status(200)
        .with_body(marketplace_items().to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/categories")
        .with_status(200)
        .with_body(r#"[{"name":"tools"},{"name":"garden"},{"name":"electronics"}]"#)
        .create_async()
        .await;
    server
}

macro_rules! init_app {
    ($state:expr) => {
        http_test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
                .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
                .configure(configure_routes),
        )
        .await
    };
}

#[actix_web::test]
async fn test_http_discover_filters_and_sorts() {
    let server = marketplace_server().await;
    let app = init_app!(app_state(&server).await);

    let req = http_test::TestRequest::get()
        .uri("/api/v1/items/discover?category=tools&maxPrice=150&maxDistance=5&sort=price-low&lat=23.8103&lng=90.4125&accuracy=12.4")
        .to_request();
    let resp = http_test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = http_test::read_body_json(resp).await;
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], "A");
    assert_eq!(items[0]["distanceLabel"], "2.0km");
    assert!(items[0]["directionsUrl"].as_str().unwrap().starts_with("https://www.google.com/maps/dir/"));
    assert_eq!(body["userAccuracy"], "±12m");
    assert_eq!(body["totalCandidates"], 4);
    assert_eq!(body["catalogStatus"]["state"], "ready");
    assert_eq!(body["catalogStatus"]["quarantined"], 1);
}

#[actix_web::test]
async fn test_http_discover_all_distances() {
    let server = marketplace_server().await;
    let app = init_app!(app_state(&server).await);

    let req = http_test::TestRequest::get()
        .uri("/api/v1/items/discover?maxDistance=all&lat=23.8103&lng=90.4125")
        .to_request();
    let body: Value = http_test::call_and_read_body_json(&app, req).await;

    let order: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_str().unwrap())
        .collect();
    assert_eq!(order, vec!["C", "A", "B", "D"]);
    assert_eq!(body["markers"].as_array().unwrap().len(), 3);
    assert!(body["items"][3]["distance"].is_null());
}

#[actix_web::test]
async fn test_http_discover_rejects_bad_input() {
    let server = marketplace_server().await;
    let app = init_app!(app_state(&server).await);

    let inverted = http_test::TestRequest::get()
        .uri("/api/v1/items/discover?minPrice=400&maxPrice=100")
        .to_request();
    assert_eq!(http_test::call_service(&app, inverted).await.status(), StatusCode::BAD_REQUEST);

    let bad_sort = http_test::TestRequest::get()
        .uri("/api/v1/items/discover?sort=popularity")
        .to_request();
    let resp = http_test::call_service(&app, bad_sort).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = http_test::read_body_json(resp).await;
    assert_eq!(body["error"], "invalid_query");

    let bad_distance = http_test::TestRequest::get()
        .uri("/api/v1/items/discover?maxDistance=far")
        .to_request();
    assert_eq!(http_test::call_service(&app, bad_distance).await.status(), StatusCode::BAD_REQUEST);

    let nan_position = http_test::TestRequest::get()
        .uri("/api/v1/items/discover?lat=NaN&lng=NaN")
        .to_request();
    assert_eq!(http_test::call_service(&app, nan_position).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_http_categories_lead_with_all() {
    let server = marketplace_server().await;
    let app = init_app!(app_state(&server).await);

    let req = http_test::TestRequest::get().uri("/api/v1/categories").to_request();
    let body: Vec<String> = http_test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, vec!["all", "tools", "garden", "electronics"]);
}

#[actix_web::test]
async fn test_http_route_session_lifecycle() {
    let mut server = marketplace_server().await;
    let a = north_of_user(2.0);
    server
        .mock("GET", mockito::Matcher::Regex(r"^/route/v1/driving/".to_string()))
        .with_status(200)
        .with_body(
            json!({"code": "Ok", "routes": [{"geometry": {"type": "LineString",
                "coordinates": [[90.4125, 23.8103], [a.lng, a.lat]]}}]})
            .to_string(),
        )
        .create_async()
        .await;
    let app = init_app!(app_state(&server).await);

    let unknown = http_test::TestRequest::post()
        .uri("/api/v1/routes")
        .set_json(json!({"listingId": "Z", "lat": 23.8103, "lng": 90.4125}))
        .to_request();
    assert_eq!(http_test::call_service(&app, unknown).await.status(), StatusCode::NOT_FOUND);

    let unmapped = http_test::TestRequest::post()
        .uri("/api/v1/routes")
        .set_json(json!({"listingId": "D", "lat": 23.8103, "lng": 90.4125}))
        .to_request();
    assert_eq!(
        http_test::call_service(&app, unmapped).await.status(),
        StatusCode::UNPROCESSABLE_ENTITY
    );

    let lookup = http_test::TestRequest::post()
        .uri("/api/v1/routes")
        .set_json(json!({"listingId": "A", "lat": 23.8103, "lng": 90.4125}))
        .to_request();
    let resp = http_test::call_service(&app, lookup).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = http_test::read_body_json(resp).await;
    let session_id = body["sessionId"].as_str().unwrap().to_string();
    assert_eq!(body["listingId"], "A");
    assert_eq!(body["route"]["waypoints"].as_array().unwrap().len(), 2);
    assert!(body["error"].is_null());

    let current = http_test::TestRequest::get()
        .uri(&format!("/api/v1/routes/{}", session_id))
        .to_request();
    let body: Value = http_test::call_and_read_body_json(&app, current).await;
    assert_eq!(body["listingId"], "A");

    let clear = http_test::TestRequest::delete()
        .uri(&format!("/api/v1/routes/{}", session_id))
        .to_request();
    assert_eq!(http_test::call_service(&app, clear).await.status(), StatusCode::NO_CONTENT);

    let gone = http_test::TestRequest::get()
        .uri(&format!("/api/v1/routes/{}", session_id))
        .to_request();
    assert_eq!(http_test::call_service(&app, gone).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_http_badges() {
    let mut server = marketplace_server().await;
    server
        .mock("GET", "/users/profile-by-email/lender%40x.com")
        .with_status(200)
        .with_body(r#"{"name":"Rahim","email":"lender@x.com","karma":230,"totalDeals":14}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/users/profile-by-email/ghost%40x.com")
        .with_status(200)
        .with_body("null")
        .create_async()
        .await;
    let app = init_app!(app_state(&server).await);

    let req = http_test::TestRequest::get().uri("/api/v1/users/lender@x.com/badge").to_request();
    let body: Value = http_test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["badge"], "community_pillar");
    assert_eq!(body["label"], "Community Pillar");
    assert_eq!(body["karma"], 230);

    let req = http_test::TestRequest::get().uri("/api/v1/users/ghost@x.com/badge").to_request();
    assert_eq!(http_test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = http_test::TestRequest::get().uri("/api/v1/badges/500").to_request();
    let body: Value = http_test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["badge"], "legend");
    assert!(body["email"].is_null());
}

#[actix_web::test]
async fn test_http_requests_with_countdowns() {
    let mut server = marketplace_server().await;
    let due = (chrono::Utc::now() + chrono::Duration::days(2)).to_rfc3339();
    server
        .mock("GET", "/requests/owner/lender%40x.com")
        .with_status(200)
        .with_body(
            json!([{"_id": "r1", "itemTitle": "Ladder", "status": "approved",
                "borrowerEmail": "b@x.com", "ownerEmail": "lender@x.com", "returnTime": due}])
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("GET", "/requests/borrower/lender%40x.com")
        .with_status(200)
        .with_body(r#"[{"_id":"r2","itemTitle":"Tent","status":"pending"}]"#)
        .create_async()
        .await;
    let app = init_app!(app_state(&server).await);

    let req = http_test::TestRequest::get().uri("/api/v1/users/lender@x.com/requests").to_request();
    let body: Value = http_test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["incoming"][0]["_id"], "r1");
    assert_eq!(body["incoming"][0]["countdown"]["overdue"], false);
    assert!(body["incoming"][0]["countdown"]["label"].as_str().unwrap().starts_with("1d 23h"));
    assert!(body["outgoing"][0]["countdown"].is_null());
}

#[actix_web::test]
async fn test_http_health_reports_stale_catalog() {
    let mut server = marketplace_server().await;
    let state = app_state(&server).await;
    server.reset_async().await;
    server
        .mock("GET", "/items/all")
        .with_status(503)
        .create_async()
        .await;
    let app = init_app!(state);

    let refresh = http_test::TestRequest::post().uri("/api/v1/catalog/refresh").to_request();
    assert_eq!(http_test::call_service(&app, refresh).await.status(), StatusCode::BAD_GATEWAY);

    let req = http_test::TestRequest::get().uri("/api/v1/health").to_request();
    let body: Value = http_test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["catalog"]["state"], "stale");
    assert_eq!(body["catalog"]["listings"], 4);
}
