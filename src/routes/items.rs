use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use validator::Validate;

use crate::core::format_accuracy;
use crate::models::{
    CatalogStatusView, DiscoverQuery, DiscoverResponse, HealthResponse, ListingView, MapMarker,
    ALL_SENTINEL,
};
use crate::routes::{error_response, AppState};

/// Configure discovery and catalog routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/items/discover", web::get().to(discover))
        .route("/categories", web::get().to(list_categories))
        .route("/catalog/refresh", web::post().to(refresh_catalog));
}

/// Health check endpoint
///
/// Reports `degraded` while the catalog has never loaded or is stale.
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let snapshot = state.catalog.snapshot().await;
    let catalog = CatalogStatusView::from(&snapshot);
    let status = if catalog.state == "ready" { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        catalog,
    })
}

/// Nearby items endpoint
///
/// GET /api/v1/items/discover?category=tools&maxPrice=150&maxDistance=5&sort=price-low&lat=23.81&lng=90.41
///
/// `maxDistance` takes kilometers or `all`. Without `lat`/`lng` no
/// distances are known, so only an unbounded distance filter lets items
/// through.
async fn discover(state: web::Data<AppState>, query: web::Query<DiscoverQuery>) -> impl Responder {
    if let Err(errors) = query.validate() {
        tracing::info!("Validation failed for discover query: {:?}", errors);
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", errors.to_string());
    }

    let filter = match query.filter_state(state.default_max_distance) {
        Ok(filter) => filter,
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, "Invalid filter", e.to_string());
        }
    };
    let user = query.user_position();
    let sort = query.sort_key();

    let snapshot = state.catalog.snapshot().await;
    if snapshot.is_stale() {
        tracing::warn!("Serving discover from a stale catalog");
    }

    let result = state
        .pipeline
        .run(snapshot.listings.as_ref().clone(), user.as_ref(), &filter, sort);

    let markers = result
        .mappable()
        .filter_map(|listing| {
            listing.position.map(|p| MapMarker {
                id: listing.id.clone(),
                title: listing.title.clone(),
                lat: p.lat,
                lng: p.lng,
            })
        })
        .collect();

    let response = DiscoverResponse {
        items: result.listings.iter().map(ListingView::from).collect(),
        markers,
        categories: result.available_categories,
        center: result.center,
        user_accuracy: user.and_then(|u| u.accuracy_m).map(format_accuracy),
        total_results: result.listings.len(),
        total_candidates: result.total_candidates,
        catalog_status: CatalogStatusView::from(&snapshot),
    };

    tracing::info!(
        "Discover returning {} of {} listings",
        response.total_results,
        response.total_candidates
    );

    HttpResponse::Ok().json(response)
}

/// Category names from the backend, led by `all`
async fn list_categories(state: web::Data<AppState>) -> impl Responder {
    let snapshot = state.catalog.snapshot().await;

    let categories: Vec<String> = std::iter::once(ALL_SENTINEL.to_string())
        .chain(snapshot.categories.iter().cloned())
        .collect();

    HttpResponse::Ok().json(categories)
}

/// Reload listings and categories now
///
/// POST /api/v1/catalog/refresh
///
/// This is the retry path after a failed load. On failure the previous
/// data stays in place and a 502 is returned.
async fn refresh_catalog(state: web::Data<AppState>) -> impl Responder {
    match state.catalog.refresh().await {
        Ok(snapshot) => HttpResponse::Ok().json(CatalogStatusView::from(&snapshot)),
        Err(e) => error_response(StatusCode::BAD_GATEWAY, "Catalog refresh failed", e.to_string()),
    }
}
