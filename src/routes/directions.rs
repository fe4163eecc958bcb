use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use validator::Validate;

use crate::models::{GeoPoint, RouteRequest, RouteResponse};
use crate::routes::{error_response, AppState};
use crate::services::RouteState;

/// Configure route lookup endpoints
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/routes", web::post().to(lookup_route))
        .route("/routes/{session_id}", web::get().to(current_route))
        .route("/routes/{session_id}", web::delete().to(clear_route));
}

fn route_response(session_id: String, state: RouteState) -> RouteResponse {
    RouteResponse {
        session_id,
        listing_id: state.listing_id,
        destination: state.destination,
        route: state.route,
        error: state.last_error.map(|e| e.to_string()),
    }
}

/// Look up a driving route from the user to a listing
///
/// POST /api/v1/routes
///
/// Request body:
/// ```json
/// {
///   "sessionId": "string (optional)",
///   "listingId": "string",
///   "lat": 23.81,
///   "lng": 90.41
/// }
/// ```
///
/// Omitting `sessionId` starts a new session. When the lookup fails the
/// response is a 502 that still carries the session's previous route.
async fn lookup_route(state: web::Data<AppState>, req: web::Json<RouteRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for route request: {:?}", errors);
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", errors.to_string());
    }

    let snapshot = state.catalog.snapshot().await;
    let Some(listing) = snapshot.find(&req.listing_id) else {
        return error_response(
            StatusCode::NOT_FOUND,
            "Listing not found",
            format!("No listing with id {}", req.listing_id),
        );
    };
    let Some(destination) = listing.position else {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Listing has no position",
            format!("Listing {} cannot be routed to", listing.id),
        );
    };

    let session_id = req
        .session_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    tracing::info!("Route lookup for session {} to listing {}", session_id, listing.id);

    let tracker = state.route_book.tracker(&session_id).await;
    let route_state = tracker
        .lookup(
            state.router.as_ref(),
            GeoPoint::new(req.lat, req.lng),
            &listing.id,
            destination,
        )
        .await;

    let status = if route_state.last_error.is_some() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::OK
    };

    HttpResponse::build(status).json(route_response(session_id, route_state))
}

/// Current route of a session
async fn current_route(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let session_id = path.into_inner();

    match state.route_book.existing(&session_id).await {
        Some(tracker) => {
            let route_state = tracker.current().await;
            HttpResponse::Ok().json(route_response(session_id, route_state))
        }
        None => error_response(
            StatusCode::NOT_FOUND,
            "Session not found",
            format!("No route session {}", session_id),
        ),
    }
}

/// Close the route view of a session
async fn clear_route(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let session_id = path.into_inner();

    if let Some(tracker) = state.route_book.existing(&session_id).await {
        tracker.clear().await;
    }
    state.route_book.remove(&session_id).await;

    tracing::debug!("Cleared route session {}", session_id);
    HttpResponse::NoContent().finish()
}
