use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use chrono::{DateTime, Utc};

use crate::core::Countdown;
use crate::models::{BadgeResponse, BorrowRequest, RequestView, RequestsResponse};
use crate::routes::{error_response, AppState};
use crate::services::MarketplaceError;

/// Configure profile routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/users/{email}/badge", web::get().to(user_badge))
        .route("/users/{email}/requests", web::get().to(user_requests))
        .route("/badges/{karma}", web::get().to(badge_for_karma));
}

fn upstream_error(context: &str, e: MarketplaceError) -> HttpResponse {
    match e {
        MarketplaceError::NotFound(message) => error_response(StatusCode::NOT_FOUND, context, message),
        other => {
            tracing::error!("{}: {}", context, other);
            error_response(StatusCode::BAD_GATEWAY, context, other.to_string())
        }
    }
}

/// Reputation badge of a user
///
/// GET /api/v1/users/{email}/badge
async fn user_badge(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let email = path.into_inner();

    match state.marketplace.fetch_profile(&email).await {
        Ok(profile) => {
            tracing::debug!("User {} has karma {}", email, profile.karma);
            HttpResponse::Ok().json(BadgeResponse::new(Some(email), profile.karma))
        }
        Err(e) => upstream_error("Failed to fetch profile", e),
    }
}

/// Badge for a raw karma score
async fn badge_for_karma(path: web::Path<i64>) -> impl Responder {
    HttpResponse::Ok().json(BadgeResponse::new(None, path.into_inner()))
}

/// Attach a return countdown to requests that carry a return time
pub fn with_countdowns(requests: Vec<BorrowRequest>, now: DateTime<Utc>) -> Vec<RequestView> {
    requests
        .into_iter()
        .map(|request| {
            let countdown = request.return_time.map(|t| Countdown::until(t, now));
            RequestView { request, countdown }
        })
        .collect()
}

/// Both sides of a user's borrow requests
///
/// GET /api/v1/users/{email}/requests
///
/// `incoming` are requests for the user's items, `outgoing` the ones the
/// user made as a borrower.
async fn user_requests(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let email = path.into_inner();

    let fetched = tokio::try_join!(
        state.marketplace.fetch_owner_requests(&email),
        state.marketplace.fetch_borrower_requests(&email),
    );

    match fetched {
        Ok((incoming, outgoing)) => {
            let now = Utc::now();
            HttpResponse::Ok().json(RequestsResponse {
                incoming: with_countdowns(incoming, now),
                outgoing: with_countdowns(outgoing, now),
            })
        }
        Err(e) => upstream_error("Failed to fetch requests", e),
    }
}
