// Route exports
pub mod directions;
pub mod items;
pub mod users;

use actix_web::{error, http::StatusCode, web, HttpResponse};
use std::sync::Arc;

use crate::core::DiscoveryPipeline;
use crate::models::{ErrorResponse, MaxDistance};
use crate::services::{Catalog, MarketplaceClient, OsrmClient, RouteBook};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub marketplace: Arc<MarketplaceClient>,
    pub router: Arc<OsrmClient>,
    pub route_book: RouteBook,
    pub pipeline: DiscoveryPipeline,
    pub default_max_distance: MaxDistance,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(items::configure)
            .configure(directions::configure)
            .configure(users::configure),
    );
}

/// JSON error body with an HTTP status
pub(crate) fn error_response(status: StatusCode, error: &str, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message: message.into(),
        status_code: status.as_u16(),
    })
}

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        error_response(
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST),
            &self.error,
            self.message.clone(),
        )
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("Query payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}
