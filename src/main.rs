use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use dharlink_discovery::config::{LoggingSettings, Settings};
use dharlink_discovery::core::DiscoveryPipeline;
use dharlink_discovery::routes::{self, handle_json_payload_error, handle_query_payload_error, AppState};
use dharlink_discovery::services::{Catalog, MarketplaceClient, OsrmClient, Poller, RouteBook};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// `LOG_LEVEL` and `LOG_FORMAT` take precedence over the `[logging]` section
fn init_tracing(logging: &LoggingSettings) {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| logging.level.clone());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| logging.format.clone());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }
}

fn io_error(context: &str, e: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", context, e);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, e))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::Other, format!("Configuration error: {}", e))
    })?;

    init_tracing(&settings.logging);

    info!("Starting DharLink discovery service...");

    let marketplace = Arc::new(
        MarketplaceClient::new(settings.marketplace.base_url.clone(), settings.marketplace.timeout())
            .map_err(|e| io_error("Failed to build marketplace client", e))?,
    );

    info!("Marketplace client initialized ({})", marketplace.base_url());

    let router = Arc::new(
        OsrmClient::new(
            settings.routing.base_url.clone(),
            settings.routing.profile.clone(),
            Duration::from_secs(settings.routing.timeout_secs),
        )
        .map_err(|e| io_error("Failed to build routing client", e))?,
    );

    let route_book = RouteBook::new(
        settings.routing.max_sessions,
        Duration::from_secs(settings.routing.session_ttl_secs),
    );

    info!(
        "Routing via {} ({} profile, sessions idle out after {}s)",
        settings.routing.base_url, settings.routing.profile, settings.routing.session_ttl_secs
    );

    let catalog = Arc::new(Catalog::new(marketplace.clone()));

    // The first load runs on the poller; without one, load once up front
    let refresh_interval = settings.catalog.refresh_interval_secs;
    let catalog_poller = if refresh_interval > 0 {
        let refreshing = catalog.clone();
        Some(Poller::spawn(
            "catalog-refresh",
            Duration::from_secs(refresh_interval),
            move || {
                let catalog = refreshing.clone();
                async move {
                    // Failures already leave the catalog stale and are logged
                    let _ = catalog.refresh().await;
                }
            },
        ))
    } else {
        if let Err(e) = catalog.refresh().await {
            warn!("Initial catalog load failed, starting with an empty catalog: {}", e);
        }
        None
    };

    let pipeline = DiscoveryPipeline::new(settings.discovery.default_center());
    let default_max_distance = settings.discovery.default_max_distance();

    info!(
        "Discovery centered on {:?} by default, max distance {:?}",
        pipeline.default_center(),
        default_max_distance
    );

    let app_state = AppState {
        catalog,
        marketplace,
        router,
        route_book,
        pipeline,
        default_max_distance,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    let served = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await;

    if let Some(poller) = catalog_poller {
        poller.stop().await;
    }

    info!("DharLink discovery service stopped");
    served
}
