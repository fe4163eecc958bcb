use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::models::{GeoPoint, MaxDistance};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub marketplace: MarketplaceSettings,
    #[serde(default)]
    pub routing: RoutingSettings,
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub discovery: DiscoverySettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketplaceSettings {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl MarketplaceSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoutingSettings {
    #[serde(default = "default_routing_url")]
    pub base_url: String,
    #[serde(default = "default_routing_profile")]
    pub profile: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: u64,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            base_url: default_routing_url(),
            profile: default_routing_profile(),
            timeout_secs: default_timeout_secs(),
            session_ttl_secs: default_session_ttl_secs(),
            max_sessions: default_max_sessions(),
        }
    }
}

fn default_timeout_secs() -> u64 { 30 }
fn default_routing_url() -> String { "https://router.project-osrm.org".to_string() }
fn default_routing_profile() -> String { "driving".to_string() }
fn default_session_ttl_secs() -> u64 { 1800 }
fn default_max_sessions() -> u64 { 10_000 }

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSettings {
    /// Seconds between background refreshes; 0 disables them
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

fn default_refresh_interval_secs() -> u64 { 300 }

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverySettings {
    #[serde(default = "default_center_lat")]
    pub default_center_lat: f64,
    #[serde(default = "default_center_lng")]
    pub default_center_lng: f64,
    /// Ceiling used when a request gives none
    ///
    /// Leaving the key out of a `[discovery]` section means unbounded.
    /// Without the section at all the ceiling is 10 km.
    #[serde(default)]
    pub default_max_distance_km: Option<f64>,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            default_center_lat: default_center_lat(),
            default_center_lng: default_center_lng(),
            default_max_distance_km: Some(10.0),
        }
    }
}

impl DiscoverySettings {
    pub fn default_center(&self) -> GeoPoint {
        GeoPoint::new(self.default_center_lat, self.default_center_lng)
    }

    pub fn default_max_distance(&self) -> MaxDistance {
        match self.default_max_distance_km {
            Some(km) => MaxDistance::Km(km),
            None => MaxDistance::Unbounded,
        }
    }
}

fn default_center_lat() -> f64 { 23.8103 }
fn default_center_lng() -> f64 { 90.4125 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with DHARLINK_)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., DHARLINK__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("DHARLINK")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings = apply_env_overrides(settings)?;

        settings.try_deserialize()
    }
}

/// Honor the conventional `MARKETPLACE_URL` and `OSRM_URL` variables
fn apply_env_overrides(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(url) = env::var("MARKETPLACE_URL") {
        builder = builder.set_override("marketplace.base_url", url)?;
    }
    if let Ok(url) = env::var("OSRM_URL") {
        builder = builder.set_override("routing.base_url", url)?;
    }

    builder.build()
}
