use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use tracing::info;

const CONFIG_DIR: &str = "config";
const DEFAULT_ENV: &str = "development";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// Server host address
    pub host: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Run embedded migrations at startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// Comma-separated allowed CORS origins; unset means permissive
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Payment provider (hosted checkout) base URL
    #[serde(default = "default_payment_provider_base_url")]
    pub payment_provider_base_url: String,
    /// Access token for the payment provider; unset disables checkout
    #[serde(default)]
    pub payment_provider_access_token: Option<String>,

    /// Shared secret for verifying webhook signatures; unset skips
    /// verification
    #[serde(default)]
    pub payment_webhook_secret: Option<String>,
    /// Maximum webhook timestamp skew in seconds
    #[serde(default)]
    pub payment_webhook_tolerance_secs: Option<u64>,
}

fn default_port() -> u16 {
    8080
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_payment_provider_base_url() -> String {
    "https://api.mercadopago.com".to_string()
}

impl AppConfig {
    /// Minimal constructor used by tests and tools; everything else takes
    /// the defaults.
    pub fn new(
        database_url: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            database_url: database_url.into(),
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            host: host.into(),
            port,
            environment: environment.into(),
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            request_timeout_secs: default_request_timeout_secs(),
            payment_provider_base_url: default_payment_provider_base_url(),
            payment_provider_access_token: None,
            payment_webhook_secret: None,
            payment_webhook_tolerance_secs: None,
        }
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development" || self.environment == "test"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppConfigError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Loads configuration: built-in defaults, then `config/default` and
/// `config/{RUN_ENV}` files, then `APP__*` environment variables.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://fastfood.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", 8080_i64)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("auto_migrate", true)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let cfg: AppConfig = config.try_deserialize()?;

    if cfg.database_url.trim().is_empty() {
        return Err(AppConfigError::Validation(
            "database_url must not be empty".to_string(),
        ));
    }
    if cfg.db_min_connections > cfg.db_max_connections {
        return Err(AppConfigError::Validation(
            "db_min_connections must not exceed db_max_connections".to_string(),
        ));
    }

    Ok(cfg)
}

/// Installs the global tracing subscriber. `RUST_LOG` overrides the
/// level derived from the configuration.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_directive = format!("fastfood_api={},tower_http=info", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let registry = tracing_subscriber::registry().with(EnvFilter::new(filter_directive));
    if json {
        let _ = registry.with(fmt::layer().json()).try_init();
    } else {
        let _ = registry.with(fmt::layer()).try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_constructor_fills_defaults() {
        let cfg = AppConfig::new("sqlite::memory:", "127.0.0.1", 18080, "test");
        assert_eq!(cfg.port, 18080);
        assert_eq!(cfg.db_max_connections, 10);
        assert!(cfg.payment_provider_access_token.is_none());
        assert!(cfg.is_development());
    }
}
