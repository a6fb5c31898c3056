use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Process-level configuration. Business policy (cutoff time, capacities,
/// optimization priority) is *not* here: it lives in the `business_rules`
/// table and is loaded once per planning transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub jwt_secret: String,
    #[serde(default = "default_jwt_expiration_secs")]
    pub jwt_expiration_secs: i64,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub auto_migrate: bool,
    /// Fallback start point when a buyer has no coordinates, and the city
    /// center used when an item's stores are all un-geocoded.
    #[serde(default = "default_office_lat")]
    pub office_lat: Decimal,
    #[serde(default = "default_office_lng")]
    pub office_lng: Decimal,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_jwt_expiration_secs() -> i64 {
    86_400
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_office_lat() -> Decimal {
    Decimal::new(34_6937, 4)
}

fn default_office_lng() -> Decimal {
    Decimal::new(135_5023, 4)
}

impl AppConfig {
    /// Minimal constructor used by the test harness.
    pub fn new(database_url: String, jwt_secret: String) -> Self {
        Self {
            database_url,
            host: default_host(),
            port: default_port(),
            jwt_secret,
            jwt_expiration_secs: default_jwt_expiration_secs(),
            environment: "test".to_string(),
            log_level: default_log_level(),
            auto_migrate: false,
            office_lat: default_office_lat(),
            office_lng: default_office_lng(),
        }
    }
}

/// Load configuration from `config/{environment}.toml` (optional) with
/// `APP__`-prefixed environment variables taking precedence.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let environment = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

    let config = Config::builder()
        .add_source(File::with_name(&format!("config/{environment}")).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    config.try_deserialize()
}

/// Initialize tracing with an env-filter; `RUST_LOG` overrides the
/// configured level.
pub fn init_tracing(level: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_directive = format!("dispatch_api={level},tower_http=info");
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}
