use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use validator::{Validate, ValidationError};

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATABASE_URL: &str = "sqlite://eventpay.db?mode=rwc";
const CONFIG_DIR: &str = "config";
const DEFAULT_SELECTED_METHOD: &str = "1";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Hosted-gateway settings: where buyers are redirected and how the
/// request is routed per payment method.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Base URL of the hosted payment page
    #[validate(url)]
    pub base_url: String,

    /// Merchant gateway key used when the URL is hand-constructed
    #[validate(length(min = 1))]
    pub gateway_key: String,

    /// Per-method routing tokens, semicolon-separated `METHOD|TOKEN` pairs
    #[validate(custom = "validate_accounts")]
    pub accounts: String,

    /// Landing page the gateway sends the buyer back to on success
    #[validate(url, custom = "validate_https")]
    pub success_url: String,

    /// Return page on buyer cancellation
    #[validate(url, custom = "validate_https")]
    pub cancel_url: String,

    /// Return page on gateway error
    #[validate(url, custom = "validate_https")]
    pub error_url: String,

    /// Pre-selected payment method shown on the hosted page
    #[serde(default = "default_selected_method")]
    pub selected_method: String,

    /// Render the hosted page inside an iframe
    #[serde(default = "default_true_bool")]
    pub iframe: bool,

    /// Endpoint of the checkout-URL issuer; unset means the issuer is
    /// unavailable and every transaction takes the hand-constructed path
    #[serde(default)]
    pub issuer_url: Option<String>,

    /// Timeout for issuer calls (seconds)
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

/// Events/ticketing subsystem settings.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct EventsApiConfig {
    /// Base URL of the events/ticketing API
    #[validate(url)]
    pub base_url: String,

    /// Bearer token for elevated calls (confirm/get/list/update orders)
    #[serde(default)]
    pub elevated_token: Option<String>,

    /// Timeout for events-API calls (seconds)
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

/// Application configuration with validation.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    #[validate]
    pub gateway: GatewayConfig,

    #[validate]
    pub events_api: EventsApiConfig,
}

impl AppConfig {
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_selected_method() -> String {
    DEFAULT_SELECTED_METHOD.to_string()
}
fn default_true_bool() -> bool {
    true
}
fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

fn validate_https(value: &str) -> Result<(), ValidationError> {
    match url::Url::parse(value) {
        Ok(parsed) if parsed.scheme() == "https" => Ok(()),
        _ => {
            let mut err = ValidationError::new("https");
            err.message = Some("redirect URLs must be absolute https URLs".into());
            Err(err)
        }
    }
}

fn validate_accounts(value: &str) -> Result<(), ValidationError> {
    let well_formed = !value.is_empty()
        && value.split(';').all(|pair| {
            let mut parts = pair.splitn(2, '|');
            matches!(
                (parts.next(), parts.next()),
                (Some(method), Some(token)) if !method.is_empty() && !token.is_empty()
            )
        });
    if well_formed {
        Ok(())
    } else {
        let mut err = ValidationError::new("accounts");
        err.message = Some("accounts must be semicolon-separated METHOD|TOKEN pairs".into());
        Err(err)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppConfigError {
    #[error("configuration load error: {0}")]
    Load(#[from] ConfigError),
    #[error("configuration validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Load configuration from `config/default`, `config/{environment}` and
/// `EVENTPAY_*` environment variables (later sources win).
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("EVENTPAY_ENVIRONMENT").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let cfg: AppConfig = Config::builder()
        .add_source(File::with_name(&format!("{CONFIG_DIR}/default")).required(false))
        .add_source(File::with_name(&format!("{CONFIG_DIR}/{run_env}")).required(false))
        .add_source(Environment::with_prefix("EVENTPAY").separator("__"))
        .build()?
        .try_deserialize()?;

    cfg.validate()?;
    Ok(cfg)
}

/// Initialize the tracing subscriber. `RUST_LOG` overrides the configured
/// level when set.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("eventpay_api={level},tower_http=debug");
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}
