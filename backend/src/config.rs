//! Configuration for the membership API.

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

/// Main configuration structure for the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub identity: IdentityConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub paa: PaaConfig,
    #[serde(default)]
    pub signup: SignupConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Identity backend connection (GoTrue-style HTTP API).
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// Base URL of the identity API, e.g. `https://project.supabase.co/auth/v1`
    pub base_url: String,
    /// Anon API key sent with every request
    pub api_key: String,
    /// Elevated key for admin operations (user delete, storage signing).
    /// Falls back to `api_key` when unset.
    #[serde(default)]
    pub service_role_key: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl IdentityConfig {
    /// Key used for privileged backend calls.
    pub fn service_key(&self) -> &str {
        self.service_role_key.as_deref().unwrap_or(&self.api_key)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

/// Download storage backend, consumed only through signed URLs.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Base URL of the storage API, e.g. `https://project.supabase.co/storage/v1`
    pub base_url: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Validity of issued download links, in seconds
    #[serde(default = "default_signed_url_expiry")]
    pub signed_url_expiry_secs: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// PAA search service used for the builder/admin live path.
#[derive(Debug, Clone, Deserialize)]
pub struct PaaConfig {
    #[serde(default = "default_paa_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for PaaConfig {
    fn default() -> Self {
        Self {
            base_url: default_paa_url(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignupConfig {
    /// When true, new accounts start unapproved and must be cleared by an
    /// admin before any tiered operation succeeds.
    #[serde(default)]
    pub require_approval: bool,
}

impl Default for SignupConfig {
    fn default() -> Self {
        Self {
            require_approval: false,
        }
    }
}

/// Rate limit and quota policy numbers.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Login attempts allowed per IP per window
    #[serde(default = "default_login_max")]
    pub login_max_attempts: u32,
    #[serde(default = "default_login_window")]
    pub login_window_secs: u64,
    /// Signups allowed per IP per window
    #[serde(default = "default_signup_max")]
    pub signup_max_attempts: u32,
    #[serde(default = "default_signup_window")]
    pub signup_window_secs: u64,
    /// Distinct client keys tracked per rate-limited action
    #[serde(default = "default_max_tracked_keys")]
    pub max_tracked_keys: usize,
    /// Free-tier calls per rolling window for the PAA endpoint
    #[serde(default = "default_paa_daily_limit")]
    pub paa_daily_limit: u64,
    #[serde(default = "default_paa_window_hours")]
    pub paa_window_hours: i64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            login_max_attempts: default_login_max(),
            login_window_secs: default_login_window(),
            signup_max_attempts: default_signup_max(),
            signup_window_secs: default_signup_window(),
            max_tracked_keys: default_max_tracked_keys(),
            paa_daily_limit: default_paa_daily_limit(),
            paa_window_hours: default_paa_window_hours(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins (comma-separated, `*` for any)
    #[serde(default = "default_cors_origins")]
    pub origins: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: default_cors_origins(),
        }
    }
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_database_url() -> String {
    "sqlite:./data/members.db".to_string()
}
fn default_bucket() -> String {
    "downloads".to_string()
}
fn default_signed_url_expiry() -> u64 {
    600
}
fn default_paa_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_timeout() -> u64 {
    10
}
fn default_login_max() -> u32 {
    10
}
fn default_login_window() -> u64 {
    15 * 60
}
fn default_signup_max() -> u32 {
    5
}
fn default_signup_window() -> u64 {
    60 * 60
}
fn default_max_tracked_keys() -> usize {
    500
}
fn default_paa_daily_limit() -> u64 {
    30
}
fn default_paa_window_hours() -> i64 {
    24
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_cors_origins() -> String {
    "*".to_string()
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (VOIDSEO__SECTION__KEY format)
    /// 2. config.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("VOIDSEO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
