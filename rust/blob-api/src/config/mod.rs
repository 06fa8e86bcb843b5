//! Configuration management for the Blob server.
//!
//! Values are layered in this order:
//! 1. Built-in defaults
//! 2. Optional config file (`config/blob-api.{toml,yaml,json}`)
//! 3. `BLOB__SECTION__KEY` environment variables
//! 4. Well-known plain variables (`JWT_SECRET`, `PORT`, ...)
//!
//! Use [`ConfigValidator`] (called by [`AppConfig::load`]) before startup.

pub mod error;
pub mod validator;

pub use error::{ConfigResult, ConfigurationError};
pub use validator::ConfigValidator;

use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG_FILE: &str = "config/blob-api";

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Token signing and identity provider settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Generative API used by `generate.*` procedures.
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load and validate configuration.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load and validate configuration, reading the optional file at `path`
    /// (extension inferred) instead of the default location.
    pub fn load_from(path: &str) -> anyhow::Result<Self> {
        let config = Self::load_unchecked_from(path)?;

        ConfigValidator::validate(&config)
            .map_err(|e| anyhow::anyhow!("Configuration validation failed:\n\n{e}"))?;

        Ok(config)
    }

    /// Load configuration without validation.
    pub fn load_unchecked() -> anyhow::Result<Self> {
        Self::load_unchecked_from(DEFAULT_CONFIG_FILE)
    }

    fn load_unchecked_from(path: &str) -> anyhow::Result<Self> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", i64::from(default_port()))?
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("BLOB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut app_config: AppConfig = config.try_deserialize()?;

        if let Ok(secret) = std::env::var("JWT_SECRET") {
            app_config.gateway.jwt_secret = Some(secret);
        }
        if let Ok(client_id) = std::env::var("GOOGLE_WEB_CLIENT_ID") {
            app_config.gateway.google_web_client_id = Some(client_id);
        }
        if let Ok(port) = std::env::var("PORT") {
            app_config.server.port = port
                .parse()
                .map_err(|e| anyhow::anyhow!("PORT must be a port number: {e}"))?;
        }
        if let Ok(path) = std::env::var("BLOB_DATABASE_PATH") {
            app_config.database.path = path;
        }
        if let Ok(path) = std::env::var("BLOB_ENCRYPTION_KEY_PATH") {
            app_config.database.encryption_key_path = path;
        }

        Ok(app_config)
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_timeout() -> u64 {
    120
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Secret for HS256 token signing/validation.
    pub jwt_secret: Option<String>,
    /// Token lifetime in days.
    #[serde(default = "default_jwt_expiry_days")]
    pub jwt_expiry_days: i64,
    /// OAuth web client id; ID tokens must carry it as audience when set.
    pub google_web_client_id: Option<String>,
    #[serde(default = "default_tokeninfo_url")]
    pub google_tokeninfo_url: String,
}

fn default_jwt_expiry_days() -> i64 {
    7
}

fn default_tokeninfo_url() -> String {
    "https://oauth2.googleapis.com/tokeninfo".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_expiry_days: default_jwt_expiry_days(),
            google_web_client_id: None,
            google_tokeninfo_url: default_tokeninfo_url(),
        }
    }
}

/// Relational store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database file.
    #[serde(default = "default_database_path")]
    pub path: String,
    /// AES key file for stored provider API keys; created when missing.
    #[serde(default = "default_encryption_key_path")]
    pub encryption_key_path: String,
}

fn default_database_path() -> String {
    "./data/blob-server.sqlite".to_string()
}

fn default_encryption_key_path() -> String {
    "./data/encryption.key".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            encryption_key_path: default_encryption_key_path(),
        }
    }
}

/// Generative API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_base_url")]
    pub base_url: String,
    /// Model used when the user has no preferred model.
    #[serde(default = "default_generation_model")]
    pub default_model: String,
    /// Upper bound for one upstream call, in seconds.
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

fn default_generation_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_generation_model() -> String {
    "gemini-pro".to_string()
}

fn default_generation_timeout() -> u64 {
    60
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_generation_base_url(),
            default_model: default_generation_model(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to use JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
