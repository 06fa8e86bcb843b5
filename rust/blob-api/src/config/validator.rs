//! Startup validation of [`AppConfig`].

use super::AppConfig;
use super::error::{ConfigResult, ConfigurationError};

/// Checks the loaded configuration before the server starts.
#[derive(Debug)]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the entire application configuration, reporting every issue.
    pub fn validate(config: &AppConfig) -> ConfigResult<()> {
        let mut errors = Vec::new();

        match config.gateway.jwt_secret.as_deref() {
            None => errors.push(ConfigurationError::missing_required(
                "JWT signing secret",
                "Issuing and verifying session tokens",
                "JWT_SECRET",
            )),
            Some(secret) if secret.trim().is_empty() => {
                errors.push(ConfigurationError::invalid(
                    "JWT_SECRET is empty",
                    "Set JWT_SECRET to a long random string",
                ));
            }
            Some(_) => {}
        }

        if config.gateway.jwt_expiry_days <= 0 {
            errors.push(ConfigurationError::invalid(
                format!(
                    "gateway.jwt_expiry_days must be positive, got {}",
                    config.gateway.jwt_expiry_days
                ),
                "Set BLOB__GATEWAY__JWT_EXPIRY_DAYS to 1 or more",
            ));
        }

        if config.server.port == 0 {
            errors.push(ConfigurationError::invalid(
                "server.port must be greater than zero",
                "Set PORT or BLOB__SERVER__PORT to a free port, e.g. 8787",
            ));
        }

        if config.generation.timeout_secs == 0 {
            errors.push(ConfigurationError::invalid(
                "generation.timeout_secs must be greater than zero",
                "Set BLOB__GENERATION__TIMEOUT_SECS to a positive number of seconds",
            ));
        }

        if config.server.timeout_secs == 0 {
            errors.push(ConfigurationError::invalid(
                "server.timeout_secs must be greater than zero",
                "Set BLOB__SERVER__TIMEOUT_SECS to a positive number of seconds",
            ));
        }

        if let Err(e) = url::Url::parse(&config.generation.base_url) {
            errors.push(ConfigurationError::invalid(
                format!(
                    "generation.base_url '{}' is not a valid URL: {e}",
                    config.generation.base_url
                ),
                "Set BLOB__GENERATION__BASE_URL to e.g. https://generativelanguage.googleapis.com",
            ));
        }

        if let Err(e) = url::Url::parse(&config.gateway.google_tokeninfo_url) {
            errors.push(ConfigurationError::invalid(
                format!("gateway.google_tokeninfo_url is not a valid URL: {e}"),
                "Unset BLOB__GATEWAY__GOOGLE_TOKENINFO_URL to use the default endpoint",
            ));
        }

        if config.database.path.trim().is_empty() {
            errors.push(ConfigurationError::invalid(
                "database.path is empty",
                "Set BLOB_DATABASE_PATH to a writable file path",
            ));
        }

        ConfigurationError::collect(errors)
    }
}
