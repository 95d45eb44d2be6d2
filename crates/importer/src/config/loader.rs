use std::path::Path;

use crate::config::schema::ClientConfig;
use crate::error::ConfigError;

/// Environment variable that overrides `api_url`.
pub const API_URL_ENV: &str = "IMPORTER_API_URL";

/// Smallest accepted polling period.
const MIN_POLL_INTERVAL_MS: u64 = 50;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ClientConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<ClientConfig, ConfigError> {
    let config: ClientConfig = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

/// Applies environment overrides and re-validates the result.
pub fn apply_env_overrides(mut config: ClientConfig) -> Result<ClientConfig, ConfigError> {
    if let Ok(url) = std::env::var(API_URL_ENV) {
        if !url.trim().is_empty() {
            log::debug!("Using API URL from {}", API_URL_ENV);
            config.api_url = url.trim().to_string();
        }
    }

    validate_config(&config)?;

    Ok(config)
}

pub fn validate_config(config: &ClientConfig) -> Result<(), ConfigError> {
    let url = config.api_url.trim();
    if url.is_empty() {
        return Err(ConfigError::Validation {
            message: "api_url must not be empty".to_string(),
        });
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::Validation {
            message: format!("api_url must be an http(s) URL, got '{}'", url),
        });
    }

    if config.poll_interval_ms < MIN_POLL_INTERVAL_MS {
        return Err(ConfigError::Validation {
            message: format!(
                "poll_interval_ms must be at least {}, got {}",
                MIN_POLL_INTERVAL_MS, config.poll_interval_ms
            ),
        });
    }

    if config.event_capacity == 0 {
        return Err(ConfigError::Validation {
            message: "event_capacity must be greater than zero".to_string(),
        });
    }

    Ok(())
}
