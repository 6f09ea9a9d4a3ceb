//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "SALES_";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {reason}")]
    Env { var: String, reason: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: TOML file (if given), then `SALES_*` environment
/// overrides, then validation.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config(&fs::read_to_string(path)?)?,
        None => ServiceConfig::default(),
    };

    apply_env_overrides(&mut config, std::env::vars())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse a TOML document without validating it.
pub fn parse_config(content: &str) -> Result<ServiceConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Apply `SALES_*` overrides from `vars`. Unknown variables are ignored.
pub fn apply_env_overrides<I>(config: &mut ServiceConfig, vars: I) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        let Some(name) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };

        match name {
            "HTTP_ADDRESS" => config.http.address = value,
            "HTTP_MAX_CONNECTIONS" => config.http.max_connections = parse_env(&key, &value)?,
            "HTTP_REQUEST_TIMEOUT_SECS" => config.http.request_timeout_secs = parse_env(&key, &value)?,
            "SHUTDOWN_GRACE_PERIOD_SECS" => config.shutdown.grace_period_secs = parse_env(&key, &value)?,
            "LOG_LEVEL" => config.observability.log_level = value,
            "LOG_FORMAT" => config.observability.log_format = parse_env(&key, &value)?,
            "METRICS_ENABLED" => config.observability.metrics_enabled = parse_env(&key, &value)?,
            "METRICS_ADDRESS" => config.observability.metrics_address = value,
            "ADMIN_ENABLED" => config.admin.enabled = parse_env(&key, &value)?,
            "ADMIN_API_KEY" => config.admin.api_key = value,
            _ => {}
        }
    }
    Ok(())
}

fn parse_env<T>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Env {
        var: var.to_string(),
        reason: e.to_string(),
    })
}
