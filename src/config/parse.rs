use super::types::*;
use crate::config::{expand_env_vars, expand_tilde, unexpanded_env_vars};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub const DEFAULT_INTERVAL_SECS: u64 = 5;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let yaml_string = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    parse_config(&yaml_string)
}

/// Parses and validates a config document, expanding `$env{..}` references first.
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    let yaml_string = expand_env_vars(yaml);

    check_unexpanded_vars(&yaml_string)?;

    let mut config: Config = serde_yaml::from_str(&yaml_string)?;

    config.checkpoint.path = expand_tilde(&config.checkpoint.path);

    validate_config(&config)?;

    Ok(config)
}

/// Checks for unexpanded environment variables and returns a helpful error
fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let unexpanded_vars = unexpanded_env_vars(yaml_string);

    if unexpanded_vars.is_empty() {
        return Ok(());
    }

    let error_msg = if unexpanded_vars.len() == 1 {
        format!(
            "Environment variable $env{{{0}}} is not set.\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variable: export {0}=...\n\
             2. Replace $env{{{0}}} in the config file with the actual value",
            unexpanded_vars[0]
        )
    } else {
        format!(
            "Environment variables are not set: {}\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variables\n\
             2. Replace the variables in the config file with actual values",
            unexpanded_vars.join(", ")
        )
    };

    Err(ConfigError::Validation(error_msg))
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.api.url.trim().is_empty() {
        errors.push("api.url cannot be empty".to_string());
    }
    if config.api.credential.trim().is_empty() {
        errors.push("api.credential must have a value".to_string());
    }
    if config.api.retry.max_attempts == 0 {
        errors.push("api.retry.max_attempts must be at least 1".to_string());
    }
    if config.api.request_timeout.is_zero() {
        errors.push("api.request_timeout must be greater than zero".to_string());
    }

    if config.sink.url.trim().is_empty() {
        errors.push("sink.url cannot be empty".to_string());
    }
    if config.sink.token.trim().is_empty() {
        errors.push("sink.token must have a value".to_string());
    }
    if config.sink.drain_duration.is_zero() {
        errors.push("sink.drain_duration must be greater than zero".to_string());
    }
    if config.sink.queue_capacity == 0 {
        errors.push("sink.queue_capacity must be at least 1".to_string());
    }
    if config.sink.enqueue_timeout.is_zero() {
        errors.push("sink.enqueue_timeout must be greater than zero".to_string());
    }
    if config.sink.concurrency == 0 {
        errors.push("sink.concurrency must be at least 1".to_string());
    }

    if config.cycle_timeout.is_zero() {
        errors.push("cycle_timeout must be greater than zero".to_string());
    }

    if let Some(status) = &config.status {
        if status.listen.parse::<SocketAddr>().is_err() {
            errors.push(format!(
                "status.listen '{}' is not a valid socket address",
                status.listen
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}

/// Turns the configured interval into a duration.
///
/// Anything other than a positive whole number of seconds (numeric or quoted)
/// falls back to [`DEFAULT_INTERVAL_SECS`]. The fallback is informational only.
pub fn resolve_interval(setting: Option<&IntervalSetting>) -> Duration {
    let default = Duration::from_secs(DEFAULT_INTERVAL_SECS);

    let seconds = match setting {
        None => return default,
        Some(IntervalSetting::Seconds(n)) => Some(*n),
        Some(IntervalSetting::Other(serde_yaml::Value::String(s))) => s.trim().parse::<i64>().ok(),
        Some(IntervalSetting::Other(_)) => None,
    };

    match seconds {
        None => {
            info!(
                "Interval is not a number. Used default value - {} seconds",
                DEFAULT_INTERVAL_SECS
            );
            default
        }
        Some(n) if n <= 0 => {
            info!(
                "Interval is not a positive number. Used default value - {} seconds",
                DEFAULT_INTERVAL_SECS
            );
            default
        }
        Some(n) => Duration::from_secs(n as u64),
    }
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        resolve_interval(self.interval.as_ref())
    }

    pub fn status_listen_addr(&self) -> Option<SocketAddr> {
        self.status
            .as_ref()
            .and_then(|status| status.listen.parse().ok())
    }
}
