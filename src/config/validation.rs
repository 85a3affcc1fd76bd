//! Configuration validation utilities.

use std::time::Duration;

use thiserror::Error;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Expand environment variables in a string.
/// Supports ${VAR} and ${VAR:-default} syntax.
pub fn expand_env_vars(input: &str) -> String {
    static ENV_VAR_REGEX: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();

    let regex = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("failed to compile env var regex")
    });

    regex
        .replace_all(input, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            std::env::var(var_name).unwrap_or_else(|_| default_value.to_string())
        })
        .into_owned()
}

/// Require a duration of at least one second.
pub(crate) fn require_at_least_one_second(
    name: &str,
    value: Duration,
) -> Result<(), ConfigError> {
    if value < Duration::from_secs(1) {
        return Err(ConfigError::ValidationError(format!(
            "{name} must be at least 1s, got {value:?}"
        )));
    }
    Ok(())
}

/// Require a whole number of seconds, at least one.
///
/// `ping -W` and the `timeout` query parameter only carry whole seconds.
pub(crate) fn require_whole_seconds(name: &str, value: Duration) -> Result<(), ConfigError> {
    require_at_least_one_second(name, value)?;
    if value.subsec_nanos() != 0 {
        return Err(ConfigError::ValidationError(format!(
            "{name} must be a whole number of seconds, got {value:?}"
        )));
    }
    Ok(())
}
