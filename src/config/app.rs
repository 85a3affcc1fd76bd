//! Application configuration structures.

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::probe::ProbeConfig;
use crate::probe::icmp::DEFAULT_PING_PROGRAM;
pub use crate::probe::{
    DEFAULT_ICMP_COUNT as DEFAULT_COUNT, DEFAULT_OVERALL_TIMEOUT, DEFAULT_PER_PACKET_TIMEOUT,
    DEFAULT_TCP_PORT, DEFAULT_TCP_TIMEOUT,
};

use super::validation::{
    ConfigError, expand_env_vars, require_at_least_one_second, require_whole_seconds,
};

// =============================================================================
// Constants
// =============================================================================

/// Default server port.
pub const DEFAULT_PORT: u16 = 5000;

/// Default upper bound on the per-request echo count.
pub const DEFAULT_MAX_COUNT: u32 = 10;

/// Default upper bound on the per-request ICMP timeout (10 seconds).
pub const DEFAULT_MAX_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval between echo requests used by `ping` when not overridden.
const PING_INTERVAL: Duration = Duration::from_secs(1);

fn default_count() -> u32 {
    DEFAULT_COUNT
}

fn default_max_count() -> u32 {
    DEFAULT_MAX_COUNT
}

fn default_per_packet_timeout() -> Duration {
    DEFAULT_PER_PACKET_TIMEOUT
}

fn default_max_timeout() -> Duration {
    DEFAULT_MAX_TIMEOUT
}

fn default_overall_timeout() -> Duration {
    DEFAULT_OVERALL_TIMEOUT
}

fn default_tcp_port() -> u16 {
    DEFAULT_TCP_PORT
}

fn default_tcp_timeout() -> Duration {
    DEFAULT_TCP_TIMEOUT
}

fn default_ping_program() -> String {
    DEFAULT_PING_PROGRAM.to_string()
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Web server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address (default: "0.0.0.0").
    pub bind: String,

    /// Server port (default: 5000).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

// =============================================================================
// Auth Configuration
// =============================================================================

/// Shared-secret authentication.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Expected `Authorization` header value. Supports `${VAR}` expansion.
    pub token: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Probe Configuration
// =============================================================================

/// Server-side probe defaults and per-request bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeDefaults {
    /// Echo count when the request does not give one (default: 3).
    #[serde(default = "default_count")]
    pub count: u32,

    /// Largest echo count a request may ask for (default: 10).
    #[serde(default = "default_max_count")]
    pub max_count: u32,

    /// Per-packet ICMP timeout (default: 2s).
    #[serde(default = "default_per_packet_timeout", with = "humantime_serde")]
    pub per_packet_timeout: Duration,

    /// Largest per-packet timeout a request may ask for (default: 10s).
    #[serde(default = "default_max_timeout", with = "humantime_serde")]
    pub max_timeout: Duration,

    /// Bound on the whole `ping` invocation (default: 8s).
    #[serde(default = "default_overall_timeout", with = "humantime_serde")]
    pub overall_timeout: Duration,

    /// Fallback TCP port (default: 443).
    #[serde(default = "default_tcp_port")]
    pub tcp_port: u16,

    /// TCP connect timeout (default: 2s).
    #[serde(default = "default_tcp_timeout", with = "humantime_serde")]
    pub tcp_timeout: Duration,

    /// Ping executable, a name on `PATH` or an absolute path (default: "ping").
    #[serde(default = "default_ping_program")]
    pub ping_program: String,
}

impl Default for ProbeDefaults {
    fn default() -> Self {
        Self {
            count: DEFAULT_COUNT,
            max_count: DEFAULT_MAX_COUNT,
            per_packet_timeout: DEFAULT_PER_PACKET_TIMEOUT,
            max_timeout: DEFAULT_MAX_TIMEOUT,
            overall_timeout: DEFAULT_OVERALL_TIMEOUT,
            tcp_port: DEFAULT_TCP_PORT,
            tcp_timeout: DEFAULT_TCP_TIMEOUT,
            ping_program: DEFAULT_PING_PROGRAM.to_string(),
        }
    }
}

impl ProbeDefaults {
    /// Build a per-request [`ProbeConfig`] from already-bounded overrides.
    ///
    /// The overall bound grows with the echo count so a slow but answering
    /// target is not cut off by the default bound.
    pub fn probe_config(&self, count: Option<u32>, per_packet: Option<Duration>) -> ProbeConfig {
        let count = count.unwrap_or(self.count).max(1);
        let per_packet = per_packet.unwrap_or(self.per_packet_timeout);
        let needed = PING_INTERVAL * (count - 1) + per_packet;

        ProbeConfig::default()
            .with_count(count)
            .with_per_packet_timeout(per_packet)
            .with_overall_timeout(self.overall_timeout.max(needed))
            .with_tcp_port(self.tcp_port)
            .with_tcp_timeout(self.tcp_timeout)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_count == 0 {
            return Err(ConfigError::ValidationError(
                "probe max_count must be positive".to_string(),
            ));
        }
        if self.count == 0 || self.count > self.max_count {
            return Err(ConfigError::ValidationError(format!(
                "probe count must be between 1 and {}, got {}",
                self.max_count, self.count
            )));
        }

        require_whole_seconds("probe per_packet_timeout", self.per_packet_timeout)?;
        require_whole_seconds("probe max_timeout", self.max_timeout)?;
        require_at_least_one_second("probe overall_timeout", self.overall_timeout)?;
        require_at_least_one_second("probe tcp_timeout", self.tcp_timeout)?;

        if self.per_packet_timeout > self.max_timeout {
            return Err(ConfigError::ValidationError(
                "probe per_packet_timeout exceeds max_timeout".to_string(),
            ));
        }
        if self.tcp_port == 0 {
            return Err(ConfigError::ValidationError(
                "probe tcp_port must be non-zero".to_string(),
            ));
        }
        if self.ping_program.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "probe ping_program cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Web server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Probe defaults and bounds.
    #[serde(default)]
    pub probe: ProbeDefaults,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// `${VAR}` references in the auth token are expanded. Validation is left
    /// to the caller so CLI/env overrides can be applied first.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    /// Returns `ConfigError::ParseError` on malformed YAML.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yaml::from_str(content)?;
        config.auth.token = expand_env_vars(&config.auth.token);
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate server bind address
        self.server.bind.parse::<IpAddr>().map_err(|_| {
            ConfigError::ValidationError(format!(
                "invalid server bind address: '{}'",
                self.server.bind
            ))
        })?;

        // Validate server port
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server port must be non-zero".to_string(),
            ));
        }

        // An empty token would let every request through
        if self.auth.token.is_empty() {
            return Err(ConfigError::ValidationError(
                "auth token must be set (auth.token or AUTH_TOKEN)".to_string(),
            ));
        }

        self.probe.validate()
    }
}
