//! Configuration module for the probe service.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Server settings (port, bind address)
//! - Authentication (shared token, `${VAR}` expansion)
//! - Probe defaults and per-request bounds

mod app;
mod validation;

pub use app::{AppConfig, AuthConfig, ProbeDefaults, ServerConfig};
pub use validation::{ConfigError, expand_env_vars};

// Re-export constants
pub use app::{DEFAULT_COUNT, DEFAULT_MAX_COUNT, DEFAULT_PORT, DEFAULT_TCP_PORT};
