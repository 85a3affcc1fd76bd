//! Reachprobe - Network Reachability Probe
//!
//! This crate answers one question over HTTP: is this host reachable?
//! It can be used as a library by other Rust projects, or run as a standalone
//! binary with the `reachprobe` executable.
//!
//! # Architecture
//!
//! - **Probe**: target classification, ICMP via the system `ping`, TCP connect fallback
//! - **Server**: authenticated `/ping` endpoint on Axum
//! - **Config**: YAML configuration with CLI/env overrides
//!
//! # Example
//!
//! ```rust,ignore
//! use reachprobe::{ProbeConfig, ProbeOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = ProbeOrchestrator::system("ping");
//!     let result = orchestrator.probe("1.1.1.1", &ProbeConfig::default()).await?;
//!     println!("reachable={} method={}", result.succeeded, result.method);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod probe;
pub mod server;

pub use config::{AppConfig, ConfigError, ProbeDefaults};
pub use probe::{
    ProbeConfig, ProbeError, ProbeMethod, ProbeOrchestrator, ProbeOutcome, ProbeResult, Target,
    TargetKind, classify,
};
pub use server::{AppState, create_router};
