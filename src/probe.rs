//! Probe Layer
//!
//! Reachability probing for a single target. ICMP echo is tried first through
//! the system `ping` utility; when it does not confirm reachability, a TCP
//! connect to a well-known port is used as a fallback.
//!
//! # Architecture
//!
//! - [`classify`] / [`Target`]: validation gate for raw target strings
//! - [`IcmpProber`]: external `ping` invocation and output parsing
//! - [`TcpProber`]: TCP handshake timing
//! - [`ProbeOrchestrator`]: ICMP first, TCP fallback, one [`ProbeResult`]
//!
//! # Example
//!
//! ```rust,no_run
//! use reachprobe::probe::{ProbeConfig, ProbeOrchestrator};
//!
//! # async fn run() -> Result<(), reachprobe::probe::ProbeError> {
//! let orchestrator = ProbeOrchestrator::system("ping");
//! let result = orchestrator.probe("example.com", &ProbeConfig::default()).await?;
//! println!("{} via {}: {:?}", result.target, result.method, result.latency_ms);
//! # Ok(())
//! # }
//! ```

pub mod icmp;
mod orchestrator;
pub mod target;
pub mod tcp;
mod traits;

pub use icmp::IcmpProber;
pub use orchestrator::{ProbeMethod, ProbeOrchestrator, ProbeResult, ProbeState};
pub use target::{Target, TargetKind, classify};
pub use tcp::TcpProber;
pub use traits::{
    DEFAULT_ICMP_COUNT, DEFAULT_OVERALL_TIMEOUT, DEFAULT_PER_PACKET_TIMEOUT, DEFAULT_TCP_PORT,
    DEFAULT_TCP_TIMEOUT, IcmpProbe, ProbeConfig, ProbeError, ProbeFailure, ProbeOutcome, TcpProbe,
};
