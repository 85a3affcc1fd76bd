//! Core probe traits and types.

use std::time::Duration;

use thiserror::Error;

use super::target::Target;

/// Default number of ICMP echo requests.
pub const DEFAULT_ICMP_COUNT: u32 = 3;

/// Default time allowed per echo reply (2 seconds).
pub const DEFAULT_PER_PACKET_TIMEOUT: Duration = Duration::from_secs(2);

/// Default wall-clock bound on a whole `ping` invocation (8 seconds).
pub const DEFAULT_OVERALL_TIMEOUT: Duration = Duration::from_secs(8);

/// Default fallback port.
pub const DEFAULT_TCP_PORT: u16 = 443;

/// Default TCP connect timeout (2 seconds).
pub const DEFAULT_TCP_TIMEOUT: Duration = Duration::from_secs(2);

/// Errors surfaced by the orchestrator to its caller.
///
/// Probe-level failures never show up here; they are absorbed into a
/// negative [`ProbeOutcome`].
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Target is neither an IP address nor a domain name.
    #[error("invalid target: '{0}'")]
    InvalidTarget(String),
}

/// Why a single probe attempt did not confirm reachability.
///
/// Only used for logging; callers see `succeeded = false`.
#[derive(Debug, Error)]
pub enum ProbeFailure {
    /// The probe exceeded its time bound.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The external ping executable could not be launched.
    #[error("failed to execute ping: {0}")]
    Execution(#[source] std::io::Error),

    /// TCP connect failed (refused, unreachable, resolution failure).
    #[error("connect failed: {0}")]
    Connect(#[source] std::io::Error),
}

/// Outcome of one probe attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeOutcome {
    /// Whether the target answered.
    pub succeeded: bool,
    /// Measured latency in milliseconds. Only ever set when `succeeded`.
    pub latency_ms: Option<f64>,
}

impl ProbeOutcome {
    /// A successful probe, optionally with a latency measurement.
    pub fn reachable(latency_ms: Option<f64>) -> Self {
        Self {
            succeeded: true,
            latency_ms,
        }
    }

    /// A failed probe. Never carries latency.
    pub fn unreachable() -> Self {
        Self {
            succeeded: false,
            latency_ms: None,
        }
    }
}

/// Per-request probe parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeConfig {
    /// Number of ICMP echo requests (at least 1).
    pub icmp_count: u32,
    /// Time allowed per echo reply (at least 1 second).
    pub icmp_per_packet_timeout: Duration,
    /// Wall-clock bound on the whole ICMP invocation.
    pub icmp_overall_timeout: Duration,
    /// Fallback TCP port.
    pub tcp_port: u16,
    /// TCP connect timeout.
    pub tcp_timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            icmp_count: DEFAULT_ICMP_COUNT,
            icmp_per_packet_timeout: DEFAULT_PER_PACKET_TIMEOUT,
            icmp_overall_timeout: DEFAULT_OVERALL_TIMEOUT,
            tcp_port: DEFAULT_TCP_PORT,
            tcp_timeout: DEFAULT_TCP_TIMEOUT,
        }
    }
}

impl ProbeConfig {
    /// Set the ICMP echo count. Clamped to a minimum of 1.
    pub fn with_count(mut self, count: u32) -> Self {
        self.icmp_count = count.max(1);
        self
    }

    /// Set the per-packet ICMP timeout.
    pub fn with_per_packet_timeout(mut self, timeout: Duration) -> Self {
        self.icmp_per_packet_timeout = timeout;
        self
    }

    /// Set the overall ICMP timeout.
    pub fn with_overall_timeout(mut self, timeout: Duration) -> Self {
        self.icmp_overall_timeout = timeout;
        self
    }

    /// Set the fallback TCP port.
    pub fn with_tcp_port(mut self, port: u16) -> Self {
        self.tcp_port = port;
        self
    }

    /// Set the TCP connect timeout.
    pub fn with_tcp_timeout(mut self, timeout: Duration) -> Self {
        self.tcp_timeout = timeout;
        self
    }
}

/// Primary reachability probe (ICMP echo).
///
/// Implementations must never fail: every problem, including a missing
/// executable or an expired timeout, is reported as
/// [`ProbeOutcome::unreachable`].
#[async_trait::async_trait]
pub trait IcmpProbe: Send + Sync + 'static {
    /// Send `count` echo requests and wait at most `overall_timeout`.
    async fn probe_icmp(
        &self,
        target: &Target,
        count: u32,
        per_packet_timeout: Duration,
        overall_timeout: Duration,
    ) -> ProbeOutcome;
}

/// Fallback reachability probe (TCP handshake).
#[async_trait::async_trait]
pub trait TcpProbe: Send + Sync + 'static {
    /// Connect to `(target, port)` within `timeout`.
    async fn probe_tcp(&self, target: &Target, port: u16, timeout: Duration) -> ProbeOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_config_defaults() {
        let config = ProbeConfig::default();
        assert_eq!(config.icmp_count, 3);
        assert_eq!(config.icmp_per_packet_timeout, Duration::from_secs(2));
        assert_eq!(config.icmp_overall_timeout, Duration::from_secs(8));
        assert_eq!(config.tcp_port, 443);
        assert_eq!(config.tcp_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_probe_config_count_minimum() {
        let config = ProbeConfig::default().with_count(0);
        assert_eq!(config.icmp_count, 1);
    }

    #[test]
    fn test_unreachable_has_no_latency() {
        let outcome = ProbeOutcome::unreachable();
        assert!(!outcome.succeeded);
        assert_eq!(outcome.latency_ms, None);
    }
}
