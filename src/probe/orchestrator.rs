//! ICMP-first probing with TCP fallback.

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use super::icmp::IcmpProber;
use super::target::Target;
use super::tcp::TcpProber;
use super::traits::{IcmpProbe, ProbeConfig, ProbeError, ProbeOutcome, TcpProbe};

/// Method that produced a [`ProbeResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMethod {
    /// ICMP echo via `ping`.
    Icmp,
    /// TCP connect to the given port.
    Tcp(u16),
}

impl fmt::Display for ProbeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Icmp => f.write_str("icmp"),
            Self::Tcp(port) => write!(f, "tcp:{port}"),
        }
    }
}

impl Serialize for ProbeMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Final, normalized reachability result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeResult {
    pub succeeded: bool,
    pub method: ProbeMethod,
    /// Present only when `succeeded`.
    pub latency_ms: Option<f64>,
    pub target: Target,
}

impl ProbeResult {
    /// Build a result from the outcome of the last attempted method.
    pub fn new(target: Target, method: ProbeMethod, outcome: ProbeOutcome) -> Self {
        Self {
            succeeded: outcome.succeeded,
            method,
            latency_ms: outcome.latency_ms.filter(|_| outcome.succeeded),
            target,
        }
    }
}

/// Progress of one orchestration.
///
/// `Pending -> IcmpAttempted -> Resolved`, or `Pending -> Resolved` when ICMP
/// succeeds. The first success wins; otherwise the last attempt wins.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeState {
    /// Nothing attempted yet.
    Pending,
    /// ICMP ran and did not confirm reachability.
    IcmpAttempted(ProbeOutcome),
    /// Terminal.
    Resolved {
        method: ProbeMethod,
        outcome: ProbeOutcome,
    },
}

impl ProbeState {
    /// Record the ICMP outcome. Only meaningful from `Pending`.
    #[must_use]
    pub fn after_icmp(self, outcome: ProbeOutcome) -> Self {
        match self {
            Self::Pending if outcome.succeeded => Self::Resolved {
                method: ProbeMethod::Icmp,
                outcome,
            },
            Self::Pending => Self::IcmpAttempted(outcome),
            other => other,
        }
    }

    /// Record the TCP fallback outcome. Only meaningful from `IcmpAttempted`.
    #[must_use]
    pub fn after_tcp(self, port: u16, outcome: ProbeOutcome) -> Self {
        match self {
            Self::IcmpAttempted(_) => Self::Resolved {
                method: ProbeMethod::Tcp(port),
                outcome,
            },
            other => other,
        }
    }
}

/// Runs the ICMP probe and falls back to TCP when it fails.
///
/// Holds no per-request state; share it behind an `Arc` across requests.
#[derive(Clone)]
pub struct ProbeOrchestrator {
    icmp: Arc<dyn IcmpProbe>,
    tcp: Arc<dyn TcpProbe>,
}

impl ProbeOrchestrator {
    /// Create an orchestrator from explicit probers.
    pub fn new(icmp: Arc<dyn IcmpProbe>, tcp: Arc<dyn TcpProbe>) -> Self {
        Self { icmp, tcp }
    }

    /// Orchestrator using the system `ping` executable and socket stack.
    pub fn system(ping_program: impl Into<String>) -> Self {
        Self::new(
            Arc::new(IcmpProber::new(ping_program)),
            Arc::new(TcpProber::new()),
        )
    }

    /// Classify `raw_target` and probe it.
    ///
    /// # Errors
    /// Returns `ProbeError::InvalidTarget` before any probing if the target is
    /// neither an IP address nor a domain name. Unreachable targets are not
    /// errors.
    pub async fn probe(
        &self,
        raw_target: &str,
        config: &ProbeConfig,
    ) -> Result<ProbeResult, ProbeError> {
        let target = Target::parse(raw_target)?;
        let mut state = ProbeState::Pending;

        loop {
            state = match state {
                ProbeState::Pending => {
                    let outcome = self
                        .icmp
                        .probe_icmp(
                            &target,
                            config.icmp_count,
                            config.icmp_per_packet_timeout,
                            config.icmp_overall_timeout,
                        )
                        .await;
                    state.after_icmp(outcome)
                }
                ProbeState::IcmpAttempted(_) => {
                    tracing::debug!(target = %target, port = config.tcp_port, "ICMP failed, falling back to TCP");
                    let outcome = self
                        .tcp
                        .probe_tcp(&target, config.tcp_port, config.tcp_timeout)
                        .await;
                    state.after_tcp(config.tcp_port, outcome)
                }
                ProbeState::Resolved { method, outcome } => {
                    tracing::info!(
                        target = %target,
                        method = %method,
                        succeeded = outcome.succeeded,
                        latency_ms = ?outcome.latency_ms,
                        "Probe resolved"
                    );
                    return Ok(ProbeResult::new(target, method, outcome));
                }
            };
        }
    }
}

impl fmt::Debug for ProbeOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeOrchestrator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Prober returning a fixed outcome and counting calls.
    struct FakeProbe {
        outcome: ProbeOutcome,
        calls: AtomicUsize,
    }

    impl FakeProbe {
        fn new(outcome: ProbeOutcome) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl IcmpProbe for FakeProbe {
        async fn probe_icmp(&self, _: &Target, _: u32, _: Duration, _: Duration) -> ProbeOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome
        }
    }

    #[async_trait::async_trait]
    impl TcpProbe for FakeProbe {
        async fn probe_tcp(&self, _: &Target, _: u16, _: Duration) -> ProbeOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome
        }
    }

    fn orchestrator(icmp: &Arc<FakeProbe>, tcp: &Arc<FakeProbe>) -> ProbeOrchestrator {
        ProbeOrchestrator::new(icmp.clone(), tcp.clone())
    }

    #[test]
    fn test_state_icmp_success_resolves() {
        let outcome = ProbeOutcome::reachable(Some(1.5));
        let state = ProbeState::Pending.after_icmp(outcome);
        assert_eq!(
            state,
            ProbeState::Resolved {
                method: ProbeMethod::Icmp,
                outcome
            }
        );
        // Already resolved: a later TCP outcome is ignored.
        assert_eq!(
            state.clone().after_tcp(443, ProbeOutcome::unreachable()),
            state
        );
    }

    #[test]
    fn test_state_icmp_failure_then_tcp_wins() {
        let state = ProbeState::Pending.after_icmp(ProbeOutcome::unreachable());
        assert!(matches!(state, ProbeState::IcmpAttempted(_)));

        let state = state.after_tcp(443, ProbeOutcome::unreachable());
        assert_eq!(
            state,
            ProbeState::Resolved {
                method: ProbeMethod::Tcp(443),
                outcome: ProbeOutcome::unreachable()
            }
        );
    }

    #[test]
    fn test_state_tcp_before_icmp_is_ignored() {
        let state = ProbeState::Pending.after_tcp(443, ProbeOutcome::reachable(Some(1.0)));
        assert_eq!(state, ProbeState::Pending);
    }

    #[test]
    fn test_result_drops_latency_on_failure() {
        let target = Target::parse("example.com").unwrap();
        let outcome = ProbeOutcome {
            succeeded: false,
            latency_ms: Some(3.0),
        };
        let result = ProbeResult::new(target, ProbeMethod::Tcp(443), outcome);
        assert_eq!(result.latency_ms, None);
    }

    #[test]
    fn test_method_display() {
        assert_eq!(ProbeMethod::Icmp.to_string(), "icmp");
        assert_eq!(ProbeMethod::Tcp(443).to_string(), "tcp:443");
    }

    #[tokio::test]
    async fn test_icmp_success_skips_tcp() {
        let icmp = FakeProbe::new(ProbeOutcome::reachable(Some(12.4)));
        let tcp = FakeProbe::new(ProbeOutcome::reachable(Some(1.0)));

        let result = orchestrator(&icmp, &tcp)
            .probe("8.8.8.8", &ProbeConfig::default())
            .await
            .unwrap();

        assert!(result.succeeded);
        assert_eq!(result.method, ProbeMethod::Icmp);
        assert_eq!(result.latency_ms, Some(12.4));
        assert_eq!(icmp.calls(), 1);
        assert_eq!(tcp.calls(), 0);
    }

    #[tokio::test]
    async fn test_icmp_success_without_latency() {
        let icmp = FakeProbe::new(ProbeOutcome::reachable(None));
        let tcp = FakeProbe::new(ProbeOutcome::unreachable());

        let result = orchestrator(&icmp, &tcp)
            .probe("example.com", &ProbeConfig::default())
            .await
            .unwrap();

        assert!(result.succeeded);
        assert_eq!(result.method, ProbeMethod::Icmp);
        assert_eq!(result.latency_ms, None);
        assert_eq!(tcp.calls(), 0);
    }

    #[tokio::test]
    async fn test_icmp_failure_falls_back_to_tcp_success() {
        let icmp = FakeProbe::new(ProbeOutcome::unreachable());
        let tcp = FakeProbe::new(ProbeOutcome::reachable(Some(23.45)));

        let result = orchestrator(&icmp, &tcp)
            .probe("example.com", &ProbeConfig::default())
            .await
            .unwrap();

        assert!(result.succeeded);
        assert_eq!(result.method, ProbeMethod::Tcp(443));
        assert_eq!(result.latency_ms, Some(23.45));
        assert_eq!(result.target.as_str(), "example.com");
        assert_eq!(icmp.calls(), 1);
        assert_eq!(tcp.calls(), 1);
    }

    #[tokio::test]
    async fn test_both_fail_reports_tcp() {
        let icmp = FakeProbe::new(ProbeOutcome::unreachable());
        let tcp = FakeProbe::new(ProbeOutcome::unreachable());

        let result = orchestrator(&icmp, &tcp)
            .probe("203.0.113.5", &ProbeConfig::default().with_count(1))
            .await
            .unwrap();

        assert!(!result.succeeded);
        assert_eq!(result.method, ProbeMethod::Tcp(443));
        assert_eq!(result.latency_ms, None);
        assert_eq!(icmp.calls(), 1);
        assert_eq!(tcp.calls(), 1);
    }

    #[tokio::test]
    async fn test_custom_tcp_port_is_reported() {
        let icmp = FakeProbe::new(ProbeOutcome::unreachable());
        let tcp = FakeProbe::new(ProbeOutcome::reachable(Some(0.5)));

        let config = ProbeConfig::default().with_tcp_port(8443);
        let result = orchestrator(&icmp, &tcp)
            .probe("10.0.0.1", &config)
            .await
            .unwrap();

        assert_eq!(result.method, ProbeMethod::Tcp(8443));
    }

    #[tokio::test]
    async fn test_invalid_target_never_probes() {
        let icmp = FakeProbe::new(ProbeOutcome::reachable(None));
        let tcp = FakeProbe::new(ProbeOutcome::reachable(None));

        let err = orchestrator(&icmp, &tcp)
            .probe("not a domain!", &ProbeConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ProbeError::InvalidTarget(t) if t == "not a domain!"));
        assert_eq!(icmp.calls(), 0);
        assert_eq!(tcp.calls(), 0);
    }

    #[tokio::test]
    async fn test_result_serializes_method_and_target_as_strings() {
        let icmp = FakeProbe::new(ProbeOutcome::unreachable());
        let tcp = FakeProbe::new(ProbeOutcome::unreachable());

        let result = orchestrator(&icmp, &tcp)
            .probe("::1", &ProbeConfig::default())
            .await
            .unwrap();
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["method"], "tcp:443");
        assert_eq!(json["target"], "::1");
        assert!(json["latency_ms"].is_null());
    }

    // Needs real network access and a `ping` binary.
    #[tokio::test]
    #[ignore]
    async fn test_unreachable_test_net_address() {
        let config = ProbeConfig::default()
            .with_count(1)
            .with_per_packet_timeout(Duration::from_secs(1))
            .with_tcp_timeout(Duration::from_secs(1));
        let result = ProbeOrchestrator::system("ping")
            .probe("203.0.113.5", &config)
            .await
            .unwrap();

        assert!(!result.succeeded);
        assert_eq!(result.method, ProbeMethod::Tcp(443));
        assert_eq!(result.latency_ms, None);
    }

    // Needs real network access; ICMP is forced to fail.
    #[tokio::test]
    #[ignore]
    async fn test_example_com_via_tcp_fallback() {
        let orchestrator = ProbeOrchestrator::new(
            Arc::new(IcmpProber::new("/nonexistent/ping")),
            Arc::new(TcpProber::new()),
        );
        let result = orchestrator
            .probe("example.com", &ProbeConfig::default().with_tcp_timeout(Duration::from_secs(5)))
            .await
            .unwrap();

        assert!(result.succeeded);
        assert_eq!(result.method, ProbeMethod::Tcp(443));
        assert!(result.latency_ms.unwrap() > 0.0);
    }
}
