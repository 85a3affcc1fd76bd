//! TCP connect probe.
//!
//! Measures TCP handshake latency to a target port.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::net::TcpStream;
use tokio::time::timeout;

use super::target::Target;
use super::traits::{ProbeFailure, ProbeOutcome, TcpProbe};

/// TCP prober using the system resolver and socket stack.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProber;

impl TcpProber {
    /// Create a new TCP prober.
    pub fn new() -> Self {
        Self
    }

    /// Connect within `probe_timeout`, resolving domain targets inside the bound.
    async fn connect(
        target: &Target,
        port: u16,
        probe_timeout: Duration,
    ) -> Result<TcpStream, ProbeFailure> {
        let attempt = async {
            match target.ip() {
                Some(ip) => TcpStream::connect(SocketAddr::new(ip, port)).await,
                None => TcpStream::connect((target.as_str(), port)).await,
            }
        };
        timeout(probe_timeout, attempt)
            .await
            .map_err(|_| ProbeFailure::Timeout(probe_timeout))?
            .map_err(ProbeFailure::Connect)
    }
}

/// Milliseconds rounded to two decimal places.
fn round_ms(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 100_000.0).round() / 100.0
}

#[async_trait::async_trait]
impl TcpProbe for TcpProber {
    async fn probe_tcp(&self, target: &Target, port: u16, probe_timeout: Duration) -> ProbeOutcome {
        let start = Instant::now();
        let result = Self::connect(target, port, probe_timeout).await;
        let elapsed = start.elapsed();

        match result {
            Ok(_stream) => {
                let ms = round_ms(elapsed);
                tracing::debug!(target = %target, port, latency_ms = ms, "TCP probe successful");
                ProbeOutcome::reachable(Some(ms))
            }
            Err(e @ ProbeFailure::Timeout(_)) => {
                tracing::warn!(target = %target, port, timeout_ms = probe_timeout.as_millis(), error = %e, "TCP probe timed out");
                ProbeOutcome::unreachable()
            }
            Err(e) => {
                tracing::warn!(target = %target, port, error = %e, "TCP probe failed");
                ProbeOutcome::unreachable()
            }
        }
    }
}
