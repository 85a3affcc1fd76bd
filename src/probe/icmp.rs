//! ICMP echo probe via the system `ping` utility.
//!
//! The executable is always spawned with an argument vector, never through a
//! shell, so the target string cannot inject commands.

use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tokio::process::Command;
use tokio::time::timeout;

use super::target::Target;
use super::traits::{IcmpProbe, ProbeFailure, ProbeOutcome};

/// Default ping executable, looked up on `PATH`.
pub const DEFAULT_PING_PROGRAM: &str = "ping";

fn zero_loss_regex() -> &'static Regex {
    static ZERO_LOSS: OnceLock<Regex> = OnceLock::new();
    // "0% packet loss" and "0.0% packet loss", but not "100% packet loss".
    ZERO_LOSS.get_or_init(|| {
        Regex::new(r"(?:^|[^0-9.])0(?:\.0+)?% packet loss").expect("failed to compile loss regex")
    })
}

fn rtt_summary_regex() -> &'static Regex {
    static RTT_SUMMARY: OnceLock<Regex> = OnceLock::new();
    RTT_SUMMARY.get_or_init(|| {
        Regex::new(r"=\s*([0-9.]+)/([0-9.]+)/([0-9.]+)").expect("failed to compile rtt regex")
    })
}

/// ICMP prober backed by an external `ping` executable.
#[derive(Debug, Clone)]
pub struct IcmpProber {
    program: String,
}

impl Default for IcmpProber {
    fn default() -> Self {
        Self::new(DEFAULT_PING_PROGRAM)
    }
}

impl IcmpProber {
    /// Create a prober that runs `program` (a path or a name on `PATH`).
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Executable this prober invokes.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Build `ping -n -c <count> -W <secs> <target>`.
    ///
    /// The classifier never lets a target start with `-`, so it cannot be
    /// parsed as an option.
    fn command(&self, target: &Target, count: u32, per_packet_timeout: Duration) -> Command {
        let wait_secs = per_packet_timeout.as_secs().max(1);
        let mut cmd = Command::new(&self.program);
        cmd.arg("-n")
            .arg("-c")
            .arg(count.max(1).to_string())
            .arg("-W")
            .arg(wait_secs.to_string())
            .arg(target.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Run the executable under the overall bound and return its stdout.
    async fn run(
        &self,
        target: &Target,
        count: u32,
        per_packet_timeout: Duration,
        overall_timeout: Duration,
    ) -> Result<(bool, String), ProbeFailure> {
        let mut cmd = self.command(target, count, per_packet_timeout);
        // Dropping the output future on expiry kills the child.
        let output = timeout(overall_timeout, cmd.output())
            .await
            .map_err(|_| ProbeFailure::Timeout(overall_timeout))?
            .map_err(ProbeFailure::Execution)?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        Ok((output.status.success(), stdout))
    }
}

/// Exit status and the loss summary are independent success signals.
pub fn ping_succeeded(exit_success: bool, stdout: &str) -> bool {
    exit_success || zero_loss_regex().is_match(stdout)
}

/// Extract the average RTT from a `min/avg/max` summary line.
///
/// Handles iputils (`rtt min/avg/max/mdev = a/b/c/d ms`), BSD/macOS
/// (`round-trip min/avg/max/stddev = ...`) and BusyBox
/// (`round-trip min/avg/max = a/b/c ms`).
pub fn parse_avg_latency(stdout: &str) -> Option<f64> {
    let line = stdout.lines().find(|line| line.contains("min/avg/max"))?;
    let caps = rtt_summary_regex().captures(line)?;
    caps.get(2)?.as_str().parse::<f64>().ok()
}

#[async_trait::async_trait]
impl IcmpProbe for IcmpProber {
    async fn probe_icmp(
        &self,
        target: &Target,
        count: u32,
        per_packet_timeout: Duration,
        overall_timeout: Duration,
    ) -> ProbeOutcome {
        match self
            .run(target, count, per_packet_timeout, overall_timeout)
            .await
        {
            Ok((exit_success, stdout)) if ping_succeeded(exit_success, &stdout) => {
                let latency_ms = parse_avg_latency(&stdout);
                tracing::debug!(target = %target, count, latency_ms = ?latency_ms, "ICMP probe successful");
                ProbeOutcome::reachable(latency_ms)
            }
            Ok(_) => {
                tracing::debug!(target = %target, count, "ICMP probe got no replies");
                ProbeOutcome::unreachable()
            }
            Err(e @ ProbeFailure::Timeout(_)) => {
                tracing::warn!(target = %target, timeout_ms = overall_timeout.as_millis(), error = %e, "ICMP probe timed out");
                ProbeOutcome::unreachable()
            }
            Err(e) => {
                tracing::warn!(target = %target, program = %self.program, error = %e, "ICMP probe failed");
                ProbeOutcome::unreachable()
            }
        }
    }
}
