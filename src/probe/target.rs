//! Target classification.
//!
//! A raw target string is either an IP address, a domain name, or invalid.
//! Nothing that fails this gate ever reaches a prober.

use std::fmt;
use std::net::IpAddr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Serialize, Serializer};

use super::traits::ProbeError;

/// Maximum length of a domain name, trailing dot included.
const MAX_DOMAIN_LEN: usize = 253;

fn label_regex() -> &'static Regex {
    static LABEL_REGEX: OnceLock<Regex> = OnceLock::new();
    LABEL_REGEX.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?$")
            .expect("failed to compile domain label regex")
    })
}

/// Classification of a raw target string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// Parses as an IPv4 or IPv6 address.
    IpAddress(IpAddr),
    /// Matches the domain name grammar and is not an IP address.
    DomainName,
    /// Anything else.
    Invalid,
}

/// Classify `input` exactly as given (no trimming).
pub fn classify(input: &str) -> TargetKind {
    if let Ok(ip) = input.parse::<IpAddr>() {
        return TargetKind::IpAddress(ip);
    }
    if is_domain_name(input) {
        TargetKind::DomainName
    } else {
        TargetKind::Invalid
    }
}

/// 1-253 characters of dot-separated labels, one optional trailing dot.
fn is_domain_name(input: &str) -> bool {
    if input.is_empty() || input.len() > MAX_DOMAIN_LEN {
        return false;
    }
    let name = input.strip_suffix('.').unwrap_or(input);
    let labels = label_regex();
    name.split('.').all(|label| labels.is_match(label))
}

/// A validated probe target.
///
/// Keeps the caller's exact text so responses echo what was asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    raw: String,
    ip: Option<IpAddr>,
}

impl Target {
    /// Validate a raw target string.
    ///
    /// # Errors
    /// Returns `ProbeError::InvalidTarget` if `input` classifies as invalid.
    pub fn parse(input: &str) -> Result<Self, ProbeError> {
        match classify(input) {
            TargetKind::IpAddress(ip) => Ok(Self {
                raw: input.to_string(),
                ip: Some(ip),
            }),
            TargetKind::DomainName => Ok(Self {
                raw: input.to_string(),
                ip: None,
            }),
            TargetKind::Invalid => Err(ProbeError::InvalidTarget(input.to_string())),
        }
    }

    /// The target as supplied by the caller.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parsed address for IP targets.
    pub fn ip(&self) -> Option<IpAddr> {
        self.ip
    }

    /// True for domain name targets.
    pub fn is_domain(&self) -> bool {
        self.ip.is_none()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for Target {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_ipv4() {
        for s in ["127.0.0.1", "8.8.8.8", "0.0.0.0", "255.255.255.255", "203.0.113.5"] {
            assert!(
                matches!(classify(s), TargetKind::IpAddress(IpAddr::V4(_))),
                "{s} should be an IPv4 address"
            );
        }
    }

    #[test]
    fn test_classify_ipv6() {
        for s in ["::1", "::", "2001:db8::1", "fe80::1:2:3:4", "::ffff:192.0.2.1"] {
            assert!(
                matches!(classify(s), TargetKind::IpAddress(IpAddr::V6(_))),
                "{s} should be an IPv6 address"
            );
        }
    }

    #[test]
    fn test_classify_domain() {
        for s in [
            "example.com",
            "example.com.",
            "localhost",
            "a",
            "xn--bcher-kva.example",
            "my-host.internal",
            "1.2.3",
            "123",
        ] {
            assert_eq!(classify(s), TargetKind::DomainName, "{s} should be a domain");
        }
    }

    #[test]
    fn test_ip_wins_over_domain_grammar() {
        // Also matches the label grammar, but parses as an address first.
        assert!(matches!(classify("10.0.0.1"), TargetKind::IpAddress(_)));
    }

    #[test]
    fn test_classify_invalid() {
        let too_long = "a".repeat(300);
        for s in [
            "",
            "-bad.com",
            "bad-.com",
            too_long.as_str(),
            "a..b",
            ".example.com",
            "example.com..",
            ".",
            "not a domain!",
            "exa_mple.com",
            "host;rm -rf /",
            "$(reboot)",
            " example.com",
        ] {
            assert_eq!(classify(s), TargetKind::Invalid, "{s:?} should be invalid");
        }
    }

    #[test]
    fn test_label_length_limit() {
        let ok = format!("{}.com", "a".repeat(63));
        let too_long = format!("{}.com", "a".repeat(64));
        assert_eq!(classify(&ok), TargetKind::DomainName);
        assert_eq!(classify(&too_long), TargetKind::Invalid);
    }

    #[test]
    fn test_total_length_limit() {
        // 4 labels of 61 chars + 3 dots = 247, plus ".abcde" = 253.
        let label = "a".repeat(61);
        let name = format!("{label}.{label}.{label}.{label}.abcde");
        assert_eq!(name.len(), 253);
        assert_eq!(classify(&name), TargetKind::DomainName);

        let over = format!("{name}f");
        assert_eq!(classify(&over), TargetKind::Invalid);
    }

    #[test]
    fn test_target_parse() {
        let target = Target::parse("::1").unwrap();
        assert_eq!(target.as_str(), "::1");
        assert!(target.ip().is_some());
        assert!(!target.is_domain());

        let target = Target::parse("example.com").unwrap();
        assert_eq!(target.to_string(), "example.com");
        assert!(target.is_domain());

        let err = Target::parse("a..b").unwrap_err();
        assert!(err.to_string().contains("invalid target"));
    }
}
