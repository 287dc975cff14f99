//! CIDR and source address helpers.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use ipnet::IpNet;
use thiserror::Error;

/// A network string that is not valid CIDR text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid CIDR address: {0}")]
pub struct InvalidCidr(pub String);

/// Parse one CIDR block.
///
/// # Errors
///
/// Returns [`InvalidCidr`] carrying the original text if it cannot be parsed.
pub fn parse_cidr(text: &str) -> Result<IpNet, InvalidCidr> {
    text.trim()
        .parse::<IpNet>()
        .map_err(|_| InvalidCidr(text.to_string()))
}

/// Parse a list of CIDR blocks, failing on the first malformed entry.
///
/// # Errors
///
/// Returns [`InvalidCidr`] for the first entry that cannot be parsed.
pub fn parse_cidrs<S: AsRef<str>>(texts: &[S]) -> Result<Vec<IpNet>, InvalidCidr> {
    texts.iter().map(|t| parse_cidr(t.as_ref())).collect()
}

/// Parse a caller address, accepting both `ip` and `ip:port` forms.
///
/// Loopback addresses normalize to `127.0.0.1` and IPv4-mapped IPv6
/// addresses to their IPv4 form, so that a policy written for
/// `127.0.0.0/8` or an IPv4 subnet still matches.
#[must_use]
pub fn parse_source_ip(text: &str) -> Option<IpAddr> {
    let text = text.trim();

    let ip = text
        .parse::<SocketAddr>()
        .map(|addr| addr.ip())
        .or_else(|_| text.parse::<IpAddr>())
        .ok()?;

    if ip.is_loopback() {
        return Some(IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    Some(match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map_or(ip, IpAddr::V4),
        IpAddr::V4(_) => ip,
    })
}

/// Whether `inner` lies entirely inside `outer`.
#[must_use]
pub fn is_subnet_of(inner: &IpNet, outer: &IpNet) -> bool {
    outer.contains(inner)
}
