//! Subject and source network matching.

use std::collections::HashSet;

use warrant_permissions::network::{parse_cidr, parse_source_ip};

use crate::error::{PolicyError, PolicyResult};

/// Whether at least one AND-group of `subject` is fully contained in `claims`.
///
/// Blank tags inside a group are ignored. A group with no non-blank tag
/// never matches, so an empty subject matches nobody.
#[must_use]
pub fn subject_matches(subject: &[Vec<String>], claims: &HashSet<&str>) -> bool {
    subject.iter().any(|group| {
        let mut tags = group.iter().map(|t| t.trim()).filter(|t| !t.is_empty()).peekable();
        tags.peek().is_some() && tags.all(|tag| claims.contains(tag))
    })
}

/// Whether the caller address falls inside one of `subnets`.
///
/// # Errors
///
/// Returns [`PolicyError::InvalidSourceIp`] when the address is missing or
/// malformed, and [`PolicyError::InvalidCidr`] when a subnet is malformed.
/// The address is checked first.
pub fn source_ip_allowed<S: AsRef<str>>(source_ip: &str, subnets: &[S]) -> PolicyResult<bool> {
    let ip = parse_source_ip(source_ip)
        .ok_or_else(|| PolicyError::InvalidSourceIp(source_ip.to_string()))?;

    for subnet in subnets {
        if parse_cidr(subnet.as_ref())?.contains(&ip) {
            return Ok(true);
        }
    }

    Ok(false)
}
