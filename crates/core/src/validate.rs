// SPDX-License-Identifier: MIT

//! Input validation shared by every resource manager.
//!
//! spec.md §3: "Names used in any filesystem path, DB identifier, or KV
//! identifier must match `[A-Za-z0-9_]+`." This is the single gate every
//! manager's mutating entry point runs before touching the filesystem or a
//! subprocess.

use crate::error::AgentError;
use std::net::IpAddr;
use std::sync::OnceLock;

pub const NAME_PATTERN: &str = r"^[A-Za-z0-9_]+$";

#[allow(clippy::expect_used)]
fn name_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(NAME_PATTERN).expect("static pattern is valid"))
}

/// Validate that `name` matches the identifier invariant, returning
/// `AgentError::InvalidArgument` on failure.
pub fn validate_name(field: &str, name: &str) -> Result<(), AgentError> {
    if name.is_empty() || !name_regex().is_match(name) {
        return Err(AgentError::invalid_argument(format!(
            "{field} {name:?} must match {NAME_PATTERN}"
        )));
    }
    Ok(())
}

/// Validate that `cidr` is a well-formed IPv4 or IPv6 CIDR (`addr/prefix`).
pub fn validate_cidr(field: &str, cidr: &str) -> Result<(IpAddr, u8), AgentError> {
    let (addr_part, prefix_part) = cidr.split_once('/').ok_or_else(|| {
        AgentError::invalid_argument(format!("{field} {cidr:?} is not in addr/prefix form"))
    })?;

    let addr: IpAddr = addr_part
        .parse()
        .map_err(|_| AgentError::invalid_argument(format!("{field} {cidr:?} has invalid address")))?;

    let max_prefix = match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    };

    let prefix: u8 = prefix_part
        .parse()
        .map_err(|_| AgentError::invalid_argument(format!("{field} {cidr:?} has invalid prefix")))?;

    if prefix > max_prefix {
        return Err(AgentError::invalid_argument(format!(
            "{field} {cidr:?} prefix exceeds /{max_prefix}"
        )));
    }

    Ok((addr, prefix))
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
