// SPDX-License-Identifier: MIT

//! The shared-filesystem mount guard (spec.md §4.2.1, §8).
//!
//! Every Tenant Manager mutation must first confirm the storage root is
//! actually the clustered filesystem and not an empty local directory that
//! would silently diverge from the rest of the cluster.

use nix::sys::statfs::statfs;
use nodeagent_core::{AgentError, AgentResult};
use std::path::Path;

/// Verify that `path` is mounted with filesystem magic number
/// `expected_magic` (as returned by `statfs(2)`'s `f_type`).
pub fn check_mount(path: &Path, expected_magic: i64) -> AgentResult<()> {
    let stat = statfs(path).map_err(|errno| {
        AgentError::unavailable(format!("{} is not accessible: {errno}", path.display()))
    })?;

    let actual = stat.filesystem_type().0;
    if actual != expected_magic {
        return Err(AgentError::unavailable(format!(
            "{} has filesystem magic {:#x}, expected {:#x}",
            path.display(),
            actual,
            expected_magic
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "mount_tests.rs"]
mod tests;
