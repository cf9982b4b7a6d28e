// SPDX-License-Identifier: MIT

//! Disk-quota extended attribute (spec.md §4.2.1: "If a disk quota is
//! configured, set an extended attribute naming the byte cap; quota-set
//! failure is logged but not fatal.").

use std::path::Path;
use tracing::warn;

const QUOTA_XATTR: &str = "user.nodeagent.quota_bytes";

/// Set the quota-cap extended attribute on `path`. Returns an error for the
/// caller to log; callers must not treat this as fatal per spec.md §4.2.1.
pub fn set_quota_xattr(path: &Path, bytes: u64) -> std::io::Result<()> {
    xattr::set(path, QUOTA_XATTR, bytes.to_string().as_bytes())
}

/// Best-effort variant that swallows the error after logging, matching the
/// "not fatal" policy directly so managers don't need to repeat the
/// warn-and-continue boilerplate.
pub fn set_quota_xattr_best_effort(path: &Path, bytes: u64) {
    if let Err(e) = set_quota_xattr(path, bytes) {
        warn!(path = %path.display(), error = %e, "failed to set disk quota xattr");
    }
}

#[cfg(test)]
#[path = "quota_tests.rs"]
mod tests;
