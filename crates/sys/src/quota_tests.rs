// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn best_effort_never_panics_on_unsupported_fs() {
    let dir = tempfile::tempdir().unwrap();
    // Whether or not the underlying filesystem supports xattrs, this must
    // never panic or propagate an error to the caller.
    set_quota_xattr_best_effort(dir.path(), 10 * 1024 * 1024 * 1024);
}
