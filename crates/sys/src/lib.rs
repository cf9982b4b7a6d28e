// SPDX-License-Identifier: MIT

//! nodeagent-sys: the single chokepoint for subprocess invocation, mount
//! checking, and extended-attribute access. Every manager and the service
//! controller route their OS interaction through here so that subprocess
//! failure handling (captured output, timeout, cancellation) is consistent
//! workspace-wide.

pub mod mount;
pub mod quota;
pub mod subprocess;

pub use mount::check_mount;
pub use quota::set_quota_xattr;
pub use subprocess::{run, run_with_retry, signal_by_name};
