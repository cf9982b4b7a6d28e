// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! nodeagent-core: domain types, validation, and the error taxonomy shared
//! by every other crate in the workspace.

pub mod clock;
pub mod desired;
pub mod drift;
pub mod error;
pub mod hashing;
pub mod health;
pub mod validate;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use desired::{
    DesiredDatabase, DesiredFqdnMapping, DesiredKvInstance, DesiredKvUser, DesiredS3Bucket,
    DesiredState, DesiredTenant, DesiredUser, DesiredWebroot, RuntimeKind,
};
pub use drift::{DriftAction, DriftEvent, DriftKind};
pub use error::{AgentError, AgentResult};
pub use health::{CheckResult, HealthStatus, NodeHealth};
pub use validate::{validate_cidr, validate_name, NAME_PATTERN};
