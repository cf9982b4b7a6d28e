// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! nodeagent-reconciler: the periodic driver (spec.md §4.4) that fetches
//! desired state, dispatches to a role-specific convergence routine under
//! a per-resource lock, caps auto-fixes per cycle, tracks a circuit
//! breaker, and reports drift and health to the control plane. Also hosts
//! the `nodeagentd` binary's configuration loading and startup.

pub mod breaker;
pub mod config;
pub mod cycle;
pub mod health;
pub mod lock_table;
pub mod managers;
pub mod metrics;
pub mod roles;
pub mod run_loop;

pub use breaker::CircuitBreaker;
pub use config::{Config, ConfigError, NodeRole};
pub use cycle::Reconciler;
pub use lock_table::LockTable;
pub use managers::AgentManagers;
pub use metrics::ReconcilerMetrics;
pub use run_loop::RunLoop;
