// SPDX-License-Identifier: MIT

//! Resource managers (spec.md §4.2): the uniform "converge" layer that turns
//! desired-state records into on-disk state, init-system units, and
//! database/KV/packet-filter mutations.
//!
//! Every manager validates names with [`nodeagent_core::validate`] before any
//! mutating call, and every fallible operation returns [`nodeagent_core::AgentError`]
//! coded `invalid_argument` / `unavailable` / `internal` per spec.md §7.

pub mod cron;
pub mod daemon;
pub mod database;
pub mod http_config;
pub mod kv;
pub mod runtime;
pub mod tenant;
pub mod ula_nft;
pub mod webroot;

pub use cron::CronManager;
pub use daemon::DaemonManager;
pub use database::DatabaseManager;
pub use http_config::HttpConfigManager;
pub use kv::KvManager;
pub use runtime::{RuntimeManager, RuntimeManagerSet};
pub use tenant::TenantManager;
pub use ula_nft::UlaNftManager;
pub use webroot::WebrootManager;
