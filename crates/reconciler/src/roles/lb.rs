// SPDX-License-Identifier: MIT

//! LB role routine (spec.md §4.4): syncs an HAProxy map file over its
//! runtime control socket. The map is pure metadata, so pruning an entry
//! that is no longer desired is always safe.
//!
//! No resource manager owns this (spec.md §4.2 enumerates tenant, webroot,
//! runtime, http config, database, kv, ula_nft, cron, and daemon only), so
//! the small admin-socket client lives here, grounded on
//! [`nodeagent_managers::kv`]'s `-s <socket>` CLI-admin pattern.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use nodeagent_core::{AgentResult, DesiredFqdnMapping, DriftEvent, DriftKind};
use nodeagent_sys::subprocess;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::RoleContext;

const ADMIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Talks to HAProxy's runtime API over its admin Unix socket to keep one
/// map file in sync with the desired FQDN → backend mapping.
pub struct HaproxyMapSync {
    socket_path: PathBuf,
    map_name: String,
}

impl HaproxyMapSync {
    pub fn new(socket_path: impl Into<PathBuf>, map_name: impl Into<String>) -> Self {
        Self {
            socket_path: socket_path.into(),
            map_name: map_name.into(),
        }
    }

    async fn admin_exec(&self, command: &str, cancel: &CancellationToken) -> AgentResult<String> {
        let script = format!("echo '{command}' | socat stdio UNIX-CONNECT:{}", self.socket_path.display());
        let mut cmd = Command::new("sh");
        cmd.args(["-c", &script]);
        let output = subprocess::run(cmd, ADMIN_TIMEOUT, cancel, "haproxy-admin").await?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Current map contents, keyed by FQDN. HAProxy's `show map` output is
    /// `<id> <key> <value>` per line, with `#`-prefixed header lines.
    pub async fn list(&self, cancel: &CancellationToken) -> AgentResult<HashMap<String, String>> {
        let raw = self.admin_exec(&format!("show map {}", self.map_name), cancel).await?;
        let mut entries = HashMap::new();
        for line in raw.lines() {
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace();
            let (Some(key), Some(value)) = (fields.next(), fields.next()) else {
                continue;
            };
            entries.insert(key.to_string(), value.to_string());
        }
        Ok(entries)
    }

    pub async fn set(&self, key: &str, value: &str, cancel: &CancellationToken) -> AgentResult<()> {
        self.admin_exec(&format!("del map {} {key}", self.map_name), cancel).await.ok();
        self.admin_exec(&format!("add map {} {key} {value}", self.map_name), cancel).await?;
        Ok(())
    }

    pub async fn remove(&self, key: &str, cancel: &CancellationToken) -> AgentResult<()> {
        self.admin_exec(&format!("del map {} {key}", self.map_name), cancel).await?;
        Ok(())
    }
}

pub async fn reconcile_lb(
    ctx: &mut RoleContext<'_>,
    fqdn_mappings: &[DesiredFqdnMapping],
    sync: &HaproxyMapSync,
    cancel: &CancellationToken,
) -> Vec<DriftEvent> {
    let mut events = Vec::new();
    let _guard = ctx.locks.lock("lb", "lb", "backends").await;

    if !ctx.may_fix() {
        for mapping in fqdn_mappings {
            events.push(ctx.reported(DriftKind::LbMap, mapping.fqdn.as_str(), "lb map entry not synced: breaker open or budget exhausted"));
        }
        return events;
    }

    let current = match sync.list(cancel).await {
        Ok(map) => map,
        Err(e) => {
            events.push(ctx.reported(DriftKind::LbMap, "backends", format!("listing map failed: {e}")));
            return events;
        }
    };

    let desired: HashMap<&str, &str> = fqdn_mappings.iter().map(|m| (m.fqdn.as_str(), m.backend.as_str())).collect();

    for mapping in fqdn_mappings {
        if !ctx.may_fix() {
            events.push(ctx.reported(DriftKind::LbMap, mapping.fqdn.as_str(), "lb map entry not synced: budget exhausted"));
            continue;
        }
        if current.get(mapping.fqdn.as_str()).map(String::as_str) == Some(mapping.backend.as_str()) {
            continue;
        }
        match sync.set(&mapping.fqdn, &mapping.backend, cancel).await {
            Ok(()) => {
                events.push(ctx.auto_fixed(DriftKind::LbMap, mapping.fqdn.as_str(), "synced backend mapping"));
                ctx.spend_fix();
            }
            Err(e) => events.push(ctx.reported(DriftKind::LbMap, mapping.fqdn.as_str(), format!("sync failed: {e}"))),
        }
    }

    for fqdn in current.keys() {
        if desired.contains_key(fqdn.as_str()) {
            continue;
        }
        if !ctx.may_fix() {
            events.push(ctx.reported(DriftKind::LbMap, fqdn.as_str(), "stale lb map entry not pruned: budget exhausted"));
            continue;
        }
        match sync.remove(fqdn, cancel).await {
            Ok(()) => {
                events.push(ctx.auto_fixed(DriftKind::LbMap, fqdn.as_str(), "pruned stale backend mapping"));
                ctx.spend_fix();
            }
            Err(e) => events.push(ctx.reported(DriftKind::LbMap, fqdn.as_str(), format!("prune failed: {e}"))),
        }
    }

    events
}

#[cfg(test)]
#[path = "lb_tests.rs"]
mod tests;
