// SPDX-License-Identifier: MIT

//! Drift events: the reconciler's audit trail (spec.md §3).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftKind {
    TenantUser,
    Webroot,
    Runtime,
    NginxConfig,
    DbUser,
    KvUser,
    LbMap,
    TenantUla,
    Cron,
    Daemon,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftAction {
    AutoFixed,
    Reported,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftEvent {
    pub timestamp_ms: u64,
    pub node_id: String,
    pub kind: DriftKind,
    pub resource: String,
    pub action: DriftAction,
    pub detail: String,
}

impl DriftEvent {
    pub fn new(
        timestamp_ms: u64,
        node_id: impl Into<String>,
        kind: DriftKind,
        resource: impl Into<String>,
        action: DriftAction,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            timestamp_ms,
            node_id: node_id.into(),
            kind,
            resource: resource.into(),
            action,
            detail: detail.into(),
        }
    }

    pub fn is_auto_fixed(&self) -> bool {
        matches!(self.action, DriftAction::AutoFixed)
    }
}
