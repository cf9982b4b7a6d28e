// SPDX-License-Identifier: MIT

//! Role-specific convergence routines (spec.md §4.4): the reconciler
//! dispatches each cycle to exactly one of these based on the node's
//! configured [`crate::config::NodeRole`].

pub mod database;
pub mod kv;
pub mod lb;
pub mod storage;
pub mod web;

use nodeagent_core::{DriftAction, DriftEvent, DriftKind};

use crate::lock_table::LockTable;
use crate::managers::AgentManagers;

/// Shared context threaded into every role routine: the manager bundle, the
/// per-resource lock table, and the remaining auto-fix budget for this
/// cycle. Role routines never construct their own budget or breaker state —
/// both are cycle-wide and owned by [`crate::cycle::Reconciler`].
pub struct RoleContext<'a> {
    pub managers: &'a AgentManagers,
    pub locks: &'a LockTable,
    pub node_id: &'a str,
    pub now_ms: u64,
    breaker_open: bool,
    fixes_remaining: u32,
}

impl<'a> RoleContext<'a> {
    pub fn new(
        managers: &'a AgentManagers,
        locks: &'a LockTable,
        node_id: &'a str,
        now_ms: u64,
        breaker_open: bool,
        max_fixes: u32,
    ) -> Self {
        Self {
            managers,
            locks,
            node_id,
            now_ms,
            breaker_open,
            fixes_remaining: max_fixes,
        }
    }

    /// Whether a mutation may still run this cycle: the breaker must be
    /// closed and the per-cycle fix budget must not be exhausted.
    pub fn may_fix(&self) -> bool {
        !self.breaker_open && self.fixes_remaining > 0
    }

    /// Remaining auto-fix budget, for routines that must pre-size a batch
    /// mutation (e.g. orphan removal) rather than gate one resource at a
    /// time. Zero when the breaker is open.
    pub fn fixes_remaining(&self) -> u32 {
        if self.breaker_open {
            0
        } else {
            self.fixes_remaining
        }
    }

    /// Record that a mutation ran, decrementing the remaining budget.
    pub fn spend_fix(&mut self) {
        self.fixes_remaining = self.fixes_remaining.saturating_sub(1);
    }

    pub fn event(
        &self,
        kind: DriftKind,
        resource: impl Into<String>,
        action: DriftAction,
        detail: impl Into<String>,
    ) -> DriftEvent {
        DriftEvent::new(self.now_ms, self.node_id, kind, resource, action, detail)
    }

    /// An event for a resource this routine could not even inspect, or
    /// chose not to mutate because the breaker is open or the budget is
    /// spent. Always `reported`, never `auto_fixed`.
    pub fn reported(&self, kind: DriftKind, resource: impl Into<String>, detail: impl Into<String>) -> DriftEvent {
        self.event(kind, resource, DriftAction::Reported, detail)
    }

    pub fn auto_fixed(&self, kind: DriftKind, resource: impl Into<String>, detail: impl Into<String>) -> DriftEvent {
        self.event(kind, resource, DriftAction::AutoFixed, detail)
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
