// SPDX-License-Identifier: MIT

//! Health report construction (spec.md §3, §6): turns the outcome of a cycle
//! and a set of named checks into the `NodeHealth` payload posted to the
//! control plane.

use std::collections::BTreeMap;

use nodeagent_core::{CheckResult, HealthStatus, NodeHealth};

/// Derives the overall status from the circuit-breaker state and the
/// individual check results: any failing check is `unhealthy`; an open
/// breaker with all checks passing is `degraded`; otherwise `healthy`.
pub fn overall_status(breaker_open: bool, checks: &BTreeMap<String, CheckResult>) -> HealthStatus {
    if checks.values().any(|c| !c.ok) {
        HealthStatus::Unhealthy
    } else if breaker_open {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

pub fn build_health_report(
    node_id: impl Into<String>,
    now_ms: u64,
    breaker_open: bool,
    last_cycle_summary: impl Into<String>,
    checks: BTreeMap<String, CheckResult>,
) -> NodeHealth {
    let status = overall_status(breaker_open, &checks);
    NodeHealth {
        node_id: node_id.into(),
        status,
        checks,
        last_cycle_summary: last_cycle_summary.into(),
        reported_at_ms: now_ms,
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
