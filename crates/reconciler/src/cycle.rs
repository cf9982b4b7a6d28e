// SPDX-License-Identifier: MIT

//! The reconciler cycle (spec.md §4.4 `FullReconcile`): fetches desired
//! state, dispatches to the node's role routine under the per-resource lock
//! table, records metrics, updates the circuit breaker, and reports drift
//! events and health back to the control plane.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use nodeagent_control_client::ControlClient;
use nodeagent_core::{CheckResult, DesiredState, DriftAction, DriftEvent, DriftKind};
use nodeagent_svc::ServiceController;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::breaker::CircuitBreaker;
use crate::config::{Config, NodeRole};
use crate::health;
use crate::lock_table::LockTable;
use crate::managers::AgentManagers;
use crate::metrics::ReconcilerMetrics;
use crate::roles::lb::HaproxyMapSync;
use crate::roles::{database, kv, lb, storage, web};
use crate::roles::RoleContext;

/// What happened to a single `FullReconcile` call, for the caller (the run
/// loop, or a test) to log or assert on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Desired state was fetched (or reused from the ETag cache) and the
    /// role routine ran to completion.
    Reconciled,
    /// No desired state was fetched (304 with nothing cached yet) — the
    /// cycle produced no drift events and ran no role routine.
    SkippedNoState,
    /// The desired-state fetch itself failed; the cycle aborts before
    /// running any role routine.
    FetchFailed,
}

impl CycleOutcome {
    fn label(self) -> &'static str {
        match self {
            CycleOutcome::Reconciled => "reconciled",
            CycleOutcome::SkippedNoState => "skipped_no_state",
            CycleOutcome::FetchFailed => "fetch_failed",
        }
    }
}

fn drift_kind_label(kind: DriftKind) -> &'static str {
    match kind {
        DriftKind::TenantUser => "tenant_user",
        DriftKind::Webroot => "webroot",
        DriftKind::Runtime => "runtime",
        DriftKind::NginxConfig => "nginx_config",
        DriftKind::DbUser => "db_user",
        DriftKind::KvUser => "kv_user",
        DriftKind::LbMap => "lb_map",
        DriftKind::TenantUla => "tenant_ula",
        DriftKind::Cron => "cron",
        DriftKind::Daemon => "daemon",
        DriftKind::Storage => "storage",
    }
}

fn drift_action_label(action: DriftAction) -> &'static str {
    match action {
        DriftAction::AutoFixed => "auto_fixed",
        DriftAction::Reported => "reported",
        DriftAction::Skipped => "skipped",
    }
}

/// Owns every piece of cycle-wide state: configuration, the manager bundle,
/// the lock table, the circuit breaker, the metrics registry, and the
/// control-plane client. Built once at startup; [`Reconciler::full_reconcile`]
/// is called once per tick by the run loop.
pub struct Reconciler {
    config: Config,
    managers: AgentManagers,
    client: ControlClient,
    locks: LockTable,
    breaker: CircuitBreaker,
    metrics: ReconcilerMetrics,
    lb_sync: HaproxyMapSync,
    cached_state: Option<DesiredState>,
}

impl Reconciler {
    pub fn new(config: Config, controller: Arc<dyn ServiceController>) -> Self {
        let managers = AgentManagers::new(&config, controller);
        let client = ControlClient::new(config.control_plane_url.clone(), config.api_token.clone());
        let lb_sync = HaproxyMapSync::new(config.lb_socket_path.clone(), config.lb_map_path.to_string_lossy().into_owned());

        Self {
            config,
            managers,
            client,
            locks: LockTable::new(),
            breaker: CircuitBreaker::new(),
            metrics: ReconcilerMetrics::new(),
            lb_sync,
            cached_state: None,
        }
    }

    pub fn metrics(&self) -> &ReconcilerMetrics {
        &self.metrics
    }

    pub fn node_id(&self) -> &str {
        &self.config.node_id
    }

    pub fn tick_interval(&self) -> Duration {
        self.config.tick_interval
    }

    /// Runs one full reconciliation cycle (spec.md §4.4). `now_ms` is
    /// supplied by the caller so this stays deterministic under test.
    pub async fn full_reconcile(&mut self, now_ms: u64, cancel: &CancellationToken) -> CycleOutcome {
        let started = Instant::now();

        let (fetched, fetch_error) = self.client.get_desired_state(&self.config.node_id).await;
        if let Some(state) = fetched {
            self.cached_state = Some(state);
        }

        let Some(state) = self.cached_state.clone() else {
            let outcome = if let Some(e) = fetch_error {
                warn!(node_id = %self.config.node_id, error = %e, "desired-state fetch failed; aborting cycle");
                CycleOutcome::FetchFailed
            } else {
                warn!(node_id = %self.config.node_id, "no desired state known yet; skipping cycle");
                CycleOutcome::SkippedNoState
            };
            self.metrics.observe_cycle(started.elapsed(), outcome.label());
            self.report_health(now_ms, outcome, &[]).await;
            return outcome;
        };

        if let Some(e) = fetch_error {
            // A 304 surfaces as `(None, None)`, never as `(None, Some(_))`
            // alongside a cached state, but a transport hiccup after the
            // cache was already warm should not silently look identical to
            // a clean 304. Report it and continue with the cached state.
            warn!(node_id = %self.config.node_id, error = %e, "desired-state fetch failed; reusing cached state");
        }

        let events = self.dispatch(&state, now_ms, cancel).await;

        self.metrics.observe_cycle(started.elapsed(), CycleOutcome::Reconciled.label());
        for event in &events {
            self.metrics.observe_drift(drift_kind_label(event.kind), drift_action_label(event.action));
        }

        self.breaker.observe(events.len(), self.config.circuit_threshold);
        self.metrics.set_circuit_breaker(self.breaker.is_open());

        if let Err(e) = self.client.report_drift_events(&self.config.node_id, events.clone()).await {
            warn!(node_id = %self.config.node_id, error = %e, "failed to report drift events");
        }

        self.report_health(now_ms, CycleOutcome::Reconciled, &events).await;

        CycleOutcome::Reconciled
    }

    async fn dispatch(&self, state: &DesiredState, now_ms: u64, cancel: &CancellationToken) -> Vec<DriftEvent> {
        let mut ctx = RoleContext::new(&self.managers, &self.locks, &self.config.node_id, now_ms, self.breaker.is_open(), self.config.max_fixes);

        match self.config.role {
            NodeRole::Web => web::reconcile_web(&mut ctx, &state.tenants, cancel).await,
            NodeRole::Database => database::reconcile_database(&mut ctx, &state.databases, cancel).await,
            NodeRole::Kv => kv::reconcile_kv(&mut ctx, &state.kv_instances, cancel).await,
            NodeRole::Lb => lb::reconcile_lb(&mut ctx, &state.fqdn_mappings, &self.lb_sync, cancel).await,
            NodeRole::Storage => storage::reconcile_storage(&ctx, &state.s3_buckets, &self.config.storage_metadata_root).await,
        }
    }

    async fn report_health(&self, now_ms: u64, outcome: CycleOutcome, events: &[DriftEvent]) {
        let mut checks = BTreeMap::new();
        checks.insert(
            "desired_state".into(),
            CheckResult {
                ok: !matches!(outcome, CycleOutcome::FetchFailed),
                detail: outcome.label().into(),
            },
        );

        let summary = format!("role={} outcome={} events={}", self.config.role.label(), outcome.label(), events.len());
        let report = health::build_health_report(self.config.node_id.as_str(), now_ms, self.breaker.is_open(), summary, checks);
        self.metrics.set_health_status(report.status.gauge_value());

        match self.client.report_health(&self.config.node_id, &report).await {
            Ok(()) => self.metrics.observe_health_report("ok"),
            Err(e) => {
                warn!(node_id = %self.config.node_id, error = %e, "failed to report health");
                self.metrics.observe_health_report("error");
            }
        }
    }
}

/// Duration helper shared with the run loop's jitter calculation.
pub const MAX_STARTUP_JITTER: Duration = Duration::from_secs(30);

#[cfg(test)]
#[path = "cycle_tests.rs"]
mod tests;
