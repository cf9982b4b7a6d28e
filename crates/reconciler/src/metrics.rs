// SPDX-License-Identifier: MIT

//! In-process metrics registry (spec.md §6): cycle duration, cycle-result
//! counters, drift counters, and the circuit-breaker/health gauges. Nothing
//! in this crate starts an HTTP exposition server — that is out of scope
//! (spec.md §1); the registry exists so an embedding binary can scrape it.

use prometheus::{Histogram, HistogramOpts, IntCounterVec, Opts, Registry};

pub struct ReconcilerMetrics {
    pub registry: Registry,
    pub cycle_duration: Histogram,
    pub cycle_result: IntCounterVec,
    pub drift_detected: IntCounterVec,
    pub drift_fixed: IntCounterVec,
    pub circuit_breaker: prometheus::Gauge,
    pub health_status: prometheus::Gauge,
    pub health_report: IntCounterVec,
}

impl ReconcilerMetrics {
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        let registry = Registry::new();

        let cycle_duration = Histogram::with_opts(HistogramOpts::new(
            "nodeagent_cycle_duration_seconds",
            "Duration of a full reconciliation cycle",
        ))
        .expect("valid histogram opts");

        let cycle_result = IntCounterVec::new(
            Opts::new("nodeagent_cycle_result_total", "Reconciliation cycles by outcome"),
            &["outcome"],
        )
        .expect("valid counter opts");

        let drift_detected = IntCounterVec::new(
            Opts::new("nodeagent_drift_detected_total", "Drift events observed by kind and action"),
            &["kind", "action"],
        )
        .expect("valid counter opts");

        let drift_fixed = IntCounterVec::new(
            Opts::new("nodeagent_drift_fixed_total", "Drift events auto-fixed by kind"),
            &["kind"],
        )
        .expect("valid counter opts");

        let circuit_breaker = prometheus::Gauge::new(
            "nodeagent_circuit_breaker_open",
            "1 when the reconciler's circuit breaker is open, 0 otherwise",
        )
        .expect("valid gauge opts");

        let health_status = prometheus::Gauge::new(
            "nodeagent_health_status",
            "Node health: 1 healthy, 0.5 degraded, 0 unhealthy",
        )
        .expect("valid gauge opts");

        let health_report = IntCounterVec::new(
            Opts::new("nodeagent_health_report_total", "Health reports posted by result"),
            &["result"],
        )
        .expect("valid counter opts");

        registry.register(Box::new(cycle_duration.clone())).expect("register cycle_duration");
        registry.register(Box::new(cycle_result.clone())).expect("register cycle_result");
        registry.register(Box::new(drift_detected.clone())).expect("register drift_detected");
        registry.register(Box::new(drift_fixed.clone())).expect("register drift_fixed");
        registry.register(Box::new(circuit_breaker.clone())).expect("register circuit_breaker");
        registry.register(Box::new(health_status.clone())).expect("register health_status");
        registry.register(Box::new(health_report.clone())).expect("register health_report");

        Self {
            registry,
            cycle_duration,
            cycle_result,
            drift_detected,
            drift_fixed,
            circuit_breaker,
            health_status,
            health_report,
        }
    }

    pub fn observe_cycle(&self, duration: std::time::Duration, outcome: &str) {
        self.cycle_duration.observe(duration.as_secs_f64());
        self.cycle_result.with_label_values(&[outcome]).inc();
    }

    pub fn observe_drift(&self, kind: &str, action: &str) {
        self.drift_detected.with_label_values(&[kind, action]).inc();
        if action == "auto_fixed" {
            self.drift_fixed.with_label_values(&[kind]).inc();
        }
    }

    pub fn set_circuit_breaker(&self, open: bool) {
        self.circuit_breaker.set(if open { 1.0 } else { 0.0 });
    }

    pub fn set_health_status(&self, gauge_value: f64) {
        self.health_status.set(gauge_value);
    }

    pub fn observe_health_report(&self, result: &str) {
        self.health_report.with_label_values(&[result]).inc();
    }
}

impl Default for ReconcilerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
