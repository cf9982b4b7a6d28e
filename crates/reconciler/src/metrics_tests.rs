// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn counters_start_at_zero() {
    let metrics = ReconcilerMetrics::new();
    assert_eq!(metrics.cycle_result.with_label_values(&["ok"]).get(), 0);
    assert_eq!(metrics.drift_detected.with_label_values(&["webroot", "reported"]).get(), 0);
}

#[test]
fn observe_cycle_increments_the_labelled_counter_and_records_duration() {
    let metrics = ReconcilerMetrics::new();
    metrics.observe_cycle(std::time::Duration::from_millis(250), "ok");
    metrics.observe_cycle(std::time::Duration::from_millis(10), "error");
    assert_eq!(metrics.cycle_result.with_label_values(&["ok"]).get(), 1);
    assert_eq!(metrics.cycle_result.with_label_values(&["error"]).get(), 1);
    assert_eq!(metrics.cycle_duration.get_sample_count(), 2);
}

#[test]
fn observe_drift_only_increments_fixed_counter_for_auto_fixed() {
    let metrics = ReconcilerMetrics::new();
    metrics.observe_drift("tenant_user", "auto_fixed");
    metrics.observe_drift("tenant_user", "reported");
    assert_eq!(metrics.drift_detected.with_label_values(&["tenant_user", "auto_fixed"]).get(), 1);
    assert_eq!(metrics.drift_detected.with_label_values(&["tenant_user", "reported"]).get(), 1);
    assert_eq!(metrics.drift_fixed.with_label_values(&["tenant_user"]).get(), 1);
}

#[test]
fn gauges_reflect_the_last_value_set() {
    let metrics = ReconcilerMetrics::new();
    metrics.set_circuit_breaker(true);
    assert_eq!(metrics.circuit_breaker.get(), 1.0);
    metrics.set_circuit_breaker(false);
    assert_eq!(metrics.circuit_breaker.get(), 0.0);

    metrics.set_health_status(0.5);
    assert_eq!(metrics.health_status.get(), 0.5);
}

#[test]
fn all_metrics_are_registered() {
    let metrics = ReconcilerMetrics::new();
    let families = metrics.registry.gather();
    assert_eq!(families.len(), 7);
}
