// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn opens_after_three_consecutive_high_drift_cycles() {
    let mut breaker = CircuitBreaker::new();
    breaker.observe(42, 30);
    assert!(!breaker.is_open());
    breaker.observe(42, 30);
    assert!(!breaker.is_open());
    breaker.observe(42, 30);
    assert!(breaker.is_open());
    assert_eq!(breaker.gauge_value(), 1.0);
}

#[test]
fn a_low_drift_cycle_resets_the_counter_and_closes_the_breaker() {
    let mut breaker = CircuitBreaker::new();
    breaker.observe(42, 30);
    breaker.observe(42, 30);
    breaker.observe(10, 30);
    assert!(!breaker.is_open());

    breaker.observe(42, 30);
    breaker.observe(42, 30);
    assert!(!breaker.is_open(), "counter must have reset, not just paused");
}

#[test]
fn exactly_at_threshold_does_not_count_as_high_drift() {
    let mut breaker = CircuitBreaker::new();
    breaker.observe(30, 30);
    breaker.observe(30, 30);
    breaker.observe(30, 30);
    assert!(!breaker.is_open());
}

#[test]
fn once_open_stays_open_until_a_low_drift_cycle() {
    let mut breaker = CircuitBreaker::new();
    for _ in 0..3 {
        breaker.observe(42, 30);
    }
    assert!(breaker.is_open());
    breaker.observe(42, 30);
    assert!(breaker.is_open());
    breaker.observe(5, 30);
    assert!(!breaker.is_open());
}
