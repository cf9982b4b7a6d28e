// SPDX-License-Identifier: MIT

//! Circuit breaker (spec.md §3, §4.4, §8): suspends auto-fixes once drift
//! has stayed above a threshold for three consecutive cycles, and closes
//! again on the first cycle back under threshold.

/// Consecutive high-drift cycles required to open the breaker.
const OPEN_AFTER_CONSECUTIVE_CYCLES: u32 = 3;

#[derive(Debug, Default)]
pub struct CircuitBreaker {
    consecutive_high_drift: u32,
    open: bool,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether role routines should currently suppress mutations.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Gauge value per spec.md §6: 1 while open, 0 while closed.
    pub fn gauge_value(&self) -> f64 {
        if self.open {
            1.0
        } else {
            0.0
        }
    }

    /// Record this cycle's drift-event count against `threshold`. A count
    /// above threshold increments the consecutive-cycle counter and opens
    /// the breaker on the third consecutive hit; a count at or below
    /// threshold resets the counter and closes the breaker.
    pub fn observe(&mut self, event_count: usize, threshold: usize) {
        if event_count > threshold {
            self.consecutive_high_drift += 1;
            if self.consecutive_high_drift >= OPEN_AFTER_CONSECUTIVE_CYCLES {
                self.open = true;
            }
        } else {
            self.consecutive_high_drift = 0;
            self.open = false;
        }
    }
}

#[cfg(test)]
#[path = "breaker_tests.rs"]
mod tests;
