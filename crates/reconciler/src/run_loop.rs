// SPDX-License-Identifier: MIT

//! The reconciler's `RunLoop` (spec.md §4.4): sleeps a random startup
//! jitter to de-synchronize nodes, then ticks `FullReconcile` on the
//! configured interval until cancelled.

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use nodeagent_core::Clock;

use crate::cycle::{CycleOutcome, Reconciler, MAX_STARTUP_JITTER};

pub struct RunLoop<C: Clock> {
    reconciler: Reconciler,
    clock: C,
}

impl<C: Clock> RunLoop<C> {
    pub fn new(reconciler: Reconciler, clock: C) -> Self {
        Self { reconciler, clock }
    }

    /// Runs until `cancel` fires. Each tick's `FullReconcile` runs under the
    /// same token, so an in-flight subprocess is killable on shutdown.
    pub async fn run(mut self, cancel: CancellationToken) {
        let jitter = random_jitter();
        debug!(jitter_ms = jitter.as_millis() as u64, "sleeping startup jitter");
        tokio::select! {
            _ = tokio::time::sleep(jitter) => {}
            _ = cancel.cancelled() => return,
        }

        let mut ticker = tokio::time::interval(self.reconciler.tick_interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now_ms = self.clock.epoch_ms();
                    let outcome = self.reconciler.full_reconcile(now_ms, &cancel).await;
                    log_outcome(self.reconciler.node_id(), outcome);
                }
                _ = cancel.cancelled() => {
                    info!(node_id = %self.reconciler.node_id(), "run loop cancelled");
                    break;
                }
            }
        }
    }
}

fn log_outcome(node_id: &str, outcome: CycleOutcome) {
    match outcome {
        CycleOutcome::Reconciled => debug!(node_id, "reconciliation cycle complete"),
        CycleOutcome::SkippedNoState | CycleOutcome::FetchFailed => {
            debug!(node_id, ?outcome, "reconciliation cycle produced no convergence")
        }
    }
}

fn random_jitter() -> std::time::Duration {
    let millis = rand::thread_rng().gen_range(0..=MAX_STARTUP_JITTER.as_millis() as u64);
    std::time::Duration::from_millis(millis)
}

#[cfg(test)]
#[path = "run_loop_tests.rs"]
mod tests;
