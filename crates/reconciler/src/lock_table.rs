// SPDX-License-Identifier: MIT

//! Per-resource lock table (spec.md §4.4, §5): a flat keyed map from
//! `(kind, tenant, resource)` to a mutex, so the reconciler and imperative
//! RPC handlers never mutate the same resource concurrently.
//!
//! Entries are never removed; creating a lock on first use is cheaper than
//! tracking its lifecycle, and key cardinality is bounded by the resource
//! count (spec.md §4.4 "locking discipline").

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Key = (String, String, String);

/// A concurrent map of `(kind, tenant, resource)` to a per-key async mutex.
#[derive(Default)]
pub struct LockTable {
    locks: DashMap<Key, Arc<Mutex<()>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `(kind, tenant, resource)`, creating it on
    /// first use. Held across the guard's lifetime; release by dropping it.
    pub async fn lock(&self, kind: &str, tenant: &str, resource: &str) -> OwnedMutexGuard<()> {
        let key = (kind.to_string(), tenant.to_string(), resource.to_string());
        let entry = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        entry.lock_owned().await
    }

    /// Number of distinct keys ever locked, exposed for tests and
    /// diagnostics only.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
#[path = "lock_table_tests.rs"]
mod tests;
