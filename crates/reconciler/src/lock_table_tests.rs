// SPDX-License-Identifier: MIT

use super::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

#[tokio::test]
async fn same_key_serializes() {
    let table = Arc::new(LockTable::new());
    let counter = Arc::new(AtomicU32::new(0));
    let peak = Arc::new(AtomicU32::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let table = table.clone();
        let counter = counter.clone();
        let peak = peak.clone();
        handles.push(tokio::spawn(async move {
            let _guard = table.lock("tenant", "acme", "acme").await;
            let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            counter.fetch_sub(1, Ordering::SeqCst);
        }));
    }
    for h in handles {
        h.await.unwrap();
    }
    assert_eq!(peak.load(Ordering::SeqCst), 1, "only one task should hold the lock at a time");
}

#[tokio::test]
async fn different_keys_run_concurrently() {
    let table = LockTable::new();
    let g1 = table.lock("tenant", "acme", "acme").await;
    let g2 = table.lock("tenant", "other", "other").await;
    drop(g1);
    drop(g2);
    assert_eq!(table.len(), 2);
}

#[tokio::test]
async fn reacquiring_the_same_key_reuses_the_entry() {
    let table = LockTable::new();
    drop(table.lock("webroot", "acme", "main").await);
    drop(table.lock("webroot", "acme", "main").await);
    assert_eq!(table.len(), 1, "lock table entries are keyed, not appended");
}
