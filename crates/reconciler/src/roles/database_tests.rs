// SPDX-License-Identifier: MIT

use super::*;
use crate::config::{Config, NodeRole};
use crate::lock_table::LockTable;
use crate::managers::AgentManagers;
use nodeagent_svc::{build_controller, ServiceController};
use std::sync::Arc;

fn sample_config(root: &std::path::Path) -> Config {
    Config {
        node_id: "node-1".into(),
        cluster_id: "cluster-a".into(),
        shard_index: 1,
        shard_name: "db-1".into(),
        role: NodeRole::Database,
        control_plane_url: "https://control.example.internal".into(),
        api_token: "token".into(),
        tick_interval: std::time::Duration::from_secs(60),
        max_fixes: 50,
        circuit_threshold: 30,
        storage_root: root.join("storage"),
        log_root: root.join("log"),
        mount_magic: 0x4242_4242,
        http_config_root: root.join("nginx"),
        cert_root: root.join("certs"),
        php_pool_root: root.join("php"),
        unit_root: root.join("systemd"),
        supervisor_config_root: root.join("supervisor"),
        kv_config_root: root.join("kv"),
        kv_engine: "redis".into(),
        // No such binary exists in the test sandbox, so every admin call
        // fails deterministically at spawn time rather than needing a real
        // database engine.
        db_admin_bin: "nodeagent-test-nonexistent-mysql".into(),
        service_controller_kind: "direct".into(),
        storage_metadata_root: root.join("storage-meta"),
        lb_socket_path: root.join("haproxy.sock"),
        lb_map_path: root.join("backends.map"),
    }
}

fn managers(root: &std::path::Path) -> AgentManagers {
    let config = sample_config(root);
    let controller: Arc<dyn ServiceController> = Arc::from(build_controller("direct"));
    AgentManagers::new(&config, controller)
}

fn sample_database() -> DesiredDatabase {
    DesiredDatabase {
        name: "shop_db".into(),
        users: vec![],
    }
}

#[tokio::test]
async fn a_missing_admin_binary_is_reported_not_panicked() {
    let dir = tempfile::tempdir().unwrap();
    let managers = managers(dir.path());
    let locks = LockTable::new();
    let cancel = CancellationToken::new();

    let databases = vec![sample_database()];
    let mut ctx = RoleContext::new(&managers, &locks, "node-1", 1000, false, 50);
    let events = reconcile_database(&mut ctx, &databases, &cancel).await;

    assert_eq!(events.len(), 1);
    assert!(!events[0].is_auto_fixed());
    assert_eq!(events[0].kind, DriftKind::DbUser);
    assert!(events[0].detail.contains("exists check failed"));
}

#[tokio::test]
async fn an_open_breaker_never_calls_exists_or_converge() {
    let dir = tempfile::tempdir().unwrap();
    let managers = managers(dir.path());
    let locks = LockTable::new();
    let cancel = CancellationToken::new();

    let databases = vec![sample_database()];
    let mut ctx = RoleContext::new(&managers, &locks, "node-1", 1000, true, 50);
    let events = reconcile_database(&mut ctx, &databases, &cancel).await;

    // exists() itself still runs (it's a read), but since it errors in this
    // sandbox the routine reports that failure either way; the important
    // invariant is that no event is ever auto_fixed while the breaker is open.
    assert!(events.iter().all(|e| !e.is_auto_fixed()));
}
