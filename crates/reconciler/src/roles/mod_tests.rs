// SPDX-License-Identifier: MIT

use super::*;
use crate::config::{Config, NodeRole};
use nodeagent_svc::{build_controller, ServiceController};
use std::sync::Arc;

fn sample_config(root: &std::path::Path) -> Config {
    Config {
        node_id: "node-1".into(),
        cluster_id: "cluster-a".into(),
        shard_index: 1,
        shard_name: "web-1".into(),
        role: NodeRole::Web,
        control_plane_url: "https://control.example.internal".into(),
        api_token: "token".into(),
        tick_interval: std::time::Duration::from_secs(60),
        max_fixes: 2,
        circuit_threshold: 30,
        storage_root: root.join("storage"),
        log_root: root.join("log"),
        mount_magic: 61267,
        http_config_root: root.join("nginx"),
        cert_root: root.join("certs"),
        php_pool_root: root.join("php"),
        unit_root: root.join("systemd"),
        supervisor_config_root: root.join("supervisor"),
        kv_config_root: root.join("kv"),
        kv_engine: "redis".into(),
        db_admin_bin: "mysql".into(),
        service_controller_kind: "direct".into(),
        storage_metadata_root: root.join("storage-meta"),
        lb_socket_path: root.join("haproxy.sock"),
        lb_map_path: root.join("backends.map"),
    }
}

#[test]
fn may_fix_is_false_once_the_breaker_is_open() {
    let dir = tempfile::tempdir().unwrap();
    let config = sample_config(dir.path());
    let controller: Arc<dyn ServiceController> = Arc::from(build_controller("direct"));
    let managers = AgentManagers::new(&config, controller);
    let locks = LockTable::new();

    let ctx = RoleContext::new(&managers, &locks, "node-1", 0, true, 5);
    assert!(!ctx.may_fix());
}

#[test]
fn may_fix_is_false_once_the_budget_is_exhausted() {
    let dir = tempfile::tempdir().unwrap();
    let config = sample_config(dir.path());
    let controller: Arc<dyn ServiceController> = Arc::from(build_controller("direct"));
    let managers = AgentManagers::new(&config, controller);
    let locks = LockTable::new();

    let mut ctx = RoleContext::new(&managers, &locks, "node-1", 0, false, 1);
    assert!(ctx.may_fix());
    ctx.spend_fix();
    assert!(!ctx.may_fix());
}

#[test]
fn fixes_remaining_is_zero_while_the_breaker_is_open_even_with_budget_left() {
    let dir = tempfile::tempdir().unwrap();
    let config = sample_config(dir.path());
    let controller: Arc<dyn ServiceController> = Arc::from(build_controller("direct"));
    let managers = AgentManagers::new(&config, controller);
    let locks = LockTable::new();

    let ctx = RoleContext::new(&managers, &locks, "node-1", 0, true, 5);
    assert_eq!(ctx.fixes_remaining(), 0);

    let ctx = RoleContext::new(&managers, &locks, "node-1", 0, false, 5);
    assert_eq!(ctx.fixes_remaining(), 5);
}

#[test]
fn auto_fixed_and_reported_events_carry_the_expected_action() {
    let dir = tempfile::tempdir().unwrap();
    let config = sample_config(dir.path());
    let controller: Arc<dyn ServiceController> = Arc::from(build_controller("direct"));
    let managers = AgentManagers::new(&config, controller);
    let locks = LockTable::new();

    let ctx = RoleContext::new(&managers, &locks, "node-1", 1234, false, 5);
    let fixed = ctx.auto_fixed(DriftKind::TenantUser, "acme", "created");
    let reported = ctx.reported(DriftKind::TenantUser, "acme", "skipped");
    assert!(fixed.is_auto_fixed());
    assert!(!reported.is_auto_fixed());
    assert_eq!(fixed.timestamp_ms, 1234);
    assert_eq!(fixed.node_id, "node-1");
}
