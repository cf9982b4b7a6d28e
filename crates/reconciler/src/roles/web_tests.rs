// SPDX-License-Identifier: MIT

use super::*;
use crate::config::{Config, NodeRole};
use crate::lock_table::LockTable;
use crate::managers::AgentManagers;
use nodeagent_core::test_support::{tenant_fixture, webroot_fixture};
use nodeagent_core::RuntimeKind;
use nodeagent_svc::{build_controller, ServiceController};
use std::sync::Arc;

fn current_uid() -> u32 {
    nix::unistd::getuid().as_raw()
}

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
        max_fixes: 50,
        circuit_threshold: 30,
        storage_root: root.join("storage"),
        log_root: root.join("log"),
        // A magic number no real filesystem reports, so any tenant-account
        // creation attempt fails with `unavailable` rather than trying
        // `useradd` for real.
        mount_magic: 0x4242_4242,
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

fn managers(root: &std::path::Path) -> AgentManagers {
    let config = sample_config(root);
    let controller: Arc<dyn ServiceController> = Arc::from(build_controller("direct"));
    AgentManagers::new(&config, controller)
}

#[tokio::test]
async fn missing_webroot_and_http_config_are_created_and_reported_as_auto_fixed() {
    let dir = tempfile::tempdir().unwrap();
    let managers = managers(dir.path());
    let locks = LockTable::new();
    let cancel = CancellationToken::new();

    let mut tenant = tenant_fixture("acme", current_uid());
    let mut webroot = webroot_fixture("shop", RuntimeKind::Static);
    webroot.fqdns = vec!["shop.example.com".to_string()];
    tenant.webroots = vec![webroot];

    let mut ctx = RoleContext::new(&managers, &locks, "node-1", 1000, false, 50);
    let events = super::reconcile_web(&mut ctx, std::slice::from_ref(&tenant), &cancel).await;

    assert!(managers.webroot.exists("acme", "shop"));
    assert!(managers.http_config.exists("acme", "shop"));

    let webroot_event = events.iter().find(|e| e.kind == DriftKind::Webroot).expect("webroot event");
    assert!(webroot_event.is_auto_fixed());
    let nginx_event = events.iter().find(|e| e.kind == DriftKind::NginxConfig && e.resource.contains("acme/shop"));
    assert!(nginx_event.unwrap().is_auto_fixed());

    // the tenant account itself can't be created in this sandbox (no real
    // useradd), so that event is reported rather than fixed.
    let tenant_event = events.iter().find(|e| e.kind == DriftKind::TenantUser).expect("tenant event");
    assert!(!tenant_event.is_auto_fixed());
}

#[tokio::test]
async fn an_open_breaker_performs_no_mutation_and_only_reports() {
    let dir = tempfile::tempdir().unwrap();
    let managers = managers(dir.path());
    let locks = LockTable::new();
    let cancel = CancellationToken::new();

    let mut tenant = tenant_fixture("acme", current_uid());
    tenant.webroots = vec![webroot_fixture("shop", RuntimeKind::Static)];

    let mut ctx = RoleContext::new(&managers, &locks, "node-1", 1000, true, 50);
    let events = super::reconcile_web(&mut ctx, std::slice::from_ref(&tenant), &cancel).await;

    assert!(!managers.webroot.exists("acme", "shop"));
    assert!(events.iter().all(|e| !e.is_auto_fixed()));
}

#[tokio::test]
async fn orphaned_http_configs_are_removed_when_no_longer_expected() {
    let dir = tempfile::tempdir().unwrap();
    let managers = managers(dir.path());
    let locks = LockTable::new();
    let cancel = CancellationToken::new();

    let stale = webroot_fixture("old-site", RuntimeKind::Static);
    managers.http_config.create("acme", &stale).await.unwrap();
    assert!(managers.http_config.exists("acme", "old-site"));

    let tenant = tenant_fixture("acme", current_uid());
    let mut ctx = RoleContext::new(&managers, &locks, "node-1", 1000, false, 50);
    let events = super::reconcile_web(&mut ctx, std::slice::from_ref(&tenant), &cancel).await;

    assert!(!managers.http_config.exists("acme", "old-site"));
    assert!(events.iter().any(|e| e.kind == DriftKind::NginxConfig && e.detail.contains("orphaned")));
}

#[tokio::test]
async fn orphan_removal_never_exceeds_the_cycle_fix_budget() {
    let dir = tempfile::tempdir().unwrap();
    let managers = managers(dir.path());
    let locks = LockTable::new();
    let cancel = CancellationToken::new();

    for name in ["old-a", "old-b", "old-c", "old-d", "old-e"] {
        let stale = webroot_fixture(name, RuntimeKind::Static);
        managers.http_config.create("acme", &stale).await.unwrap();
    }

    let tenant = tenant_fixture("acme", current_uid());
    // max_fixes = 1 and no other drift in this tenant, so the orphan sweep
    // alone must not exceed the budget even though 5 orphans exist.
    let mut ctx = RoleContext::new(&managers, &locks, "node-1", 1000, false, 1);
    let events = super::reconcile_web(&mut ctx, std::slice::from_ref(&tenant), &cancel).await;

    let auto_fixed = events.iter().filter(|e| e.is_auto_fixed()).count();
    assert_eq!(auto_fixed, 1);
    let reported_orphans = events
        .iter()
        .filter(|e| e.kind == DriftKind::NginxConfig && !e.is_auto_fixed() && e.detail.contains("budget exhausted"))
        .count();
    assert_eq!(reported_orphans, 4);
}
