// SPDX-License-Identifier: MIT

use super::*;
use crate::config::NodeRole;
use nodeagent_svc::{build_controller, ServiceController};

/// No listener is bound on this port in the test sandbox, so every
/// control-plane call fails fast and deterministically (matches the
/// convention used by `nodeagent-control-client`'s own tests).
const UNREACHABLE: &str = "http://127.0.0.1:1";

fn sample_config(root: &std::path::Path, role: NodeRole) -> Config {
    Config {
        node_id: "node-1".into(),
        cluster_id: "cluster-a".into(),
        shard_index: 1,
        shard_name: "node-1".into(),
        role,
        control_plane_url: UNREACHABLE.into(),
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
        db_admin_bin: "mysql".into(),
        service_controller_kind: "direct".into(),
        storage_metadata_root: root.join("storage-meta"),
        lb_socket_path: root.join("haproxy.sock"),
        lb_map_path: root.join("backends.map"),
    }
}

fn sample_reconciler(root: &std::path::Path, role: NodeRole) -> Reconciler {
    let config = sample_config(root, role);
    let controller: Arc<dyn ServiceController> = Arc::from(build_controller("direct"));
    Reconciler::new(config, controller)
}

#[tokio::test]
async fn a_failed_fetch_with_no_cached_state_aborts_the_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let mut reconciler = sample_reconciler(dir.path(), NodeRole::Storage);
    let cancel = CancellationToken::new();

    let outcome = reconciler.full_reconcile(1_000, &cancel).await;

    assert_eq!(outcome, CycleOutcome::FetchFailed);
    assert_eq!(reconciler.metrics().cycle_result.with_label_values(&["fetch_failed"]).get(), 1);
    // dispatch never ran, so the breaker must stay closed.
    assert_eq!(reconciler.metrics().circuit_breaker.get(), 0.0);
}

#[tokio::test]
async fn repeated_failed_fetches_never_open_the_breaker() {
    let dir = tempfile::tempdir().unwrap();
    let mut reconciler = sample_reconciler(dir.path(), NodeRole::Storage);
    let cancel = CancellationToken::new();

    for tick in 0..5 {
        let outcome = reconciler.full_reconcile(1_000 + tick, &cancel).await;
        assert_eq!(outcome, CycleOutcome::FetchFailed);
    }

    assert_eq!(reconciler.metrics().circuit_breaker.get(), 0.0);
    assert_eq!(reconciler.metrics().cycle_result.with_label_values(&["fetch_failed"]).get(), 5);
}

#[test]
fn drift_kind_and_action_labels_match_the_serde_snake_case_names() {
    assert_eq!(drift_kind_label(DriftKind::TenantUser), "tenant_user");
    assert_eq!(drift_kind_label(DriftKind::NginxConfig), "nginx_config");
    assert_eq!(drift_kind_label(DriftKind::LbMap), "lb_map");
    assert_eq!(drift_action_label(DriftAction::AutoFixed), "auto_fixed");
    assert_eq!(drift_action_label(DriftAction::Reported), "reported");
}
