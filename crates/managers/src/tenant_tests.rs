// SPDX-License-Identifier: MIT

use super::*;
use nodeagent_svc::DirectController;

fn manager(root: &Path) -> TenantManager {
    // A magic number no real filesystem reports, so the mount guard always
    // rejects it regardless of what backs the test's tempdir.
    TenantManager::new(
        root.join("storage"),
        root.join("logs"),
        0x4242_4242,
        Arc::new(DirectController::new()),
        root.join("php"),
        root.join("supervisor"),
        root.join("systemd"),
    )
}

#[tokio::test]
async fn create_rejects_invalid_tenant_name() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = manager(dir.path());
    let cancel = CancellationToken::new();
    let err = mgr.create("not valid!", 2000, None, false, false, &cancel).await.unwrap_err();
    assert_eq!(err.code(), "invalid_argument");
}

#[tokio::test]
async fn create_fails_unavailable_when_storage_root_is_not_the_expected_filesystem() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("storage")).unwrap();
    let mgr = manager(dir.path());
    let cancel = CancellationToken::new();
    // tmpfs/local fs at the tempdir will virtually never match this magic.
    let err = mgr.create("acme", 2000, None, false, false, &cancel).await.unwrap_err();
    assert_eq!(err.code(), "unavailable");
}

#[tokio::test]
async fn stop_managed_services_removes_pool_config_daemon_programs_and_cron_timers() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = manager(dir.path());
    let cancel = CancellationToken::new();

    let pool_dir = dir.path().join("php").join("8.3").join("fpm").join("pool.d");
    tokio::fs::create_dir_all(&pool_dir).await.unwrap();
    tokio::fs::write(pool_dir.join("acme.conf"), b"[acme]\n").await.unwrap();

    let supervisor_dir = dir.path().join("supervisor");
    tokio::fs::create_dir_all(&supervisor_dir).await.unwrap();
    tokio::fs::write(supervisor_dir.join("daemon-acme-worker.conf"), b"[program:daemon-acme-worker]\n")
        .await
        .unwrap();
    // A program belonging to another tenant must survive the sweep.
    tokio::fs::write(supervisor_dir.join("daemon-other-worker.conf"), b"[program:daemon-other-worker]\n")
        .await
        .unwrap();

    let unit_dir = dir.path().join("systemd");
    tokio::fs::create_dir_all(&unit_dir).await.unwrap();
    tokio::fs::write(unit_dir.join("cron-acme-nightly.service"), b"[Unit]\n").await.unwrap();
    tokio::fs::write(unit_dir.join("cron-acme-nightly.timer"), b"[Timer]\n").await.unwrap();

    mgr.stop_managed_services("acme", &cancel).await.unwrap();

    assert!(!pool_dir.join("acme.conf").exists());
    assert!(!supervisor_dir.join("daemon-acme-worker.conf").exists());
    assert!(supervisor_dir.join("daemon-other-worker.conf").exists());
    assert!(!unit_dir.join("cron-acme-nightly.service").exists());
    assert!(!unit_dir.join("cron-acme-nightly.timer").exists());
}

#[tokio::test]
async fn delete_rejects_invalid_tenant_name() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = manager(dir.path());
    let cancel = CancellationToken::new();
    let err = mgr.delete("../escape", 2000, &cancel).await.unwrap_err();
    assert_eq!(err.code(), "invalid_argument");
}
