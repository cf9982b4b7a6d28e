// SPDX-License-Identifier: MIT

use super::*;

#[tokio::test]
async fn converge_writes_a_sorted_environment_line() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = DaemonManager::new(dir.path(), "true");
    let mut env = BTreeMap::new();
    env.insert("ZEBRA".to_string(), "2".to_string());
    env.insert("APPLE".to_string(), "1".to_string());

    let cancel = CancellationToken::new();
    mgr.converge("acme", "worker", "/usr/bin/worker", 2, "TERM", 5, &env, &cancel)
        .await
        .unwrap();

    let contents = tokio::fs::read_to_string(dir.path().join("daemon-acme-worker.conf"))
        .await
        .unwrap();
    assert!(contents.contains("numprocs=2"));
    assert!(contents.contains("stopsignal=TERM"));
    assert!(contents.contains("environment=APPLE=\"1\",ZEBRA=\"2\""));
}

#[tokio::test]
async fn remove_all_for_tenant_deletes_only_the_matching_tenants_programs() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = DaemonManager::new(dir.path(), "true");
    let cancel = CancellationToken::new();

    mgr.converge("acme", "worker", "/bin/true", 1, "TERM", 5, &BTreeMap::new(), &cancel)
        .await
        .unwrap();
    mgr.converge("acme", "queue", "/bin/true", 1, "TERM", 5, &BTreeMap::new(), &cancel)
        .await
        .unwrap();
    mgr.converge("other", "worker", "/bin/true", 1, "TERM", 5, &BTreeMap::new(), &cancel)
        .await
        .unwrap();

    mgr.remove_all_for_tenant("acme", &cancel).await.unwrap();

    assert!(!dir.path().join("daemon-acme-worker.conf").exists());
    assert!(!dir.path().join("daemon-acme-queue.conf").exists());
    assert!(dir.path().join("daemon-other-worker.conf").exists());
}

#[tokio::test]
async fn remove_all_for_tenant_tolerates_a_missing_config_root() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = DaemonManager::new(dir.path().join("never-created"), "true");
    mgr.remove_all_for_tenant("acme", &CancellationToken::new()).await.unwrap();
}

#[tokio::test]
async fn converge_rejects_invalid_names() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = DaemonManager::new(dir.path(), "true");
    let err = mgr
        .converge(
            "bad name",
            "worker",
            "/bin/true",
            1,
            "TERM",
            5,
            &BTreeMap::new(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "invalid_argument");
}
