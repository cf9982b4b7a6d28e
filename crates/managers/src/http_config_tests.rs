// SPDX-License-Identifier: MIT

use super::*;
use nodeagent_svc::DirectController;
use std::collections::HashSet;
use std::path::Path;

fn manager(root: &Path) -> HttpConfigManager {
    HttpConfigManager::new(
        root.join("http"),
        root.join("certs"),
        "node-1",
        "shard-a",
        "true",
        "nginx",
        Arc::new(DirectController::new()),
    )
}

#[tokio::test]
async fn create_renders_plaintext_block_without_certs() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = manager(dir.path());
    let mut webroot = nodeagent_core::test_support::webroot_fixture("shop", nodeagent_core::RuntimeKind::Static);
    webroot.fqdns = vec!["shop.example.com".to_string()];

    mgr.create("acme", &webroot).await.unwrap();
    assert!(mgr.exists("acme", "shop"));

    let contents = tokio::fs::read_to_string(mgr.config_path("acme", "shop")).await.unwrap();
    assert!(contents.contains("listen 80;"));
    assert!(!contents.contains("ssl_certificate"));
    assert!(contents.contains("X-Node-Name \"node-1\""));
}

#[tokio::test]
async fn create_enables_tls_only_when_both_cert_files_exist() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = manager(dir.path());
    let fqdn_dir = dir.path().join("certs").join("shop.example.com");
    tokio::fs::create_dir_all(&fqdn_dir).await.unwrap();
    tokio::fs::write(fqdn_dir.join("fullchain.pem"), b"cert").await.unwrap();
    // privkey.pem deliberately missing: TLS must not be enabled yet.

    let mut webroot = nodeagent_core::test_support::webroot_fixture("shop", nodeagent_core::RuntimeKind::Static);
    webroot.fqdns = vec!["shop.example.com".to_string()];
    mgr.create("acme", &webroot).await.unwrap();
    let contents = tokio::fs::read_to_string(mgr.config_path("acme", "shop")).await.unwrap();
    assert!(contents.contains("listen 80;"));

    tokio::fs::write(fqdn_dir.join("privkey.pem"), b"key").await.unwrap();
    mgr.create("acme", &webroot).await.unwrap();
    let contents = tokio::fs::read_to_string(mgr.config_path("acme", "shop")).await.unwrap();
    assert!(contents.contains("listen 443 ssl;"));
}

#[tokio::test]
async fn remove_orphans_deletes_configs_outside_the_expected_set() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = manager(dir.path());
    let webroot = nodeagent_core::test_support::webroot_fixture("shop", nodeagent_core::RuntimeKind::Static);
    mgr.create("acme", &webroot).await.unwrap();
    let stale = nodeagent_core::test_support::webroot_fixture("gone", nodeagent_core::RuntimeKind::Static);
    mgr.create("acme", &stale).await.unwrap();

    let mut expected = HashSet::new();
    expected.insert("acme_shop".to_string());
    let (removed, skipped) = mgr.remove_orphans(&expected, usize::MAX).await.unwrap();

    assert_eq!(removed, vec!["acme_gone.conf".to_string()]);
    assert!(skipped.is_empty());
    assert!(mgr.exists("acme", "shop"));
    assert!(!mgr.exists("acme", "gone"));
}

#[tokio::test]
async fn remove_orphans_caps_deletions_at_the_fix_budget() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = manager(dir.path());
    let first = nodeagent_core::test_support::webroot_fixture("first", nodeagent_core::RuntimeKind::Static);
    mgr.create("acme", &first).await.unwrap();
    let second = nodeagent_core::test_support::webroot_fixture("second", nodeagent_core::RuntimeKind::Static);
    mgr.create("acme", &second).await.unwrap();

    let (removed, skipped) = mgr.remove_orphans(&HashSet::new(), 1).await.unwrap();

    assert_eq!(removed.len(), 1);
    assert_eq!(skipped.len(), 1);
    // Exactly one of the two orphans remains on disk, matching whichever
    // was skipped.
    let remaining = if skipped[0] == "acme_first.conf" { "first" } else { "second" };
    assert!(mgr.exists("acme", remaining));
}

#[tokio::test]
async fn list_orphans_does_not_mutate_disk() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = manager(dir.path());
    let stale = nodeagent_core::test_support::webroot_fixture("gone", nodeagent_core::RuntimeKind::Static);
    mgr.create("acme", &stale).await.unwrap();

    let orphans = mgr.list_orphans(&HashSet::new()).await.unwrap();

    assert_eq!(orphans, vec!["acme_gone.conf".to_string()]);
    assert!(mgr.exists("acme", "gone"));
}
