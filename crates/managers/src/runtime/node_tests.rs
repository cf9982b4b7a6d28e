// SPDX-License-Identifier: MIT

use super::*;
use nodeagent_svc::DirectController;

#[tokio::test]
async fn configure_renders_a_unit_with_the_deterministic_port() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = NodeRuntimeManager::new(dir.path(), Arc::new(DirectController::new()));
    let webroot = nodeagent_core::test_support::webroot_fixture("shop", nodeagent_core::RuntimeKind::Node);

    mgr.configure("acme", 2000, &webroot).await.unwrap();
    assert!(mgr.artifact_exists("acme", "shop"));

    let contents = tokio::fs::read_to_string(mgr.unit_path("acme", "shop")).await.unwrap();
    let port = compute_webroot_port("acme", "shop");
    assert!(contents.contains(&format!("PORT={port}")));
}

#[tokio::test]
async fn remove_deletes_the_unit_file() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = NodeRuntimeManager::new(dir.path(), Arc::new(DirectController::new()));
    let webroot = nodeagent_core::test_support::webroot_fixture("shop", nodeagent_core::RuntimeKind::Node);
    let cancel = CancellationToken::new();

    mgr.configure("acme", 2000, &webroot).await.unwrap();
    mgr.remove("acme", &webroot, &cancel).await.unwrap();
    assert!(!mgr.artifact_exists("acme", "shop"));
}
