// SPDX-License-Identifier: MIT

use super::*;
use nodeagent_svc::DirectController;

#[tokio::test]
async fn configure_renders_a_unix_socket_unit() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = PythonRuntimeManager::new(dir.path(), "gunicorn", Arc::new(DirectController::new()));
    let webroot = nodeagent_core::test_support::webroot_fixture("shop", nodeagent_core::RuntimeKind::Python);

    mgr.configure("acme", 2000, &webroot).await.unwrap();
    let contents = tokio::fs::read_to_string(mgr.unit_path("acme", "shop")).await.unwrap();
    assert!(contents.contains("unix:/run/gunicorn/acme-shop.sock"));
}
