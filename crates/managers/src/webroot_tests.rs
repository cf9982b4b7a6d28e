// SPDX-License-Identifier: MIT

use super::*;

fn current_uid() -> u32 {
    nix::unistd::getuid().as_raw()
}

#[tokio::test]
async fn create_then_delete_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = WebrootManager::new(dir.path());
    let uid = current_uid();

    mgr.create("acme", "shop", uid, Some("public")).await.unwrap();
    assert!(mgr.exists("acme", "shop"));
    assert!(dir.path().join("acme/webroots/shop/public").is_dir());

    mgr.delete("acme", "shop").await.unwrap();
    assert!(!mgr.exists("acme", "shop"));
}

#[tokio::test]
async fn create_rejects_invalid_names() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = WebrootManager::new(dir.path());
    let err = mgr.create("bad name", "shop", current_uid(), None).await.unwrap_err();
    assert_eq!(err.code(), "invalid_argument");
}

#[tokio::test]
async fn delete_of_a_never_created_webroot_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = WebrootManager::new(dir.path());
    mgr.delete("acme", "never-existed").await.unwrap();
}
