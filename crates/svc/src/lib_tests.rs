// SPDX-License-Identifier: MIT

use super::*;

#[tokio::test]
async fn direct_controller_treats_start_and_daemon_reload_as_no_ops() {
    let controller = DirectController::new();
    let cancel = CancellationToken::new();
    controller.daemon_reload(&cancel).await.unwrap();
    controller.start("anything", &cancel).await.unwrap();
}

#[tokio::test]
async fn direct_controller_signal_with_no_matching_process_succeeds() {
    let controller = DirectController::new();
    let cancel = CancellationToken::new();
    controller
        .signal("nodeagent-test-no-such-process", "TERM", &cancel)
        .await
        .unwrap();
}

#[test]
fn build_controller_selects_direct_case_insensitively() {
    let a = build_controller("direct");
    let b = build_controller("Direct");
    let _ = (a, b);
}

#[test]
fn build_controller_defaults_to_full_init_for_any_other_name() {
    let _controller = build_controller("systemctl");
}
