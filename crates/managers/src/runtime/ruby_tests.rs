// SPDX-License-Identifier: MIT

use super::*;
use serde_json::json;

#[test]
fn graceful_signal_defaults_to_usr1() {
    let webroot = nodeagent_core::test_support::webroot_fixture("shop", nodeagent_core::RuntimeKind::Ruby);
    assert_eq!(RubyRuntimeManager::graceful_signal(&webroot), "USR1");
}

#[test]
fn graceful_signal_honors_runtime_config_override() {
    let mut webroot = nodeagent_core::test_support::webroot_fixture("shop", nodeagent_core::RuntimeKind::Ruby);
    webroot.runtime_config = json!({"graceful_signal": "USR2"});
    assert_eq!(RubyRuntimeManager::graceful_signal(&webroot), "USR2");
}
