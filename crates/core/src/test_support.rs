// SPDX-License-Identifier: MIT

//! Builders for constructing desired-state fixtures in other crates' tests.
//! Gated behind `test-support` so downstream crates can depend on it only
//! for `dev-dependencies`.

use crate::desired::{DesiredTenant, DesiredWebroot, RuntimeKind};
use std::collections::BTreeMap;

pub fn tenant_fixture(name: &str, uid: u32) -> DesiredTenant {
    DesiredTenant {
        id: format!("id-{name}"),
        name: name.to_string(),
        uid,
        ssh_enabled: false,
        sftp_enabled: false,
        quota_bytes: None,
        webroots: Vec::new(),
    }
}

pub fn webroot_fixture(name: &str, runtime: RuntimeKind) -> DesiredWebroot {
    DesiredWebroot {
        id: format!("id-{name}"),
        name: name.to_string(),
        runtime,
        runtime_version: None,
        runtime_config: serde_json::Value::Null,
        public_subfolder: None,
        fqdns: Vec::new(),
        env: BTreeMap::new(),
    }
}
