// SPDX-License-Identifier: MIT

//! KV role routine (spec.md §4.4): create-or-converge over the desired KV
//! instance collection.

use nodeagent_core::{DesiredKvInstance, DriftEvent, DriftKind};
use tokio_util::sync::CancellationToken;

use super::RoleContext;

pub async fn reconcile_kv(ctx: &mut RoleContext<'_>, instances: &[DesiredKvInstance], cancel: &CancellationToken) -> Vec<DriftEvent> {
    let mut events = Vec::new();

    for instance in instances {
        let _guard = ctx.locks.lock("kv", &instance.name, &instance.name).await;

        let existed = ctx.managers.kv.config_exists(&instance.name);

        if !existed && !ctx.may_fix() {
            events.push(ctx.reported(DriftKind::KvUser, instance.name.as_str(), "kv instance config missing"));
            continue;
        }
        if !ctx.may_fix() {
            continue;
        }

        match ctx.managers.kv.converge(instance, cancel).await {
            Ok(()) => {
                if !existed {
                    events.push(ctx.auto_fixed(DriftKind::KvUser, instance.name.as_str(), "created missing kv instance config and acl"));
                    ctx.spend_fix();
                }
            }
            Err(e) => events.push(ctx.reported(DriftKind::KvUser, instance.name.as_str(), format!("converge failed: {e}"))),
        }
    }

    events
}

#[cfg(test)]
#[path = "kv_tests.rs"]
mod tests;
