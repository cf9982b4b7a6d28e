// SPDX-License-Identifier: MIT

//! Web role routine (spec.md §4.4, "Role routine — web (canonical)"): the
//! tenant → webroot → (directory, http config, runtime) convergence chain,
//! finishing with an orphan sweep over `sites-enabled/`.

use std::collections::HashSet;

use nodeagent_core::{DesiredTenant, DriftEvent, DriftKind};
use tokio_util::sync::CancellationToken;

use super::RoleContext;

pub async fn reconcile_web(ctx: &mut RoleContext<'_>, tenants: &[DesiredTenant], cancel: &CancellationToken) -> Vec<DriftEvent> {
    let mut events = Vec::new();
    let mut expected_configs: HashSet<String> = HashSet::new();
    let mut any_fix = false;

    for tenant in tenants {
        {
            let _guard = ctx.locks.lock("tenant", tenant.name.as_str(), tenant.name.as_str()).await;
            match ctx.managers.tenant.exists(tenant.name.as_str(), cancel).await {
                Ok(true) => {}
                Ok(false) if ctx.may_fix() => {
                    match ctx
                        .managers
                        .tenant
                        .create(tenant.name.as_str(), tenant.uid, tenant.quota_bytes, tenant.ssh_enabled, tenant.sftp_enabled, cancel)
                        .await
                    {
                        Ok(()) => {
                            events.push(ctx.auto_fixed(DriftKind::TenantUser, tenant.name.as_str(), "created missing tenant account"));
                            ctx.spend_fix();
                            any_fix = true;
                        }
                        Err(e) => events.push(ctx.reported(DriftKind::TenantUser, tenant.name.as_str(), format!("create failed: {e}"))),
                    }
                }
                Ok(false) => events.push(ctx.reported(DriftKind::TenantUser, tenant.name.as_str(), "tenant account missing")),
                Err(e) => events.push(ctx.reported(DriftKind::TenantUser, tenant.name.as_str(), format!("exists check failed: {e}"))),
            }
        }

        for webroot in &tenant.webroots {
            let resource = format!("{}/{}", tenant.name, webroot.name);
            expected_configs.insert(format!("{}_{}", tenant.name, webroot.name));

            {
                let _guard = ctx.locks.lock("webroot", tenant.name.as_str(), &webroot.name).await;
                if !ctx.managers.webroot.exists(tenant.name.as_str(), &webroot.name) {
                    if ctx.may_fix() {
                        match ctx
                            .managers
                            .webroot
                            .create(tenant.name.as_str(), &webroot.name, tenant.uid, webroot.public_subfolder.as_deref())
                            .await
                        {
                            Ok(()) => {
                                events.push(ctx.auto_fixed(DriftKind::Webroot, resource.as_str(), "created missing webroot directory"));
                                ctx.spend_fix();
                                any_fix = true;
                            }
                            Err(e) => events.push(ctx.reported(DriftKind::Webroot, resource.as_str(), format!("create failed: {e}"))),
                        }
                    } else {
                        events.push(ctx.reported(DriftKind::Webroot, resource.as_str(), "webroot directory missing"));
                    }
                }
            }

            {
                let _guard = ctx.locks.lock("nginx", tenant.name.as_str(), &webroot.name).await;
                if !ctx.managers.http_config.exists(tenant.name.as_str(), &webroot.name) {
                    if ctx.may_fix() {
                        match ctx.managers.http_config.create(tenant.name.as_str(), webroot).await {
                            Ok(()) => {
                                events.push(ctx.auto_fixed(DriftKind::NginxConfig, resource.as_str(), "regenerated missing http config"));
                                ctx.spend_fix();
                                any_fix = true;
                            }
                            Err(e) => events.push(ctx.reported(DriftKind::NginxConfig, resource.as_str(), format!("create failed: {e}"))),
                        }
                    } else {
                        events.push(ctx.reported(DriftKind::NginxConfig, resource.as_str(), "http config missing"));
                    }
                }
            }

            {
                let _guard = ctx.locks.lock("runtime", tenant.name.as_str(), &webroot.name).await;
                let runtime_mgr = ctx.managers.runtime.resolve(webroot.runtime);
                if !runtime_mgr.artifact_exists(tenant.name.as_str(), &webroot.name) {
                    if ctx.may_fix() {
                        let outcome = async {
                            runtime_mgr.configure(tenant.name.as_str(), tenant.uid, webroot).await?;
                            runtime_mgr.start(tenant.name.as_str(), webroot, cancel).await
                        }
                        .await;
                        match outcome {
                            Ok(()) => {
                                events.push(ctx.auto_fixed(DriftKind::Runtime, resource.as_str(), "configured and started missing runtime"));
                                ctx.spend_fix();
                                any_fix = true;
                            }
                            Err(e) => events.push(ctx.reported(DriftKind::Runtime, resource.as_str(), format!("configure/start failed: {e}"))),
                        }
                    } else {
                        events.push(ctx.reported(DriftKind::Runtime, resource.as_str(), "runtime artifact missing"));
                    }
                }
            }
        }
    }

    // Pass remove_orphans the remaining fix budget so it never deletes more
    // than this cycle is allowed to auto-fix; anything beyond that (or, if
    // the breaker is open, every orphan found via the read-only list_orphans
    // path) is left on disk and reported instead, matching roles/lb.rs's
    // per-item budget discipline.
    if ctx.may_fix() {
        match ctx.managers.http_config.remove_orphans(&expected_configs, ctx.fixes_remaining() as usize).await {
            Ok((removed, skipped)) => {
                for filename in removed {
                    events.push(ctx.auto_fixed(DriftKind::NginxConfig, filename, "removed orphaned http config"));
                    ctx.spend_fix();
                    any_fix = true;
                }
                for filename in skipped {
                    events.push(ctx.reported(DriftKind::NginxConfig, filename, "orphaned http config not removed: fix budget exhausted"));
                }
            }
            Err(e) => events.push(ctx.reported(DriftKind::NginxConfig, "sites-enabled", format!("orphan scan failed: {e}"))),
        }
    } else {
        match ctx.managers.http_config.list_orphans(&expected_configs).await {
            Ok(orphans) => {
                for filename in orphans {
                    events.push(ctx.reported(DriftKind::NginxConfig, filename, "orphaned http config not removed: breaker open"));
                }
            }
            Err(e) => events.push(ctx.reported(DriftKind::NginxConfig, "sites-enabled", format!("orphan scan failed: {e}"))),
        }
    }

    if any_fix {
        if let Err(e) = ctx.managers.http_config.reload(cancel).await {
            events.push(ctx.reported(DriftKind::NginxConfig, "reload", format!("reload failed: {e}")));
        }
    }

    events
}

#[cfg(test)]
#[path = "web_tests.rs"]
mod tests;
