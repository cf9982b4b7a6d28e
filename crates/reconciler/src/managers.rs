// SPDX-License-Identifier: MIT

//! Bundles every resource manager behind one struct so role routines and
//! the binary entrypoint build them from [`Config`] in one place.

use std::sync::Arc;

use nodeagent_managers::{
    runtime::{NodeRuntimeManager, PhpRuntimeManager, PythonRuntimeManager, RubyRuntimeManager, RuntimeManagerSet, StaticRuntimeManager},
    CronManager, DaemonManager, DatabaseManager, HttpConfigManager, KvManager, TenantManager, UlaNftManager, WebrootManager,
};
use nodeagent_svc::ServiceController;

use crate::config::Config;

/// Every manager the reconciler's role routines dispatch to, built once at
/// startup and shared across reconciliation cycles and imperative RPCs.
pub struct AgentManagers {
    pub tenant: TenantManager,
    pub webroot: WebrootManager,
    pub runtime: RuntimeManagerSet,
    pub http_config: HttpConfigManager,
    pub database: DatabaseManager,
    pub kv: KvManager,
    pub ula_nft: UlaNftManager,
    pub cron: CronManager,
    pub daemon: DaemonManager,
}

impl AgentManagers {
    pub fn new(config: &Config, controller: Arc<dyn ServiceController>) -> Self {
        let engine_unit = format!("{}.service", config.service_controller_kind);

        Self {
            tenant: TenantManager::new(
                config.storage_root.clone(),
                config.log_root.clone(),
                config.mount_magic,
                controller.clone(),
                config.php_pool_root.clone(),
                config.supervisor_config_root.clone(),
                config.unit_root.clone(),
            ),
            webroot: WebrootManager::new(config.storage_root.clone()),
            runtime: RuntimeManagerSet {
                static_rt: StaticRuntimeManager::new(),
                php: PhpRuntimeManager::new(config.php_pool_root.clone(), controller.clone()),
                node: NodeRuntimeManager::new(config.unit_root.clone(), controller.clone()),
                python: PythonRuntimeManager::new(config.unit_root.clone(), "gunicorn", controller.clone()),
                ruby: RubyRuntimeManager::new(config.unit_root.clone(), "puma", controller.clone()),
            },
            http_config: HttpConfigManager::new(
                config.http_config_root.clone(),
                config.cert_root.clone(),
                config.node_id.clone(),
                config.shard_name.clone(),
                "nginx -t",
                engine_unit,
                controller.clone(),
            ),
            database: DatabaseManager::new(config.db_admin_bin.clone()),
            kv: KvManager::new(
                config.kv_config_root.clone(),
                config.kv_engine.clone(),
                format!("{}-cli", config.kv_engine),
                controller.clone(),
            ),
            ula_nft: UlaNftManager::new(config.cluster_id.clone(), config.shard_index),
            cron: CronManager::new(config.unit_root.clone(), controller.clone()),
            daemon: DaemonManager::new(config.supervisor_config_root.clone(), "supervisorctl"),
        }
    }
}

#[cfg(test)]
#[path = "managers_tests.rs"]
mod tests;
