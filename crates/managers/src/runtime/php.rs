// SPDX-License-Identifier: MIT

use super::RuntimeManager;
use async_trait::async_trait;
use nodeagent_core::{AgentError, AgentResult, DesiredWebroot};
use nodeagent_svc::ServiceController;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const NUMERIC_RANGE_KEYS: &[(&str, i64, i64)] = &[
    ("max-children", 1, 200),
    ("start-servers", 1, 200),
    ("min-spare", 1, 200),
    ("max-spare", 1, 200),
    ("max-requests", 0, 100_000),
];

const BLOCKLISTED_KEYS: &[&str] = &[
    "open_basedir",
    "disable_functions",
    "error_log",
    "slowlog",
    "doc_root",
];

/// Validates the per-process-manager numeric ranges and rejects
/// security-critical admin overrides, per spec.md §4.2.3.
pub fn validate_php_config(config: &serde_json::Value) -> AgentResult<()> {
    let Some(map) = config.as_object() else {
        return Ok(());
    };

    for &(key, min, max) in NUMERIC_RANGE_KEYS {
        let Some(value) = map.get(key) else { continue };
        let Some(n) = value.as_i64() else {
            return Err(AgentError::invalid_argument(format!("{key} must be an integer")));
        };
        if n < min || n > max {
            return Err(AgentError::invalid_argument(format!(
                "{key}={n} is out of range [{min}, {max}]"
            )));
        }
    }

    for &key in BLOCKLISTED_KEYS {
        if map.contains_key(key) {
            return Err(AgentError::invalid_argument(format!(
                "{key} is not permitted in runtime config"
            )));
        }
    }
    Ok(())
}

pub struct PhpRuntimeManager {
    pool_config_root: PathBuf,
    controller: Arc<dyn ServiceController>,
}

impl PhpRuntimeManager {
    pub fn new(pool_config_root: impl Into<PathBuf>, controller: Arc<dyn ServiceController>) -> Self {
        Self {
            pool_config_root: pool_config_root.into(),
            controller,
        }
    }

    fn pool_path(&self, version: &str, tenant: &str) -> PathBuf {
        self.pool_config_root.join(version).join("fpm").join("pool.d").join(format!("{tenant}.conf"))
    }

    pub fn socket_path(&self, version: &str, tenant: &str, webroot: &str) -> PathBuf {
        PathBuf::from(format!("/run/php/{version}/{tenant}-{webroot}.sock"))
    }

    fn engine_unit(&self, version: &str) -> String {
        format!("php{version}-fpm")
    }

    fn render(&self, version: &str, tenant: &str, webroot: &str, uid: u32) -> String {
        format!(
            "[{tenant}]\n\
             user = {tenant}\n\
             group = {tenant}\n\
             listen = {socket}\n\
             listen.owner = {tenant}\n\
             listen.group = {tenant}\n\
             pm = dynamic\n\
             pm.max_children = 10\n\
             pm.start_servers = 2\n\
             pm.min_spare_servers = 1\n\
             pm.max_spare_servers = 3\n\
             ; uid {uid}\n",
            socket = self.socket_path(version, tenant, webroot).display(),
        )
    }
}

#[async_trait]
impl RuntimeManager for PhpRuntimeManager {
    fn kind(&self) -> &'static str {
        "php"
    }

    async fn configure(&self, tenant: &str, uid: u32, webroot: &DesiredWebroot) -> AgentResult<()> {
        validate_php_config(&webroot.runtime_config)?;
        let version = webroot.runtime_version.as_deref().unwrap_or("8.3");
        let path = self.pool_path(version, tenant);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AgentError::internal(format!("creating {}: {e}", parent.display())))?;
        }
        let contents = self.render(version, tenant, &webroot.name, uid);
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| AgentError::internal(format!("writing {}: {e}", path.display())))?;
        Ok(())
    }

    async fn start(&self, _tenant: &str, webroot: &DesiredWebroot, cancel: &CancellationToken) -> AgentResult<()> {
        let version = webroot.runtime_version.as_deref().unwrap_or("8.3");
        self.controller.start(&self.engine_unit(version), cancel).await
    }

    async fn reload(&self, _tenant: &str, webroot: &DesiredWebroot, cancel: &CancellationToken) -> AgentResult<()> {
        let version = webroot.runtime_version.as_deref().unwrap_or("8.3");
        self.controller.reload(&self.engine_unit(version), cancel).await
    }

    async fn stop(&self, _tenant: &str, webroot: &DesiredWebroot, cancel: &CancellationToken) -> AgentResult<()> {
        let version = webroot.runtime_version.as_deref().unwrap_or("8.3");
        self.controller.reload(&self.engine_unit(version), cancel).await
    }

    async fn remove(&self, tenant: &str, webroot: &DesiredWebroot, cancel: &CancellationToken) -> AgentResult<()> {
        let version = webroot.runtime_version.as_deref().unwrap_or("8.3");
        let path = self.pool_path(version, tenant);
        if path.exists() {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| AgentError::internal(format!("removing {}: {e}", path.display())))?;
        }
        self.controller.reload(&self.engine_unit(version), cancel).await
    }

    fn artifact_exists(&self, tenant: &str, _webroot: &str) -> bool {
        // The pool config path is per PHP version; the default covers the
        // common case, and a version mismatch simply looks like drift,
        // which the reconciler corrects on the next Configure.
        self.pool_path("8.3", tenant).exists()
    }
}

impl PhpRuntimeManager {
    /// Removes this tenant's FPM pool config under every installed PHP
    /// version found under `pool_config_root` and restarts the
    /// corresponding `php{version}-fpm` service, used when reclaiming a
    /// stale UID or name (spec.md §4.2.1) where the caller knows only the
    /// tenant name and not which version(s) it ran under.
    pub async fn remove_for_tenant(&self, tenant: &str, cancel: &CancellationToken) -> AgentResult<()> {
        if !self.pool_config_root.is_dir() {
            return Ok(());
        }
        let mut entries = tokio::fs::read_dir(&self.pool_config_root)
            .await
            .map_err(|e| AgentError::internal(format!("reading {}: {e}", self.pool_config_root.display())))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AgentError::internal(format!("reading {}: {e}", self.pool_config_root.display())))?
        {
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir {
                continue;
            }
            let version = entry.file_name().to_string_lossy().to_string();
            let path = self.pool_path(&version, tenant);
            if path.exists() {
                tokio::fs::remove_file(&path)
                    .await
                    .map_err(|e| AgentError::internal(format!("removing {}: {e}", path.display())))?;
                self.controller.restart(&self.engine_unit(&version), cancel).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "php_tests.rs"]
mod tests;
