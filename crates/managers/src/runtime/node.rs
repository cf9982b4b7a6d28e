// SPDX-License-Identifier: MIT

use super::{artifact_name, RuntimeManager};
use async_trait::async_trait;
use nodeagent_core::hashing::compute_webroot_port;
use nodeagent_core::{AgentError, AgentResult, DesiredWebroot};
use nodeagent_svc::ServiceController;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Init-system unit running the entry point on a deterministic TCP port
/// (spec.md §4.2.3). Reload is a full restart.
pub struct NodeRuntimeManager {
    unit_root: PathBuf,
    controller: Arc<dyn ServiceController>,
}

impl NodeRuntimeManager {
    pub fn new(unit_root: impl Into<PathBuf>, controller: Arc<dyn ServiceController>) -> Self {
        Self {
            unit_root: unit_root.into(),
            controller,
        }
    }

    fn unit_name(&self, tenant: &str, webroot: &str) -> String {
        artifact_name(self.kind(), tenant, webroot)
    }

    fn unit_path(&self, tenant: &str, webroot: &str) -> PathBuf {
        self.unit_root.join(format!("{}.service", self.unit_name(tenant, webroot)))
    }

    fn render(&self, tenant: &str, uid: u32, webroot: &DesiredWebroot) -> String {
        let port = compute_webroot_port(tenant, &webroot.name);
        let entry = format!("{tenant}/webroots/{}", webroot.name);
        let env_lines: String = webroot
            .env
            .iter()
            .map(|(k, v)| format!("Environment={k}={v}\n"))
            .collect();
        format!(
            "[Unit]\nDescription=node runtime for {tenant}/{webroot_name}\n\n\
             [Service]\nUser={tenant}\nWorkingDirectory={entry}\n\
             Environment=PORT={port}\n{env_lines}\
             ExecStart=/usr/bin/node index.js\nRestart=on-failure\nUID={uid}\n\n\
             [Install]\nWantedBy=multi-user.target\n",
            webroot_name = webroot.name,
        )
    }
}

#[async_trait]
impl RuntimeManager for NodeRuntimeManager {
    fn kind(&self) -> &'static str {
        "node"
    }

    async fn configure(&self, tenant: &str, uid: u32, webroot: &DesiredWebroot) -> AgentResult<()> {
        let path = self.unit_path(tenant, &webroot.name);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AgentError::internal(format!("creating {}: {e}", parent.display())))?;
        }
        tokio::fs::write(&path, self.render(tenant, uid, webroot))
            .await
            .map_err(|e| AgentError::internal(format!("writing {}: {e}", path.display())))?;
        Ok(())
    }

    async fn start(&self, tenant: &str, webroot: &DesiredWebroot, cancel: &CancellationToken) -> AgentResult<()> {
        self.controller.daemon_reload(cancel).await?;
        self.controller.start(&self.unit_name(tenant, &webroot.name), cancel).await
    }

    /// Reload semantics for node are a full restart, per spec.md §4.2.3.
    async fn reload(&self, tenant: &str, webroot: &DesiredWebroot, cancel: &CancellationToken) -> AgentResult<()> {
        self.controller.restart(&self.unit_name(tenant, &webroot.name), cancel).await
    }

    async fn stop(&self, tenant: &str, webroot: &DesiredWebroot, cancel: &CancellationToken) -> AgentResult<()> {
        self.controller.stop(&self.unit_name(tenant, &webroot.name), cancel).await
    }

    async fn remove(&self, tenant: &str, webroot: &DesiredWebroot, cancel: &CancellationToken) -> AgentResult<()> {
        self.stop(tenant, webroot, cancel).await.ok();
        let path = self.unit_path(tenant, &webroot.name);
        if path.exists() {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| AgentError::internal(format!("removing {}: {e}", path.display())))?;
        }
        self.controller.daemon_reload(cancel).await
    }

    fn artifact_exists(&self, tenant: &str, webroot: &str) -> bool {
        self.unit_path(tenant, webroot).exists()
    }
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
