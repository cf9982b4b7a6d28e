// SPDX-License-Identifier: MIT

use super::{artifact_name, RuntimeManager};
use async_trait::async_trait;
use nodeagent_core::{AgentError, AgentResult, DesiredWebroot};
use nodeagent_svc::ServiceController;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Init-system unit binding a Unix-domain socket (spec.md §4.2.3). Reload is
/// a reload signal, not a restart.
pub struct PythonRuntimeManager {
    unit_root: PathBuf,
    engine: String,
    controller: Arc<dyn ServiceController>,
}

impl PythonRuntimeManager {
    pub fn new(unit_root: impl Into<PathBuf>, engine: impl Into<String>, controller: Arc<dyn ServiceController>) -> Self {
        Self {
            unit_root: unit_root.into(),
            engine: engine.into(),
            controller,
        }
    }

    fn unit_name(&self, tenant: &str, webroot: &str) -> String {
        artifact_name(self.kind(), tenant, webroot)
    }

    fn unit_path(&self, tenant: &str, webroot: &str) -> PathBuf {
        self.unit_root.join(format!("{}.service", self.unit_name(tenant, webroot)))
    }

    pub fn socket_path(&self, tenant: &str, webroot: &str) -> PathBuf {
        PathBuf::from(format!("/run/{}/{tenant}-{webroot}.sock", self.engine))
    }

    fn render(&self, tenant: &str, uid: u32, webroot: &DesiredWebroot) -> String {
        let socket = self.socket_path(tenant, &webroot.name);
        let entry = format!("{tenant}/webroots/{}", webroot.name);
        format!(
            "[Unit]\nDescription=python runtime for {tenant}/{webroot_name}\n\n\
             [Service]\nUser={tenant}\nWorkingDirectory={entry}\n\
             ExecStart=/usr/bin/gunicorn --bind unix:{socket} wsgi:app\n\
             Restart=on-failure\nUID={uid}\n\n\
             [Install]\nWantedBy=multi-user.target\n",
            webroot_name = webroot.name,
            socket = socket.display(),
        )
    }
}

#[async_trait]
impl RuntimeManager for PythonRuntimeManager {
    fn kind(&self) -> &'static str {
        "python"
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

    async fn reload(&self, tenant: &str, webroot: &DesiredWebroot, cancel: &CancellationToken) -> AgentResult<()> {
        self.controller.reload(&self.unit_name(tenant, &webroot.name), cancel).await
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
        self.socket_path(tenant, webroot).exists() || self.unit_path(tenant, webroot).exists()
    }
}

#[cfg(test)]
#[path = "python_tests.rs"]
mod tests;
