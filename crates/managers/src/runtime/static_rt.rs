// SPDX-License-Identifier: MIT

use super::RuntimeManager;
use async_trait::async_trait;
use nodeagent_core::{AgentResult, DesiredWebroot};
use tokio_util::sync::CancellationToken;

/// The static runtime has no process-management artifact; every lifecycle
/// operation is a no-op except Configure, which has nothing to do either
/// beyond what the Webroot Manager already provisioned.
#[derive(Default)]
pub struct StaticRuntimeManager;

impl StaticRuntimeManager {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RuntimeManager for StaticRuntimeManager {
    fn kind(&self) -> &'static str {
        "static"
    }

    async fn configure(&self, _tenant: &str, _uid: u32, _webroot: &DesiredWebroot) -> AgentResult<()> {
        Ok(())
    }

    async fn start(&self, _tenant: &str, _webroot: &DesiredWebroot, _cancel: &CancellationToken) -> AgentResult<()> {
        Ok(())
    }

    async fn reload(&self, _tenant: &str, _webroot: &DesiredWebroot, _cancel: &CancellationToken) -> AgentResult<()> {
        Ok(())
    }

    async fn stop(&self, _tenant: &str, _webroot: &DesiredWebroot, _cancel: &CancellationToken) -> AgentResult<()> {
        Ok(())
    }

    async fn remove(&self, _tenant: &str, _webroot: &DesiredWebroot, _cancel: &CancellationToken) -> AgentResult<()> {
        Ok(())
    }

    fn artifact_exists(&self, _tenant: &str, _webroot: &str) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_operation_is_a_no_op() {
        let mgr = StaticRuntimeManager::new();
        let cancel = CancellationToken::new();
        let webroot = nodeagent_core::test_support::webroot_fixture("shop", nodeagent_core::RuntimeKind::Static);
        mgr.configure("acme", 2000, &webroot).await.unwrap();
        mgr.start("acme", &webroot, &cancel).await.unwrap();
        mgr.reload("acme", &webroot, &cancel).await.unwrap();
        mgr.stop("acme", &webroot, &cancel).await.unwrap();
        mgr.remove("acme", &webroot, &cancel).await.unwrap();
        assert!(mgr.artifact_exists("acme", "shop"));
    }
}
