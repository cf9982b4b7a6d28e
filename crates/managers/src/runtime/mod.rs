// SPDX-License-Identifier: MIT

//! Runtime Managers (spec.md §4.2.3): one capability,
//! Configure → Start → Reload → Stop → Remove, implemented per language
//! ecosystem. Each variant owns the process-management artifact for its
//! runtime and emits deterministic names (`{kind}-{tenant}-{webroot}`) so
//! orphan scanning can find stale files.

mod node;
mod php;
mod python;
mod ruby;
mod static_rt;

pub use node::NodeRuntimeManager;
pub use php::{validate_php_config, PhpRuntimeManager};
pub use python::PythonRuntimeManager;
pub use ruby::RubyRuntimeManager;
pub use static_rt::StaticRuntimeManager;

use async_trait::async_trait;
use nodeagent_core::{AgentResult, DesiredWebroot, RuntimeKind};
use tokio_util::sync::CancellationToken;

/// `{kind}-{tenant}-{webroot}`, the deterministic name shared by every
/// runtime's unit/config file and used for orphan scanning.
pub fn artifact_name(kind: &str, tenant: &str, webroot: &str) -> String {
    format!("{kind}-{tenant}-{webroot}")
}

#[async_trait]
pub trait RuntimeManager: Send + Sync {
    fn kind(&self) -> &'static str;

    async fn configure(&self, tenant: &str, uid: u32, webroot: &DesiredWebroot) -> AgentResult<()>;
    async fn start(&self, tenant: &str, webroot: &DesiredWebroot, cancel: &CancellationToken) -> AgentResult<()>;
    async fn reload(&self, tenant: &str, webroot: &DesiredWebroot, cancel: &CancellationToken) -> AgentResult<()>;
    async fn stop(&self, tenant: &str, webroot: &DesiredWebroot, cancel: &CancellationToken) -> AgentResult<()>;
    async fn remove(&self, tenant: &str, webroot: &DesiredWebroot, cancel: &CancellationToken) -> AgentResult<()>;

    /// Whether the runtime's on-disk artifact (unit, pool config, ...)
    /// already exists, used by the reconciler to decide whether Configure +
    /// Start is needed.
    fn artifact_exists(&self, tenant: &str, webroot: &str) -> bool;
}

/// Dispatches to the variant matching a webroot's configured runtime kind.
pub struct RuntimeManagerSet {
    pub static_rt: StaticRuntimeManager,
    pub php: PhpRuntimeManager,
    pub node: NodeRuntimeManager,
    pub python: PythonRuntimeManager,
    pub ruby: RubyRuntimeManager,
}

impl RuntimeManagerSet {
    pub fn resolve(&self, kind: RuntimeKind) -> &dyn RuntimeManager {
        match kind {
            RuntimeKind::Static => &self.static_rt,
            RuntimeKind::Php => &self.php,
            RuntimeKind::Node => &self.node,
            RuntimeKind::Python => &self.python,
            RuntimeKind::Ruby => &self.ruby,
        }
    }
}
