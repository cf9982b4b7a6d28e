// SPDX-License-Identifier: MIT

//! The Service Controller capability (spec.md §4.1): a single uniform
//! interface over either a real init system or, for environments that lack
//! one, a signal-driven stand-in. Runtime managers and the HTTP Config
//! Manager talk to whichever variant is selected once at startup.

use async_trait::async_trait;
use nodeagent_core::AgentResult;
use nodeagent_sys::subprocess;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::warn;

const CONTROL_TIMEOUT: Duration = Duration::from_secs(20);

/// Lifecycle and reload operations over a named managed service, independent
/// of whether the host actually runs an init system.
#[async_trait]
pub trait ServiceController: Send + Sync {
    async fn daemon_reload(&self, cancel: &CancellationToken) -> AgentResult<()>;
    async fn start(&self, unit: &str, cancel: &CancellationToken) -> AgentResult<()>;
    async fn stop(&self, unit: &str, cancel: &CancellationToken) -> AgentResult<()>;
    async fn restart(&self, unit: &str, cancel: &CancellationToken) -> AgentResult<()>;
    async fn reload(&self, unit: &str, cancel: &CancellationToken) -> AgentResult<()>;
    async fn disable(&self, unit: &str, cancel: &CancellationToken) -> AgentResult<()>;
    async fn signal(
        &self,
        process: &str,
        signal_name: &str,
        cancel: &CancellationToken,
    ) -> AgentResult<()>;
}

/// Translates every operation into the init system's control CLI
/// (`systemctl`-compatible invocation).
pub struct FullInitController {
    control_bin: String,
}

impl FullInitController {
    pub fn new(control_bin: impl Into<String>) -> Self {
        Self {
            control_bin: control_bin.into(),
        }
    }

    async fn run(&self, args: &[&str], cancel: &CancellationToken, label: &str) -> AgentResult<()> {
        let mut cmd = Command::new(&self.control_bin);
        cmd.args(args);
        subprocess::run(cmd, CONTROL_TIMEOUT, cancel, label).await?;
        Ok(())
    }
}

#[async_trait]
impl ServiceController for FullInitController {
    async fn daemon_reload(&self, cancel: &CancellationToken) -> AgentResult<()> {
        self.run(&["daemon-reload"], cancel, "daemon-reload").await
    }

    async fn start(&self, unit: &str, cancel: &CancellationToken) -> AgentResult<()> {
        self.run(&["start", unit], cancel, "start").await
    }

    async fn stop(&self, unit: &str, cancel: &CancellationToken) -> AgentResult<()> {
        self.run(&["stop", unit], cancel, "stop").await
    }

    async fn restart(&self, unit: &str, cancel: &CancellationToken) -> AgentResult<()> {
        self.run(&["restart", unit], cancel, "restart").await
    }

    async fn reload(&self, unit: &str, cancel: &CancellationToken) -> AgentResult<()> {
        self.run(&["reload", unit], cancel, "reload").await
    }

    async fn disable(&self, unit: &str, cancel: &CancellationToken) -> AgentResult<()> {
        self.run(&["disable", unit], cancel, "disable").await
    }

    async fn signal(
        &self,
        process: &str,
        signal_name: &str,
        cancel: &CancellationToken,
    ) -> AgentResult<()> {
        subprocess::signal_by_name(process, signal_name, cancel).await
    }
}

/// For environments without an init system: `daemon_reload`/`start` are
/// no-ops (with a warning), the rest act via a process-name signal killer.
#[derive(Default)]
pub struct DirectController;

impl DirectController {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ServiceController for DirectController {
    async fn daemon_reload(&self, _cancel: &CancellationToken) -> AgentResult<()> {
        warn!("daemon_reload is a no-op under the direct service controller");
        Ok(())
    }

    async fn start(&self, unit: &str, _cancel: &CancellationToken) -> AgentResult<()> {
        warn!(unit, "start is a no-op under the direct service controller");
        Ok(())
    }

    async fn stop(&self, unit: &str, cancel: &CancellationToken) -> AgentResult<()> {
        subprocess::signal_by_name(unit, "TERM", cancel).await
    }

    async fn restart(&self, unit: &str, cancel: &CancellationToken) -> AgentResult<()> {
        subprocess::signal_by_name(unit, "TERM", cancel).await?;
        warn!(unit, "restart on the direct controller only signals stop; start is a no-op");
        Ok(())
    }

    async fn reload(&self, unit: &str, cancel: &CancellationToken) -> AgentResult<()> {
        subprocess::signal_by_name(unit, "HUP", cancel).await
    }

    async fn disable(&self, unit: &str, _cancel: &CancellationToken) -> AgentResult<()> {
        warn!(unit, "disable is a no-op under the direct service controller");
        Ok(())
    }

    async fn signal(
        &self,
        process: &str,
        signal_name: &str,
        cancel: &CancellationToken,
    ) -> AgentResult<()> {
        subprocess::signal_by_name(process, signal_name, cancel).await
    }
}

/// Build the configured variant. `"direct"` selects [`DirectController`];
/// anything else is treated as the control binary name for
/// [`FullInitController`] (e.g. `"systemctl"`).
pub fn build_controller(kind: &str) -> Box<dyn ServiceController> {
    if kind.eq_ignore_ascii_case("direct") {
        Box::new(DirectController::new())
    } else {
        Box::new(FullInitController::new(kind))
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
