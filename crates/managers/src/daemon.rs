// SPDX-License-Identifier: MIT

//! Daemon Manager (spec.md §4.2.7): supervisor program configs for
//! long-running tenant processes, distinct from the init-system units the
//! runtime managers own.

use nodeagent_core::{validate, AgentError, AgentResult};
use nodeagent_sys::subprocess;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

const SUPERVISOR_TIMEOUT: Duration = Duration::from_secs(10);

pub struct DaemonManager {
    config_root: PathBuf,
    supervisorctl_bin: String,
}

impl DaemonManager {
    pub fn new(config_root: impl Into<PathBuf>, supervisorctl_bin: impl Into<String>) -> Self {
        Self {
            config_root: config_root.into(),
            supervisorctl_bin: supervisorctl_bin.into(),
        }
    }

    fn program_name(tenant: &str, name: &str) -> String {
        format!("daemon-{tenant}-{name}")
    }

    fn config_path(&self, tenant: &str, name: &str) -> PathBuf {
        self.config_root.join(format!("{}.conf", Self::program_name(tenant, name)))
    }

    pub async fn converge(
        &self,
        tenant: &str,
        name: &str,
        command: &str,
        num_procs: u32,
        stop_signal: &str,
        stop_wait_secs: u32,
        env: &BTreeMap<String, String>,
        cancel: &CancellationToken,
    ) -> AgentResult<()> {
        validate::validate_name("tenant name", tenant)?;
        validate::validate_name("daemon name", name)?;

        let program = Self::program_name(tenant, name);
        let env_line: String = env
            .iter()
            .map(|(k, v)| format!("{k}=\"{v}\""))
            .collect::<Vec<_>>()
            .join(",");

        let contents = format!(
            "[program:{program}]\ncommand={command}\nuser={tenant}\n\
             numprocs={num_procs}\nstopsignal={stop_signal}\nstopwaitsecs={stop_wait_secs}\n\
             autorestart=true\nenvironment={env_line}\n"
        );

        tokio::fs::create_dir_all(&self.config_root)
            .await
            .map_err(|e| AgentError::internal(format!("creating {}: {e}", self.config_root.display())))?;
        let path = self.config_path(tenant, name);
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| AgentError::internal(format!("writing {}: {e}", path.display())))?;

        self.ctl(&["update"], None, cancel).await
    }

    /// Whether the program config file already exists, used by the
    /// reconciler to decide whether Configure is needed this cycle.
    pub fn config_exists(&self, tenant: &str, name: &str) -> bool {
        self.config_path(tenant, name).is_file()
    }

    pub async fn remove(&self, tenant: &str, name: &str, cancel: &CancellationToken) -> AgentResult<()> {
        let program = Self::program_name(tenant, name);
        self.stop(&program, cancel).await.ok();
        let path = self.config_path(tenant, name);
        if path.exists() {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| AgentError::internal(format!("removing {}: {e}", path.display())))?;
        }
        self.ctl(&["update"], None, cancel).await
    }

    /// Stops and removes every program belonging to `tenant`
    /// (`daemon-{tenant}-*`), used when reclaiming a stale UID or name
    /// (spec.md §4.2.1), where the caller knows only the tenant name and not
    /// the individual daemon names still configured.
    pub async fn remove_all_for_tenant(&self, tenant: &str, cancel: &CancellationToken) -> AgentResult<()> {
        let prefix = format!("daemon-{tenant}-");
        if !self.config_root.is_dir() {
            return Ok(());
        }
        let mut entries = tokio::fs::read_dir(&self.config_root)
            .await
            .map_err(|e| AgentError::internal(format!("reading {}: {e}", self.config_root.display())))?;
        let mut programs = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AgentError::internal(format!("reading {}: {e}", self.config_root.display())))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(stem) = name.strip_suffix(".conf") else { continue };
            if stem.starts_with(&prefix) {
                programs.push(stem.to_string());
            }
        }
        if programs.is_empty() {
            return Ok(());
        }
        for program in &programs {
            self.stop(program, cancel).await.ok();
            let path = self.config_root.join(format!("{program}.conf"));
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| AgentError::internal(format!("removing {}: {e}", path.display())))?;
        }
        self.ctl(&["update"], None, cancel).await
    }

    pub async fn start(&self, tenant: &str, name: &str, cancel: &CancellationToken) -> AgentResult<()> {
        self.ctl(&["start"], Some(&Self::program_name(tenant, name)), cancel).await
    }

    pub async fn stop(&self, program: &str, cancel: &CancellationToken) -> AgentResult<()> {
        self.ctl(&["stop"], Some(program), cancel).await
    }

    pub async fn reload(&self, tenant: &str, name: &str, cancel: &CancellationToken) -> AgentResult<()> {
        self.ctl(&["restart"], Some(&Self::program_name(tenant, name)), cancel).await
    }

    async fn ctl(&self, verb: &[&str], program: Option<&str>, cancel: &CancellationToken) -> AgentResult<()> {
        let mut cmd = Command::new(&self.supervisorctl_bin);
        cmd.args(verb);
        if let Some(program) = program {
            cmd.arg(program);
        }
        subprocess::run(cmd, SUPERVISOR_TIMEOUT, cancel, "supervisorctl").await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
