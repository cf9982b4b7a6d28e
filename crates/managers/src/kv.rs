// SPDX-License-Identifier: MIT

//! KV Manager (spec.md §4.2.5): instance config, ACL entries, and the ACL
//! file for the in-memory KV store. Administration happens exclusively over
//! a per-instance Unix socket; there is no network auth path for local
//! management.

use nodeagent_core::{validate, AgentError, AgentResult, DesiredKvInstance};
use nodeagent_svc::ServiceController;
use nodeagent_sys::subprocess;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

const ADMIN_TIMEOUT: Duration = Duration::from_secs(15);
const LASTSAVE_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub const COMMAND_CLASS_ALLOW_LIST: &[&str] = &["READ", "WRITE", "ADMIN", "PUBSUB"];

pub struct KvManager {
    config_root: PathBuf,
    engine: String,
    cli_bin: String,
    controller: Arc<dyn ServiceController>,
}

impl KvManager {
    pub fn new(
        config_root: impl Into<PathBuf>,
        engine: impl Into<String>,
        cli_bin: impl Into<String>,
        controller: Arc<dyn ServiceController>,
    ) -> Self {
        Self {
            config_root: config_root.into(),
            engine: engine.into(),
            cli_bin: cli_bin.into(),
            controller,
        }
    }

    fn config_path(&self, name: &str) -> PathBuf {
        self.config_root.join(format!("{name}.conf"))
    }

    fn acl_path(&self, name: &str) -> PathBuf {
        self.config_root.join(format!("{name}.acl"))
    }

    pub fn socket_path(&self, name: &str) -> PathBuf {
        PathBuf::from(format!("/run/{}/{name}.sock", self.engine))
    }

    async fn admin_exec(&self, name: &str, args: &[&str], cancel: &CancellationToken) -> AgentResult<Vec<u8>> {
        let mut cmd = Command::new(&self.cli_bin);
        cmd.args(["-s", self.socket_path(name).to_string_lossy().as_ref()]);
        cmd.args(args);
        let output = subprocess::run(cmd, ADMIN_TIMEOUT, cancel, "kv-admin").await?;
        Ok(output.stdout)
    }

    /// Whether the instance config file already exists, used by the
    /// reconciler to decide whether this cycle found drift worth reporting.
    pub fn config_exists(&self, name: &str) -> bool {
        self.config_path(name).is_file()
    }

    pub async fn converge(&self, instance: &DesiredKvInstance, cancel: &CancellationToken) -> AgentResult<()> {
        validate::validate_name("kv instance name", &instance.name)?;

        tokio::fs::create_dir_all(&self.config_root)
            .await
            .map_err(|e| AgentError::internal(format!("creating {}: {e}", self.config_root.display())))?;

        let config_path = self.config_path(&instance.name);
        tokio::fs::write(&config_path, self.render_config(instance))
            .await
            .map_err(|e| AgentError::internal(format!("writing {}: {e}", config_path.display())))?;

        let acl_path = self.acl_path(&instance.name);
        tokio::fs::write(&acl_path, self.render_acl(instance)?)
            .await
            .map_err(|e| AgentError::internal(format!("writing {}: {e}", acl_path.display())))?;

        Ok(())
    }

    fn render_config(&self, instance: &DesiredKvInstance) -> String {
        format!(
            "port {port}\nmaxmemory {max_memory}\nunixsocket {socket}\naclfile {acl}\n",
            port = instance.port,
            max_memory = instance.max_memory_bytes,
            socket = self.socket_path(&instance.name).display(),
            acl = self.acl_path(&instance.name).display(),
        )
    }

    fn render_acl(&self, instance: &DesiredKvInstance) -> AgentResult<String> {
        let mut lines = String::new();
        for user in &instance.users {
            validate::validate_name("kv user name", &user.name)?;
            for class in &user.command_classes {
                if !COMMAND_CLASS_ALLOW_LIST.contains(&class.as_str()) {
                    return Err(AgentError::invalid_argument(format!(
                        "command class {class} is not in the allow-list"
                    )));
                }
            }
            let digest = password_digest(&user.password);
            let classes = command_class_rules(&user.command_classes);
            lines.push_str(&format!(
                "user {} on #{digest} ~{pattern} {classes}\n",
                user.name,
                pattern = user.key_pattern,
            ));
        }
        Ok(lines)
    }

    /// Busy-wait on LASTSAVE (spec.md §4.2.5): trigger a background save,
    /// poll until the save timestamp advances, then copy the snapshot to
    /// `dump_path`.
    pub async fn backup(&self, instance: &str, snapshot_path: &std::path::Path, dump_path: &std::path::Path, cancel: &CancellationToken) -> AgentResult<()> {
        let before = self.lastsave(instance, cancel).await?;
        self.admin_exec(instance, &["BGSAVE"], cancel).await?;
        loop {
            if cancel.is_cancelled() {
                return Err(AgentError::unavailable("backup cancelled while waiting on LASTSAVE"));
            }
            let after = self.lastsave(instance, cancel).await?;
            if after > before {
                break;
            }
            tokio::time::sleep(LASTSAVE_POLL_INTERVAL).await;
        }
        tokio::fs::copy(snapshot_path, dump_path)
            .await
            .map_err(|e| AgentError::internal(format!("copying snapshot to {}: {e}", dump_path.display())))?;
        Ok(())
    }

    async fn lastsave(&self, instance: &str, cancel: &CancellationToken) -> AgentResult<i64> {
        let out = self.admin_exec(instance, &["LASTSAVE"], cancel).await?;
        String::from_utf8_lossy(&out)
            .trim()
            .parse()
            .map_err(|_| AgentError::internal("LASTSAVE did not return an integer timestamp"))
    }

    /// Stop-copy-start restore: deletes any append-only artifact before
    /// restart so load resumes from the snapshot, per spec.md §4.2.5.
    pub async fn restore(
        &self,
        instance: &str,
        snapshot_src: &std::path::Path,
        data_dir: &std::path::Path,
        aof_path: &std::path::Path,
        cancel: &CancellationToken,
    ) -> AgentResult<()> {
        self.controller.stop(instance, cancel).await?;

        if aof_path.exists() {
            tokio::fs::remove_file(aof_path)
                .await
                .map_err(|e| AgentError::internal(format!("removing {}: {e}", aof_path.display())))?;
        }
        let dest = data_dir.join("dump.rdb");
        tokio::fs::copy(snapshot_src, &dest).await.map_err(|e| {
            AgentError::internal(format!(
                "copying {} to {}: {e}",
                snapshot_src.display(),
                dest.display()
            ))
        })?;

        self.controller.start(instance, cancel).await
    }
}

fn password_digest(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex(&hasher.finalize())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn command_class_rules(classes: &[String]) -> String {
    if classes.is_empty() {
        return "nocommands".to_string();
    }
    classes
        .iter()
        .map(|c| format!("+@{}", c.to_lowercase()))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
#[path = "kv_tests.rs"]
mod tests;
