// SPDX-License-Identifier: MIT

//! Tenant Manager (spec.md §4.2.1): Linux user accounts, the tenant
//! directory tree on the shared filesystem, and the per-tenant log
//! directory.

use crate::runtime::PhpRuntimeManager;
use crate::{CronManager, DaemonManager};
use nodeagent_core::{validate, AgentError, AgentResult};
use nodeagent_svc::ServiceController;
use nodeagent_sys::{mount, quota, subprocess};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Number of `pkill -9` + user-removal retries while reclaiming a stale UID
/// or name, per spec.md §4.2.1.
const RECLAIM_ATTEMPTS: usize = 10;
const RECLAIM_BACKOFF: Duration = Duration::from_millis(500);
const USER_OP_TIMEOUT: Duration = Duration::from_secs(15);

/// Supplementary group gating shell access, per the group-membership
/// strategy chosen for SSH/SFTP (see DESIGN.md).
const SSH_GROUP: &str = "ssh-enabled";
const SFTP_GROUP: &str = "sftp-only";

pub struct TenantManager {
    storage_root: PathBuf,
    log_root: PathBuf,
    /// Expected `statfs(2)` magic number of the shared filesystem at
    /// `storage_root`.
    mount_magic: i64,
    controller: Arc<dyn ServiceController>,
    /// Own instances of the collaborators needed to clean up a reclaimed
    /// tenant's managed services (spec.md §4.2.1): a stale account's pool
    /// config, supervisor programs, and cron timers are addressed by name
    /// only, so this manager enumerates and removes them directly rather
    /// than routing through the per-webroot/per-job APIs the reconciler
    /// uses during normal convergence.
    php: PhpRuntimeManager,
    daemon: DaemonManager,
    cron: CronManager,
}

impl TenantManager {
    pub fn new(
        storage_root: impl Into<PathBuf>,
        log_root: impl Into<PathBuf>,
        mount_magic: i64,
        controller: Arc<dyn ServiceController>,
        php_pool_root: impl Into<PathBuf>,
        supervisor_config_root: impl Into<PathBuf>,
        unit_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            storage_root: storage_root.into(),
            log_root: log_root.into(),
            mount_magic,
            php: PhpRuntimeManager::new(php_pool_root, controller.clone()),
            daemon: DaemonManager::new(supervisor_config_root, "supervisorctl"),
            cron: CronManager::new(unit_root, controller.clone()),
            controller,
        }
    }

    fn tenant_dir(&self, name: &str) -> PathBuf {
        self.storage_root.join(name)
    }

    fn log_dir(&self, name: &str) -> PathBuf {
        self.log_root.join(name)
    }

    fn guard_mount(&self) -> AgentResult<()> {
        mount::check_mount(&self.storage_root, self.mount_magic)
    }

    /// Whether the OS user account already exists, used by the reconciler
    /// to decide whether Create is needed this cycle.
    pub async fn exists(&self, name: &str, cancel: &CancellationToken) -> AgentResult<bool> {
        validate::validate_name("tenant name", name)?;
        user_exists(name, cancel).await
    }

    /// Create the tenant if it does not exist, reclaiming a stale UID or
    /// name first. Equivalent to Update-if-exists: safe to call repeatedly.
    pub async fn create(
        &self,
        name: &str,
        uid: u32,
        quota_bytes: Option<u64>,
        ssh_enabled: bool,
        sftp_enabled: bool,
        cancel: &CancellationToken,
    ) -> AgentResult<()> {
        validate::validate_name("tenant name", name)?;
        self.guard_mount()?;

        if let Some(occupant) = uid_owner(uid, cancel).await? {
            if occupant != name {
                warn!(uid, occupant = %occupant, tenant = name, "reclaiming stale uid");
                self.purge_account(&occupant, cancel).await?;
            }
        } else if user_exists(name, cancel).await? {
            warn!(tenant = name, "tenant name exists under a different uid, reclaiming");
            self.purge_account(name, cancel).await?;
        }

        if !user_exists(name, cancel).await? {
            let mut cmd = Command::new("useradd");
            cmd.args([
                "--uid",
                &uid.to_string(),
                "--shell",
                "/usr/sbin/nologin",
                "--no-create-home",
                name,
            ]);
            subprocess::run(cmd, USER_OP_TIMEOUT, cancel, "useradd").await?;
            lock_account(name, cancel).await.ok();
        }

        self.ensure_layout(name, uid, quota_bytes).await?;
        self.sync_group(name, SSH_GROUP, ssh_enabled, cancel).await?;
        self.sync_group(name, SFTP_GROUP, sftp_enabled, cancel).await?;
        Ok(())
    }

    /// Adds or removes `name` from `group` so membership matches `enabled`.
    /// Idempotent: `gpasswd` removal of a non-member is tolerated.
    async fn sync_group(
        &self,
        name: &str,
        group: &str,
        enabled: bool,
        cancel: &CancellationToken,
    ) -> AgentResult<()> {
        if enabled {
            let mut cmd = Command::new("usermod");
            cmd.args(["-aG", group, name]);
            subprocess::run(cmd, USER_OP_TIMEOUT, cancel, "usermod-group").await?;
        } else {
            let mut cmd = Command::new("gpasswd");
            cmd.args(["-d", name, group]);
            subprocess::run(cmd, USER_OP_TIMEOUT, cancel, "gpasswd-remove").await.ok();
        }
        Ok(())
    }

    async fn ensure_layout(&self, name: &str, uid: u32, quota_bytes: Option<u64>) -> AgentResult<()> {
        let root = self.tenant_dir(name);
        make_dir(&root, 0o755, 0, 0).await?;
        let home = root.join("home");
        make_dir(&home, 0o700, uid, uid).await?;
        let webroots = root.join("webroots");
        make_dir(&webroots, 0o751, uid, uid).await?;
        let tmp = root.join("tmp");
        make_dir(&tmp, 0o1777, uid, uid).await?;

        let logs = self.log_dir(name);
        make_dir(&logs, 0o750, uid, uid).await?;

        if let Some(bytes) = quota_bytes {
            quota::set_quota_xattr_best_effort(&home, bytes);
        }
        Ok(())
    }

    pub async fn suspend(&self, name: &str, uid: u32, cancel: &CancellationToken) -> AgentResult<()> {
        validate::validate_name("tenant name", name)?;
        let mut cmd = Command::new("usermod");
        cmd.args(["--lock", name]);
        subprocess::run(cmd, USER_OP_TIMEOUT, cancel, "usermod-lock").await?;
        kill_uid(uid, cancel).await
    }

    pub async fn unsuspend(&self, name: &str, cancel: &CancellationToken) -> AgentResult<()> {
        validate::validate_name("tenant name", name)?;
        let mut cmd = Command::new("usermod");
        cmd.args(["--unlock", name]);
        subprocess::run(cmd, USER_OP_TIMEOUT, cancel, "usermod-unlock").await?;
        Ok(())
    }

    pub async fn delete(&self, name: &str, uid: u32, cancel: &CancellationToken) -> AgentResult<()> {
        validate::validate_name("tenant name", name)?;
        self.guard_mount()?;
        self.purge_account(name, cancel).await?;

        let root = self.tenant_dir(name);
        for mountpoint in bind_mounts_under(&root, cancel).await? {
            let mut cmd = Command::new("umount");
            cmd.args(["--lazy", mountpoint.to_string_lossy().as_ref()]);
            subprocess::run(cmd, USER_OP_TIMEOUT, cancel, "umount").await?;
        }

        if root.exists() {
            tokio::fs::remove_dir_all(&root)
                .await
                .map_err(|e| AgentError::internal(format!("removing {}: {e}", root.display())))?;
        }
        let logs = self.log_dir(name);
        if logs.exists() {
            tokio::fs::remove_dir_all(&logs)
                .await
                .map_err(|e| AgentError::internal(format!("removing {}: {e}", logs.display())))?;
        }
        Ok(())
    }

    /// Stop the account's managed services, then kill and remove it,
    /// retrying until the kernel has reclaimed the process table entries.
    /// Used both for delete and for reclaiming a stale UID/name.
    async fn purge_account(&self, name: &str, cancel: &CancellationToken) -> AgentResult<()> {
        self.stop_managed_services(name, cancel).await?;

        if let Some(uid) = name_uid(name, cancel).await? {
            kill_uid(uid, cancel).await?;
        }

        for attempt in 0..RECLAIM_ATTEMPTS {
            let mut cmd = Command::new("userdel");
            cmd.args(["--force", "--remove", name]);
            match subprocess::run(cmd, USER_OP_TIMEOUT, cancel, "userdel").await {
                Ok(_) => return Ok(()),
                Err(_) if !user_exists(name, cancel).await? => return Ok(()),
                Err(e) if attempt + 1 == RECLAIM_ATTEMPTS => return Err(e),
                Err(_) => tokio::time::sleep(RECLAIM_BACKOFF).await,
            }
        }
        Ok(())
    }

    async fn stop_managed_services(&self, name: &str, cancel: &CancellationToken) -> AgentResult<()> {
        // Per spec.md §4.2.1: remove per-user reverse-proxy runtime pool
        // configs and restart the parent service, stop and remove
        // supervisor programs named `daemon-{username}-*`, stop and disable
        // timer units named `cron-{username}-*`. Best-effort: a reclaim must
        // still proceed to kill-and-userdel even if one of these lags, since
        // that final step is what actually frees the uid.
        self.php.remove_for_tenant(name, cancel).await.ok();
        self.daemon.remove_all_for_tenant(name, cancel).await.ok();
        self.cron.remove_all_for_tenant(name, cancel).await.ok();
        info!(tenant = name, "stopped managed services ahead of account purge");
        Ok(())
    }
}

async fn make_dir(path: &Path, mode: u32, uid: u32, gid: u32) -> AgentResult<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| AgentError::internal(format!("creating {}: {e}", path.display())))?;
    set_mode(path, mode)?;
    if uid != 0 || gid != 0 {
        set_owner(path, uid, gid)?;
    }
    Ok(())
}

fn set_mode(path: &Path, mode: u32) -> AgentResult<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .map_err(|e| AgentError::internal(format!("chmod {}: {e}", path.display())))
}

fn set_owner(path: &Path, uid: u32, gid: u32) -> AgentResult<()> {
    nix::unistd::chown(
        path,
        Some(nix::unistd::Uid::from_raw(uid)),
        Some(nix::unistd::Gid::from_raw(gid)),
    )
    .map_err(|e| AgentError::internal(format!("chown {}: {e}", path.display())))
}

async fn user_exists(name: &str, cancel: &CancellationToken) -> AgentResult<bool> {
    let mut cmd = Command::new("id");
    cmd.args(["-u", name]);
    match subprocess::run(cmd, USER_OP_TIMEOUT, cancel, "id").await {
        Ok(_) => Ok(true),
        Err(e) if e.code() == "internal" => Ok(false),
        Err(e) => Err(e),
    }
}

/// Looks up the username currently occupying `uid`, if any.
async fn uid_owner(uid: u32, cancel: &CancellationToken) -> AgentResult<Option<String>> {
    let mut cmd = Command::new("id");
    cmd.args(["-un", &uid.to_string()]);
    match subprocess::run(cmd, USER_OP_TIMEOUT, cancel, "id-un").await {
        Ok(output) => Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string())),
        Err(e) if e.code() == "internal" => Ok(None),
        Err(e) => Err(e),
    }
}

async fn name_uid(name: &str, cancel: &CancellationToken) -> AgentResult<Option<u32>> {
    let mut cmd = Command::new("id");
    cmd.args(["-u", name]);
    match subprocess::run(cmd, USER_OP_TIMEOUT, cancel, "id-u").await {
        Ok(output) => Ok(String::from_utf8_lossy(&output.stdout).trim().parse().ok()),
        Err(e) if e.code() == "internal" => Ok(None),
        Err(e) => Err(e),
    }
}

async fn kill_uid(uid: u32, cancel: &CancellationToken) -> AgentResult<()> {
    // pkill exits 1 when no process matched the uid; that is not a failure
    // worth propagating during account cleanup.
    let mut cmd = Command::new("pkill");
    cmd.args(["-9", "-u", &uid.to_string()]);
    subprocess::run(cmd, USER_OP_TIMEOUT, cancel, "pkill").await.ok();
    Ok(())
}

async fn lock_account(name: &str, cancel: &CancellationToken) -> AgentResult<()> {
    let mut cmd = Command::new("usermod");
    cmd.args(["--lock", name]);
    subprocess::run(cmd, USER_OP_TIMEOUT, cancel, "usermod-lock").await?;
    Ok(())
}

/// Bind mounts found under `root` in the system mount table, deepest first
/// so child mounts unmount before their parents.
async fn bind_mounts_under(root: &Path, cancel: &CancellationToken) -> AgentResult<Vec<PathBuf>> {
    let mut cmd = Command::new("findmnt");
    cmd.args(["--raw", "--noheadings", "--output", "TARGET"]);
    let output = match subprocess::run(cmd, USER_OP_TIMEOUT, cancel, "findmnt").await {
        Ok(output) => output,
        Err(_) => return Ok(Vec::new()),
    };
    let mut hits: Vec<PathBuf> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(PathBuf::from)
        .filter(|p| p.starts_with(root))
        .collect();
    hits.sort_by(|a, b| b.as_os_str().len().cmp(&a.as_os_str().len()));
    Ok(hits)
}

#[cfg(test)]
#[path = "tenant_tests.rs"]
mod tests;
