// SPDX-License-Identifier: MIT

//! Webroot Manager (spec.md §4.2.2): the directory tree for a single
//! webroot under a tenant's `webroots/` subdirectory.

use nodeagent_core::{validate, AgentError, AgentResult};
use std::path::{Path, PathBuf};

pub struct WebrootManager {
    storage_root: PathBuf,
}

impl WebrootManager {
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
        }
    }

    fn webroot_dir(&self, tenant: &str, webroot: &str) -> PathBuf {
        self.storage_root.join(tenant).join("webroots").join(webroot)
    }

    pub async fn create(
        &self,
        tenant: &str,
        webroot: &str,
        uid: u32,
        public_subfolder: Option<&str>,
    ) -> AgentResult<()> {
        validate::validate_name("tenant name", tenant)?;
        validate::validate_name("webroot name", webroot)?;

        let dir = self.webroot_dir(tenant, webroot);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AgentError::internal(format!("creating {}: {e}", dir.display())))?;

        if let Some(sub) = public_subfolder {
            let public = dir.join(sub);
            tokio::fs::create_dir_all(&public)
                .await
                .map_err(|e| AgentError::internal(format!("creating {}: {e}", public.display())))?;
        }

        chown_recursive(&dir, uid, uid)?;
        Ok(())
    }

    pub fn exists(&self, tenant: &str, webroot: &str) -> bool {
        self.webroot_dir(tenant, webroot).is_dir()
    }

    /// Refuses paths shallower than three components under the storage root
    /// (`tenant/webroots/name`) per spec.md §4.2.2, to prevent accidental
    /// wipe of a whole tenant.
    pub async fn delete(&self, tenant: &str, webroot: &str) -> AgentResult<()> {
        validate::validate_name("tenant name", tenant)?;
        validate::validate_name("webroot name", webroot)?;

        let dir = self.webroot_dir(tenant, webroot);
        let relative = dir.strip_prefix(&self.storage_root).map_err(|_| {
            AgentError::invalid_argument(format!("{} does not fall under the storage root", dir.display()))
        })?;
        if relative.components().count() < 3 {
            return Err(AgentError::invalid_argument(format!(
                "refusing to delete shallow path {}",
                dir.display()
            )));
        }

        if dir.exists() {
            tokio::fs::remove_dir_all(&dir)
                .await
                .map_err(|e| AgentError::internal(format!("removing {}: {e}", dir.display())))?;
        }
        Ok(())
    }
}

fn chown_recursive(root: &Path, uid: u32, gid: u32) -> AgentResult<()> {
    let uid = nix::unistd::Uid::from_raw(uid);
    let gid = nix::unistd::Gid::from_raw(gid);
    for entry in walkdir(root)? {
        nix::unistd::chown(&entry, Some(uid), Some(gid))
            .map_err(|e| AgentError::internal(format!("chown {}: {e}", entry.display())))?;
    }
    Ok(())
}

fn walkdir(root: &Path) -> AgentResult<Vec<PathBuf>> {
    let mut out = vec![root.to_path_buf()];
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = std::fs::read_dir(&dir)
            .map_err(|e| AgentError::internal(format!("reading {}: {e}", dir.display())))?;
        for entry in entries {
            let entry = entry.map_err(|e| AgentError::internal(format!("reading {}: {e}", dir.display())))?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path.clone());
            }
            out.push(path);
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "webroot_tests.rs"]
mod tests;
