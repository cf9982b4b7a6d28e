// SPDX-License-Identifier: MIT

//! HTTP Config Manager (spec.md §4.2.4): per-webroot/FQDN reverse-proxy
//! server blocks under `sites-enabled/`.

use nodeagent_core::{validate, AgentError, AgentResult, DesiredWebroot, RuntimeKind};
use nodeagent_svc::ServiceController;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use nodeagent_sys::subprocess;
use std::time::Duration;

const RELOAD_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpConfigManager {
    config_root: PathBuf,
    cert_root: PathBuf,
    node_name: String,
    shard_name: String,
    test_cmd: String,
    controller: Arc<dyn ServiceController>,
    engine_unit: String,
}

impl HttpConfigManager {
    pub fn new(
        config_root: impl Into<PathBuf>,
        cert_root: impl Into<PathBuf>,
        node_name: impl Into<String>,
        shard_name: impl Into<String>,
        test_cmd: impl Into<String>,
        engine_unit: impl Into<String>,
        controller: Arc<dyn ServiceController>,
    ) -> Self {
        Self {
            config_root: config_root.into(),
            cert_root: cert_root.into(),
            node_name: node_name.into(),
            shard_name: shard_name.into(),
            test_cmd: test_cmd.into(),
            controller,
            engine_unit: engine_unit.into(),
        }
    }

    fn sites_enabled(&self) -> PathBuf {
        self.config_root.join("sites-enabled")
    }

    fn config_filename(tenant: &str, webroot: &str) -> String {
        format!("{tenant}_{webroot}.conf")
    }

    fn config_path(&self, tenant: &str, webroot: &str) -> PathBuf {
        self.sites_enabled().join(Self::config_filename(tenant, webroot))
    }

    pub fn exists(&self, tenant: &str, webroot: &str) -> bool {
        self.config_path(tenant, webroot).is_file()
    }

    fn has_cert(&self, fqdn: &str) -> bool {
        let dir = self.cert_root.join(fqdn);
        dir.join("fullchain.pem").exists() && dir.join("privkey.pem").exists()
    }

    fn backend_block(&self, tenant: &str, webroot: &DesiredWebroot) -> String {
        match webroot.runtime {
            RuntimeKind::Static => {
                let root = format!("{tenant}/webroots/{}", webroot.name);
                format!("root {root};\ntry_files $uri $uri/ =404;\n")
            }
            RuntimeKind::Php => {
                let version = webroot.runtime_version.as_deref().unwrap_or("8.3");
                let socket = format!("/run/php/{version}/{tenant}-{}.sock", webroot.name);
                format!(
                    "fastcgi_pass unix:{socket};\n\
                     fastcgi_param SCRIPT_FILENAME $document_root$fastcgi_script_name;\n\
                     include fastcgi_params;\n"
                )
            }
            RuntimeKind::Node => {
                let port = nodeagent_core::hashing::compute_webroot_port(tenant, &webroot.name);
                format!("proxy_pass http://127.0.0.1:{port};\n")
            }
            RuntimeKind::Python | RuntimeKind::Ruby => {
                let engine = if webroot.runtime == RuntimeKind::Python { "gunicorn" } else { "puma" };
                let socket = format!("/run/{engine}/{tenant}-{}.sock", webroot.name);
                format!("proxy_pass http://unix:{socket}:;\n")
            }
        }
    }

    fn render(&self, tenant: &str, webroot: &DesiredWebroot) -> String {
        let backend = self.backend_block(tenant, webroot);
        let mut blocks = String::new();
        for fqdn in &webroot.fqdns {
            let tls = self.has_cert(fqdn);
            let listen = if tls { "listen 443 ssl;" } else { "listen 80;" };
            let tls_lines = if tls {
                format!(
                    "ssl_certificate {cert_root}/{fqdn}/fullchain.pem;\n\
                     ssl_certificate_key {cert_root}/{fqdn}/privkey.pem;\n",
                    cert_root = self.cert_root.display(),
                )
            } else {
                String::new()
            };
            blocks.push_str(&format!(
                "server {{\n{listen}\nserver_name {fqdn};\n{tls_lines}\
                 add_header X-Node-Name \"{node}\" always;\n\
                 add_header X-Shard-Name \"{shard}\" always;\n\
                 location / {{\n{backend}}}\n}}\n",
                node = self.node_name,
                shard = self.shard_name,
            ));
        }
        blocks
    }

    pub async fn create(&self, tenant: &str, webroot: &DesiredWebroot) -> AgentResult<()> {
        validate::validate_name("tenant name", tenant)?;
        validate::validate_name("webroot name", &webroot.name)?;

        let dir = self.sites_enabled();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AgentError::internal(format!("creating {}: {e}", dir.display())))?;

        let path = self.config_path(tenant, &webroot.name);
        tokio::fs::write(&path, self.render(tenant, webroot))
            .await
            .map_err(|e| AgentError::internal(format!("writing {}: {e}", path.display())))?;
        Ok(())
    }

    pub async fn remove(&self, tenant: &str, webroot: &str) -> AgentResult<()> {
        let path = self.config_path(tenant, webroot);
        if path.exists() {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| AgentError::internal(format!("removing {}: {e}", path.display())))?;
        }
        Ok(())
    }

    /// Read-only enumeration of config files under `sites-enabled/` whose
    /// `{tenant}_{webroot}` stem is not present in `expected`. Performs no
    /// mutation, used by the reconciler to report orphans it is not
    /// currently allowed to remove (breaker open or fix budget exhausted).
    pub async fn list_orphans(&self, expected: &HashSet<String>) -> AgentResult<Vec<String>> {
        let dir = self.sites_enabled();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut orphans = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| AgentError::internal(format!("reading {}: {e}", dir.display())))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AgentError::internal(format!("reading {}: {e}", dir.display())))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(stem) = name.strip_suffix(".conf") else { continue };
            if !expected.contains(stem) {
                orphans.push(name);
            }
        }
        Ok(orphans)
    }

    /// Removes config files under `sites-enabled/` whose `{tenant}_{webroot}`
    /// stem is not present in `expected`, up to `max_removals` files.
    /// Returns `(removed, skipped)`: `removed` are the filenames actually
    /// deleted; `skipped` are additional orphans found once the budget ran
    /// out, left untouched on disk. Per spec.md §3/§8, a cycle may apply at
    /// most `max_fixes` mutations, so this never deletes more than its
    /// caller's remaining budget allows.
    pub async fn remove_orphans(&self, expected: &HashSet<String>, max_removals: usize) -> AgentResult<(Vec<String>, Vec<String>)> {
        let orphans = self.list_orphans(expected).await?;
        let (to_remove, skipped) = if orphans.len() > max_removals {
            orphans.split_at(max_removals)
        } else {
            (orphans.as_slice(), &[][..])
        };

        let mut removed = Vec::new();
        for name in to_remove {
            let path = self.sites_enabled().join(name);
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| AgentError::internal(format!("removing {}: {e}", path.display())))?;
            removed.push(name.clone());
        }
        Ok((removed, skipped.to_vec()))
    }

    /// Test-then-reload sequence via the service controller, per spec.md
    /// §4.2.4.
    pub async fn reload(&self, cancel: &CancellationToken) -> AgentResult<()> {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", &self.test_cmd]);
        subprocess::run(cmd, RELOAD_TIMEOUT, cancel, "http-config-test").await?;
        self.controller.reload(&self.engine_unit, cancel).await
    }
}

#[cfg(test)]
#[path = "http_config_tests.rs"]
mod tests;
