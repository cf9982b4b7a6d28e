// SPDX-License-Identifier: MIT

//! Database Manager (spec.md §4.2.5): convergence of database instances,
//! users, grants, and user-host patterns for the relational engine.

use nodeagent_core::{validate, AgentError, AgentResult, DesiredDatabase, DesiredUser};
use nodeagent_sys::subprocess;
use std::net::IpAddr;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

const QUERY_TIMEOUT: Duration = Duration::from_secs(15);

/// Privilege names the control plane is allowed to request, matching the
/// engine's own grant vocabulary.
pub const PRIVILEGE_ALLOW_LIST: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "CREATE", "DROP", "ALTER", "INDEX", "EXECUTE",
];

pub struct DatabaseManager {
    admin_bin: String,
}

impl DatabaseManager {
    pub fn new(admin_bin: impl Into<String>) -> Self {
        Self {
            admin_bin: admin_bin.into(),
        }
    }

    async fn exec(&self, sql: &str, cancel: &CancellationToken) -> AgentResult<()> {
        let mut cmd = Command::new(&self.admin_bin);
        cmd.args(["-e", sql]);
        subprocess::run(cmd, QUERY_TIMEOUT, cancel, "db-exec").await?;
        Ok(())
    }

    /// Whether the database already exists, used by the reconciler to
    /// decide whether this cycle found drift worth reporting.
    pub async fn exists(&self, name: &str, cancel: &CancellationToken) -> AgentResult<bool> {
        validate::validate_name("database name", name)?;
        let mut cmd = Command::new(&self.admin_bin);
        cmd.args(["-N", "-e", &format!("SHOW DATABASES LIKE '{name}'")]);
        let output = subprocess::run(cmd, QUERY_TIMEOUT, cancel, "db-exists").await?;
        Ok(!String::from_utf8_lossy(&output.stdout).trim().is_empty())
    }

    /// Create-or-converge: the database, then each user and its grants.
    pub async fn converge(&self, database: &DesiredDatabase, cancel: &CancellationToken) -> AgentResult<()> {
        validate::validate_name("database name", &database.name)?;
        self.exec(
            &format!("CREATE DATABASE IF NOT EXISTS `{}`", database.name),
            cancel,
        )
        .await?;

        for user in &database.users {
            self.converge_user(&database.name, user, cancel).await?;
        }
        Ok(())
    }

    async fn converge_user(&self, database: &str, user: &DesiredUser, cancel: &CancellationToken) -> AgentResult<()> {
        validate::validate_name("database user", &user.name)?;
        for privilege in &user.privileges {
            if !PRIVILEGE_ALLOW_LIST.contains(&privilege.as_str()) {
                return Err(AgentError::invalid_argument(format!(
                    "privilege {privilege} is not in the allow-list"
                )));
            }
        }

        let hosts = if user.access_cidrs.is_empty() {
            vec!["localhost".to_string()]
        } else {
            user.access_cidrs
                .iter()
                .map(|cidr| host_pattern(cidr))
                .collect::<AgentResult<Vec<_>>>()?
        };

        for host in hosts {
            self.exec(
                &format!(
                    "CREATE USER IF NOT EXISTS '{}'@'{host}' IDENTIFIED BY '{}'",
                    user.name, user.password
                ),
                cancel,
            )
            .await?;
            let privileges = if user.privileges.is_empty() {
                "USAGE".to_string()
            } else {
                user.privileges.join(", ")
            };
            self.exec(
                &format!("GRANT {privileges} ON `{database}`.* TO '{}'@'{host}'", user.name),
                cancel,
            )
            .await?;
        }
        self.exec("FLUSH PRIVILEGES", cancel).await
    }
}

/// Relational engines express CIDR-derived host patterns natively: an IPv4
/// CIDR becomes a `%`-wildcard pattern, IPv6 keeps its CIDR suffix.
fn host_pattern(cidr: &str) -> AgentResult<String> {
    let (addr, prefix) = validate::validate_cidr("access cidr", cidr)?;
    match addr {
        IpAddr::V4(v4) => {
            if prefix == 32 {
                return Ok(v4.to_string());
            }
            let octets = v4.octets();
            let full_octets = (prefix / 8) as usize;
            let mut pattern: Vec<String> = octets[..full_octets].iter().map(|o| o.to_string()).collect();
            pattern.resize(4, "%".to_string());
            Ok(pattern.join("."))
        }
        IpAddr::V6(v6) => Ok(format!("{v6}/{prefix}")),
    }
}

#[cfg(test)]
#[path = "database_tests.rs"]
mod tests;
