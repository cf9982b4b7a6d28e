// SPDX-License-Identifier: MIT

//! Cron Manager (spec.md §4.2.7): translates a 5-field cron expression into
//! an init-system calendar expression, then writes and enables a oneshot
//! `.service` + `.timer` pair.

use nodeagent_core::{validate, AgentError, AgentResult};
use nodeagent_svc::ServiceController;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const DAY_ABBREVIATIONS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

pub struct CronManager {
    unit_root: PathBuf,
    controller: Arc<dyn ServiceController>,
}

impl CronManager {
    pub fn new(unit_root: impl Into<PathBuf>, controller: Arc<dyn ServiceController>) -> Self {
        Self {
            unit_root: unit_root.into(),
            controller,
        }
    }

    fn unit_name(&self, tenant: &str, job: &str) -> String {
        format!("cron-{tenant}-{job}")
    }

    pub async fn converge(
        &self,
        tenant: &str,
        job: &str,
        cron_expr: &str,
        command: &str,
        memory_max: &str,
        allowed_rw_paths: &[String],
        cancel: &CancellationToken,
    ) -> AgentResult<()> {
        validate::validate_name("tenant name", tenant)?;
        validate::validate_name("cron job name", job)?;
        let calendar = cron_to_calendar(cron_expr)?;

        let name = self.unit_name(tenant, job);
        let service_path = self.unit_root.join(format!("{name}.service"));
        let timer_path = self.unit_root.join(format!("{name}.timer"));

        let rw_paths = allowed_rw_paths.join(" ");
        let service = format!(
            "[Unit]\nDescription=cron job {job} for {tenant}\n\n\
             [Service]\nType=oneshot\nUser={tenant}\n\
             ExecStart={command}\nMemoryMax={memory_max}\n\
             ReadWritePaths={rw_paths}\nProtectSystem=strict\n"
        );
        let timer = format!(
            "[Unit]\nDescription=timer for cron job {job} ({tenant})\n\n\
             [Timer]\nOnCalendar={calendar}\nPersistent=true\nRandomizedDelaySec=30\n\n\
             [Install]\nWantedBy=timers.target\n"
        );

        tokio::fs::create_dir_all(&self.unit_root)
            .await
            .map_err(|e| AgentError::internal(format!("creating {}: {e}", self.unit_root.display())))?;
        tokio::fs::write(&service_path, service)
            .await
            .map_err(|e| AgentError::internal(format!("writing {}: {e}", service_path.display())))?;
        tokio::fs::write(&timer_path, timer)
            .await
            .map_err(|e| AgentError::internal(format!("writing {}: {e}", timer_path.display())))?;

        self.controller.daemon_reload(cancel).await?;
        self.controller.start(&format!("{name}.timer"), cancel).await
    }

    pub async fn remove(&self, tenant: &str, job: &str, cancel: &CancellationToken) -> AgentResult<()> {
        let name = self.unit_name(tenant, job);
        self.controller.stop(&format!("{name}.timer"), cancel).await.ok();
        for suffix in ["service", "timer"] {
            let path = self.unit_root.join(format!("{name}.{suffix}"));
            if path.exists() {
                tokio::fs::remove_file(&path)
                    .await
                    .map_err(|e| AgentError::internal(format!("removing {}: {e}", path.display())))?;
            }
        }
        self.controller.daemon_reload(cancel).await
    }

    /// Stops, disables, and removes every cron job belonging to `tenant`
    /// (`cron-{tenant}-*`), used when reclaiming a stale UID or name
    /// (spec.md §4.2.1), where the caller knows only the tenant name and not
    /// the individual job names still scheduled.
    pub async fn remove_all_for_tenant(&self, tenant: &str, cancel: &CancellationToken) -> AgentResult<()> {
        let prefix = format!("cron-{tenant}-");
        if !self.unit_root.is_dir() {
            return Ok(());
        }
        let mut entries = tokio::fs::read_dir(&self.unit_root)
            .await
            .map_err(|e| AgentError::internal(format!("reading {}: {e}", self.unit_root.display())))?;
        let mut jobs = std::collections::BTreeSet::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AgentError::internal(format!("reading {}: {e}", self.unit_root.display())))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            for suffix in [".service", ".timer"] {
                if let Some(stem) = name.strip_suffix(suffix) {
                    if stem.starts_with(&prefix) {
                        jobs.insert(stem.to_string());
                    }
                }
            }
        }
        for name in &jobs {
            let timer = format!("{name}.timer");
            self.controller.stop(&timer, cancel).await.ok();
            self.controller.disable(&timer, cancel).await.ok();
            for suffix in ["service", "timer"] {
                let path = self.unit_root.join(format!("{name}.{suffix}"));
                if path.exists() {
                    tokio::fs::remove_file(&path)
                        .await
                        .map_err(|e| AgentError::internal(format!("removing {}: {e}", path.display())))?;
                }
            }
        }
        if !jobs.is_empty() {
            self.controller.daemon_reload(cancel).await?;
        }
        Ok(())
    }
}

/// Translates a 5-field cron expression (`minute hour day-of-month month
/// day-of-week`) into an init-system calendar expression: numeric
/// day-of-week values become abbreviations, `*/N` step fields are
/// rewritten as `0/N`, and `-` ranges become `..` (systemd `OnCalendar`
/// reserves `-` as the date-component separator), per spec.md §4.2.7.
pub fn cron_to_calendar(expr: &str) -> AgentResult<String> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(AgentError::invalid_argument(format!(
            "cron expression must have 5 fields, got {}",
            fields.len()
        )));
    }
    let [minute, hour, dom, month, dow] = [fields[0], fields[1], fields[2], fields[3], fields[4]];

    let dow_calendar = rewrite_day_of_week(dow)?;
    let minute = rewrite_step(minute);
    let hour = rewrite_step(hour);
    let dom = rewrite_step(dom);
    let month = rewrite_step(month);

    Ok(format!("{dow_calendar} *-{month}-{dom} {hour}:{minute}:00"))
}

fn rewrite_step(field: &str) -> String {
    if let Some(step) = field.strip_prefix("*/") {
        format!("0/{step}")
    } else {
        field.replace('-', "..")
    }
}

fn rewrite_day_of_week(field: &str) -> AgentResult<String> {
    if field == "*" {
        return Ok("*".to_string());
    }
    let mut names = Vec::new();
    for part in field.split(',') {
        names.push(rewrite_day_of_week_part(part)?);
    }
    Ok(names.join(","))
}

/// A single comma-separated day-of-week part: either a bare number (`1`) or
/// a dash range (`1-5`). Each numeric endpoint is mapped to its abbreviation
/// independently; the dash becomes `..`, systemd's range separator.
fn rewrite_day_of_week_part(part: &str) -> AgentResult<String> {
    match part.split_once('-') {
        Some((start, end)) => Ok(format!("{}..{}", day_abbreviation(start)?, day_abbreviation(end)?)),
        None => day_abbreviation(part),
    }
}

fn day_abbreviation(num: &str) -> AgentResult<String> {
    let n: u32 = num
        .parse()
        .map_err(|_| AgentError::invalid_argument(format!("invalid day-of-week field: {num}")))?;
    Ok(DAY_ABBREVIATIONS[(n % 7) as usize].to_string())
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
