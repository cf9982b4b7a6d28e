// SPDX-License-Identifier: MIT

//! Database role routine (spec.md §4.4): create-or-converge over the
//! desired database collection.

use nodeagent_core::{DesiredDatabase, DriftEvent, DriftKind};
use tokio_util::sync::CancellationToken;

use super::RoleContext;

pub async fn reconcile_database(ctx: &mut RoleContext<'_>, databases: &[DesiredDatabase], cancel: &CancellationToken) -> Vec<DriftEvent> {
    let mut events = Vec::new();

    for database in databases {
        let _guard = ctx.locks.lock("database", &database.name, &database.name).await;

        let existed = match ctx.managers.database.exists(&database.name, cancel).await {
            Ok(existed) => existed,
            Err(e) => {
                events.push(ctx.reported(DriftKind::DbUser, database.name.as_str(), format!("exists check failed: {e}")));
                continue;
            }
        };

        if !existed && !ctx.may_fix() {
            events.push(ctx.reported(DriftKind::DbUser, database.name.as_str(), "database missing"));
            continue;
        }
        if !ctx.may_fix() {
            // Exists and breaker is closed-but-budget-exhausted, or open:
            // nothing to report, convergence is skipped to avoid a mutation.
            continue;
        }

        match ctx.managers.database.converge(database, cancel).await {
            Ok(()) => {
                if !existed {
                    events.push(ctx.auto_fixed(DriftKind::DbUser, database.name.as_str(), "created missing database and users"));
                    ctx.spend_fix();
                }
            }
            Err(e) => events.push(ctx.reported(DriftKind::DbUser, database.name.as_str(), format!("converge failed: {e}"))),
        }
    }

    events
}

#[cfg(test)]
#[path = "database_tests.rs"]
mod tests;
