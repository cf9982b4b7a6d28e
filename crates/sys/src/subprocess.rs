// SPDX-License-Identifier: MIT

//! Subprocess execution with a timeout and cooperative cancellation.
//!
//! Every manager's "internal" error (spec.md §7) that originates from a
//! subprocess carries that subprocess's captured combined output. This
//! module is the only place `tokio::process::Command` is spawned from.

use nodeagent_core::{AgentError, AgentResult};
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Default per-subprocess timeout. Individual callers may override by
/// passing a longer timeout for known-slow operations (e.g. `pkill` +
/// user-removal polling).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Run `cmd` to completion, enforcing `timeout` and aborting early if
/// `cancel` fires. On a non-zero exit, returns `AgentError::Internal` with
/// the captured stdout+stderr attached.
pub async fn run(
    mut cmd: Command,
    timeout: Duration,
    cancel: &CancellationToken,
    label: &str,
) -> AgentResult<std::process::Output> {
    cmd.kill_on_drop(true);

    let output = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            warn!(label, "subprocess cancelled before completion");
            return Err(AgentError::internal(format!("{label}: cancelled")));
        }
        result = tokio::time::timeout(timeout, cmd.output()) => result,
    };

    let output = match output {
        Ok(Ok(output)) => output,
        Ok(Err(io_err)) => {
            return Err(AgentError::internal(format!("{label}: failed to spawn: {io_err}")));
        }
        Err(_elapsed) => {
            return Err(AgentError::internal(format!(
                "{label}: timed out after {:?}",
                timeout
            )));
        }
    };

    if !output.status.success() {
        let combined = combine(&output);
        return Err(AgentError::internal_with_output(
            format!("{label}: exited with {}", output.status),
            combined,
        ));
    }

    info!(label, "subprocess completed");
    Ok(output)
}

fn combine(output: &std::process::Output) -> String {
    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
        if !combined.is_empty() {
            combined.push('\n');
        }
        combined.push_str(&stderr);
    }
    combined.trim().to_string()
}

/// Retry a fallible async closure up to `attempts` times with a fixed
/// `backoff` between attempts, short-circuiting on cancellation. Used by
/// the tenant manager's UID-reclamation poll (spec.md §4.2.1, §5: ten
/// attempts at 500ms).
pub async fn run_with_retry<F, Fut, T>(
    attempts: usize,
    backoff: Duration,
    cancel: &CancellationToken,
    mut body: F,
) -> AgentResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = AgentResult<Option<T>>>,
{
    for attempt in 0..attempts {
        if cancel.is_cancelled() {
            return Err(AgentError::internal("retry loop cancelled"));
        }
        if let Some(value) = body().await? {
            return Ok(value);
        }
        if attempt + 1 < attempts {
            tokio::select! {
                _ = tokio::time::sleep(backoff) => {}
                _ = cancel.cancelled() => {
                    return Err(AgentError::internal("retry loop cancelled"));
                }
            }
        }
    }
    Err(AgentError::internal(format!(
        "condition not satisfied after {attempts} attempts"
    )))
}

/// Send `signal` (e.g. `"TERM"`, `"HUP"`) to all processes matching `name`
/// by process name, used by the direct service-controller variant
/// (spec.md §4.1) when no init system is available to target a unit.
pub async fn signal_by_name(
    name: &str,
    signal: &str,
    cancel: &CancellationToken,
) -> AgentResult<()> {
    let mut cmd = Command::new("pkill");
    cmd.args([format!("-{signal}"), "-f".to_string(), name.to_string()]);
    cmd.kill_on_drop(true);

    let output = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(AgentError::internal("pkill: cancelled")),
        result = tokio::time::timeout(DEFAULT_TIMEOUT, cmd.output()) => result,
    };

    let output = output
        .map_err(|_| AgentError::internal("pkill: timed out"))?
        .map_err(|e| AgentError::internal(format!("pkill: failed to spawn: {e}")))?;

    // pkill exits 1 when no process matched the name; that is not a
    // failure for our purposes (there was simply nothing to signal).
    match output.status.code() {
        Some(0) | Some(1) => Ok(()),
        _ => Err(AgentError::internal_with_output(
            format!("pkill {name}: exited with {}", output.status),
            combine(&output),
        )),
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
