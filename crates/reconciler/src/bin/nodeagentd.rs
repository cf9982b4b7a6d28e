// SPDX-License-Identifier: MIT

//! `nodeagentd`: the node agent's entrypoint. Loads configuration, builds
//! the manager bundle and control-plane client, and runs the reconciler's
//! `RunLoop` until SIGTERM/SIGINT.

use std::path::PathBuf;
use std::sync::Arc;

use nodeagent_core::SystemClock;
use nodeagent_reconciler::{Config, Reconciler, RunLoop};
use nodeagent_svc::{build_controller, ServiceController};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "/etc/nodeagent/nodeagent.toml";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config_path = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!(path = %config_path.display(), error = %e, "failed to load configuration");
            std::process::exit(1);
        }
    };

    info!(node_id = %config.node_id, role = config.role.label(), "starting nodeagentd");

    let controller: Arc<dyn ServiceController> = Arc::from(build_controller(&config.service_controller_kind));
    let reconciler = Reconciler::new(config, controller);
    let run_loop = RunLoop::new(reconciler, SystemClock);

    let cancel = CancellationToken::new();
    tokio::spawn(wait_for_shutdown_signal(cancel.clone()));

    run_loop.run(cancel).await;
    info!("nodeagentd exiting");
}

async fn wait_for_shutdown_signal(cancel: CancellationToken) {
    let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(signal) => signal,
        Err(e) => {
            error!(error = %e, "failed to install SIGTERM handler");
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
    }

    cancel.cancel();
}
