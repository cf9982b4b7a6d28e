// SPDX-License-Identifier: MIT

//! Reconciler configuration: loaded from a TOML file on disk, with
//! `CORE_API_TOKEN` overriding the configured bearer token (spec.md §6).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Environment variable that overrides the configured control-plane token.
pub const TOKEN_ENV_VAR: &str = "CORE_API_TOKEN";

/// The role this node serves, selecting which reconciler role routine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Web,
    Database,
    Kv,
    Lb,
    Storage,
}

impl NodeRole {
    pub fn label(&self) -> &'static str {
        match self {
            NodeRole::Web => "web",
            NodeRole::Database => "database",
            NodeRole::Kv => "kv",
            NodeRole::Lb => "lb",
            NodeRole::Storage => "storage",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Raw, on-disk shape. Every field here has a matching field on [`Config`];
/// kept separate so defaults and derived fields (durations from seconds,
/// the env-overridable token) live in one place below.
#[derive(Debug, Deserialize)]
struct RawConfig {
    node_id: String,
    cluster_id: String,
    shard_index: u16,
    shard_name: String,
    role: NodeRole,
    control_plane_url: String,
    api_token: String,
    #[serde(default = "default_tick_interval_secs")]
    tick_interval_secs: u64,
    #[serde(default = "default_max_fixes")]
    max_fixes: u32,
    #[serde(default = "default_circuit_threshold")]
    circuit_threshold: usize,
    storage_root: PathBuf,
    log_root: PathBuf,
    mount_magic: i64,
    http_config_root: PathBuf,
    cert_root: PathBuf,
    php_pool_root: PathBuf,
    unit_root: PathBuf,
    supervisor_config_root: PathBuf,
    kv_config_root: PathBuf,
    kv_engine: String,
    db_admin_bin: String,
    service_controller_kind: String,
    storage_metadata_root: PathBuf,
    lb_socket_path: PathBuf,
    lb_map_path: PathBuf,
}

fn default_tick_interval_secs() -> u64 {
    60
}

fn default_max_fixes() -> u32 {
    50
}

fn default_circuit_threshold() -> usize {
    30
}

/// Fully-resolved reconciler configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub node_id: String,
    pub cluster_id: String,
    pub shard_index: u16,
    pub shard_name: String,
    pub role: NodeRole,
    pub control_plane_url: String,
    pub api_token: String,
    pub tick_interval: Duration,
    pub max_fixes: u32,
    pub circuit_threshold: usize,
    pub storage_root: PathBuf,
    pub log_root: PathBuf,
    pub mount_magic: i64,
    pub http_config_root: PathBuf,
    pub cert_root: PathBuf,
    pub php_pool_root: PathBuf,
    pub unit_root: PathBuf,
    pub supervisor_config_root: PathBuf,
    pub kv_config_root: PathBuf,
    pub kv_engine: String,
    pub db_admin_bin: String,
    pub service_controller_kind: String,
    pub storage_metadata_root: PathBuf,
    pub lb_socket_path: PathBuf,
    pub lb_map_path: PathBuf,
}

impl Config {
    /// Load configuration from a TOML file at `path`, applying the
    /// `CORE_API_TOKEN` environment override if set.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, path)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let api_token = std::env::var(TOKEN_ENV_VAR).unwrap_or(raw.api_token);

        Ok(Self {
            node_id: raw.node_id,
            cluster_id: raw.cluster_id,
            shard_index: raw.shard_index,
            shard_name: raw.shard_name,
            role: raw.role,
            control_plane_url: raw.control_plane_url,
            api_token,
            tick_interval: Duration::from_secs(raw.tick_interval_secs),
            max_fixes: raw.max_fixes,
            circuit_threshold: raw.circuit_threshold,
            storage_root: raw.storage_root,
            log_root: raw.log_root,
            mount_magic: raw.mount_magic,
            http_config_root: raw.http_config_root,
            cert_root: raw.cert_root,
            php_pool_root: raw.php_pool_root,
            unit_root: raw.unit_root,
            supervisor_config_root: raw.supervisor_config_root,
            kv_config_root: raw.kv_config_root,
            kv_engine: raw.kv_engine,
            db_admin_bin: raw.db_admin_bin,
            service_controller_kind: raw.service_controller_kind,
            storage_metadata_root: raw.storage_metadata_root,
            lb_socket_path: raw.lb_socket_path,
            lb_map_path: raw.lb_map_path,
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
