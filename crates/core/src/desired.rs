// SPDX-License-Identifier: MIT

//! The desired-state data model fetched from the control plane (spec.md §3).
//!
//! These are plain value records: the authoritative store is on disk and in
//! the control plane, not in any shared in-memory graph.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The snapshot the control plane returns for a node. Immutable within one
/// reconciliation cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DesiredState {
    pub tenants: Vec<DesiredTenant>,
    pub databases: Vec<DesiredDatabase>,
    pub kv_instances: Vec<DesiredKvInstance>,
    pub s3_buckets: Vec<DesiredS3Bucket>,
    pub fqdn_mappings: Vec<DesiredFqdnMapping>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesiredTenant {
    pub id: String,
    pub name: String,
    pub uid: u32,
    pub ssh_enabled: bool,
    pub sftp_enabled: bool,
    /// Disk quota in bytes, if the tenant has one configured.
    pub quota_bytes: Option<u64>,
    pub webroots: Vec<DesiredWebroot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeKind {
    Static,
    Php,
    Node,
    Python,
    Ruby,
}

impl RuntimeKind {
    pub fn label(&self) -> &'static str {
        match self {
            RuntimeKind::Static => "static",
            RuntimeKind::Php => "php",
            RuntimeKind::Node => "node",
            RuntimeKind::Python => "python",
            RuntimeKind::Ruby => "ruby",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesiredWebroot {
    pub id: String,
    pub name: String,
    pub runtime: RuntimeKind,
    pub runtime_version: Option<String>,
    /// Semi-structured runtime config (e.g. PHP-FPM pool tuning).
    #[serde(default)]
    pub runtime_config: serde_json::Value,
    pub public_subfolder: Option<String>,
    pub fqdns: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesiredDatabase {
    pub name: String,
    pub users: Vec<DesiredUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesiredUser {
    pub name: String,
    pub password: String,
    pub privileges: Vec<String>,
    #[serde(default)]
    pub access_cidrs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesiredKvInstance {
    pub name: String,
    pub port: u16,
    pub max_memory_bytes: u64,
    pub users: Vec<DesiredKvUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesiredKvUser {
    pub name: String,
    pub password: String,
    pub command_classes: Vec<String>,
    pub key_pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesiredS3Bucket {
    pub name: String,
    pub tenant_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesiredFqdnMapping {
    pub fqdn: String,
    pub backend: String,
}
