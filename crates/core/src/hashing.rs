// SPDX-License-Identifier: MIT

//! Deterministic derivations used by the tenant-ULA and runtime managers.
//!
//! spec.md §8: `ComputeULA(cluster, shard, uid)` and
//! `ComputeWebrootPort(tenant, name)` must be pure functions of their inputs,
//! stable across process restarts and across nodes.

use sha2::{Digest, Sha256};
use std::net::Ipv6Addr;

/// Lower/upper bounds of the Node runtime's deterministic port range
/// (spec.md §4.2.3).
pub const WEBROOT_PORT_MIN: u16 = 3000;
pub const WEBROOT_PORT_MAX: u16 = 9999;

/// A short stable hash of the cluster identifier, used as the ULA global ID
/// and the cross-node transit prefix component (spec.md §4.2.6).
pub fn cluster_hash(cluster_id: &str) -> u16 {
    let digest = Sha256::digest(cluster_id.as_bytes());
    u16::from_be_bytes([digest[0], digest[1]])
}

/// Compute the tenant's per-node ULA address from `(cluster, shard, uid)`.
///
/// The address is built as `fd00:{cluster_hash:x}:{shard:x}::{uid:x}`, i.e.
/// a `/8` ULA prefix (`fd00::/8`) plus a deterministic interface identifier.
/// Two processes given the same inputs always produce the same address.
pub fn compute_ula(cluster_id: &str, shard_index: u16, uid: u32) -> Ipv6Addr {
    let cluster = cluster_hash(cluster_id);
    let segments = [
        0xfd00,
        cluster,
        shard_index,
        0,
        0,
        0,
        (uid >> 16) as u16,
        (uid & 0xffff) as u16,
    ];
    Ipv6Addr::new(
        segments[0],
        segments[1],
        segments[2],
        segments[3],
        segments[4],
        segments[5],
        segments[6],
        segments[7],
    )
}

/// Compute the deterministic TCP port for a Node-runtime webroot, mapped
/// into `[WEBROOT_PORT_MIN, WEBROOT_PORT_MAX]` (spec.md §4.2.3, §8).
pub fn compute_webroot_port(tenant: &str, webroot: &str) -> u16 {
    let key = format!("{tenant}/{webroot}");
    let digest = Sha256::digest(key.as_bytes());
    let raw = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    let span = (WEBROOT_PORT_MAX - WEBROOT_PORT_MIN + 1) as u32;
    WEBROOT_PORT_MIN + (raw % span) as u16
}

#[cfg(test)]
#[path = "hashing_tests.rs"]
mod tests;
