// SPDX-License-Identifier: MIT

//! Tenant-ULA / nftables Manager (spec.md §4.2.6): per-tenant IPv6 addresses
//! on a dummy `tenant0` interface, enforced by a singleton nftables table so
//! that a tenant process can only bind its own address.

use nodeagent_core::hashing::compute_ula;
use nodeagent_core::{validate, AgentError, AgentResult};
use nodeagent_sys::subprocess;
use std::net::Ipv6Addr;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

const NFT_TIMEOUT: Duration = Duration::from_secs(10);
const TABLE: &str = "nodeagent_tenant";
const SET_NAME: &str = "tenant_allow";
const CHAIN: &str = "tenant_output";

pub struct UlaNftManager {
    cluster_id: String,
    shard_index: u16,
    table_ready: OnceCell<Result<(), String>>,
}

impl UlaNftManager {
    pub fn new(cluster_id: impl Into<String>, shard_index: u16) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            shard_index,
            table_ready: OnceCell::new(),
        }
    }

    /// Runs one nftables statement via `nft -e '<stmt>'`.
    async fn nft(&self, statement: &str, cancel: &CancellationToken) -> AgentResult<()> {
        let mut cmd = Command::new("nft");
        cmd.args(["-e", statement]);
        subprocess::run(cmd, NFT_TIMEOUT, cancel, "nft").await?;
        Ok(())
    }

    /// Idempotent table setup, run exactly once per process (spec.md
    /// §4.2.6, §5 "singleton"). Any setup error is memoized, not retried.
    pub async fn ensure_table(&self, cancel: &CancellationToken) -> AgentResult<()> {
        let result = self
            .table_ready
            .get_or_init(|| async {
                self.ensure_table_inner(cancel)
                    .await
                    .map_err(|e| e.to_string())
            })
            .await;
        result.clone().map_err(AgentError::internal)
    }

    async fn ensure_table_inner(&self, cancel: &CancellationToken) -> AgentResult<()> {
        self.nft(&format!("add table ip6 {TABLE}"), cancel).await?;
        self.nft(
            &format!("add set ip6 {TABLE} {SET_NAME} {{ type ipv6_addr . mark ; }}"),
            cancel,
        )
        .await?;
        self.nft(
            &format!("add chain ip6 {TABLE} {CHAIN} {{ type filter hook output priority 0 ; }}"),
            cancel,
        )
        .await?;
        // Flushing only the chain preserves the set's elements across
        // restarts, so existing tenants keep their access.
        self.nft(&format!("flush chain ip6 {TABLE} {CHAIN}"), cancel).await?;
        self.nft(
            &format!(
                "add rule ip6 {TABLE} {CHAIN} ip6 saddr fd00::/16 meta skuid >= 1000 \
                 ip6 saddr . meta skuid != @{SET_NAME} reject"
            ),
            cancel,
        )
        .await
    }

    pub async fn configure(&self, tenant: &str, uid: u32, cancel: &CancellationToken) -> AgentResult<()> {
        validate::validate_name("tenant name", tenant)?;
        self.ensure_table(cancel).await?;

        let addr = compute_ula(&self.cluster_id, self.shard_index, uid);
        self.add_address(addr, cancel).await?;

        let element = format!("{{ {addr} . {uid} }}");
        ignore_already_exists(
            self.nft(&format!("add element ip6 {TABLE} {SET_NAME} {element}"), cancel)
                .await,
        )
    }

    pub async fn remove(&self, tenant: &str, uid: u32, cancel: &CancellationToken) -> AgentResult<()> {
        validate::validate_name("tenant name", tenant)?;
        self.ensure_table(cancel).await?;

        let addr = compute_ula(&self.cluster_id, self.shard_index, uid);
        ignore_not_found(self.remove_address(addr, cancel).await)?;

        let element = format!("{{ {addr} . {uid} }}");
        ignore_not_found(
            self.nft(&format!("delete element ip6 {TABLE} {SET_NAME} {element}"), cancel)
                .await,
        )
    }

    async fn add_address(&self, addr: Ipv6Addr, cancel: &CancellationToken) -> AgentResult<()> {
        let mut cmd = Command::new("ip");
        cmd.args(["-6", "addr", "add", &format!("{addr}/128"), "dev", "tenant0"]);
        ignore_already_exists(subprocess::run(cmd, NFT_TIMEOUT, cancel, "ip-addr-add").await.map(|_| ()))
    }

    async fn remove_address(&self, addr: Ipv6Addr, cancel: &CancellationToken) -> AgentResult<()> {
        let mut cmd = Command::new("ip");
        cmd.args(["-6", "addr", "del", &format!("{addr}/128"), "dev", "tenant0"]);
        subprocess::run(cmd, NFT_TIMEOUT, cancel, "ip-addr-del").await.map(|_| ())
    }

    /// Per-tenant egress whitelist (spec.md §4.2.6): a dedicated chain with
    /// accept rules per CIDR and a trailing reject, reached by a single
    /// `meta skuid`-gated jump from the output chain. An empty rule list
    /// removes the chain and restores unrestricted egress.
    pub async fn set_egress_whitelist(&self, uid: u32, cidrs: &[String], cancel: &CancellationToken) -> AgentResult<()> {
        for cidr in cidrs {
            validate::validate_cidr("egress cidr", cidr)?;
        }

        self.ensure_table(cancel).await?;
        let chain = format!("egress_{uid}");
        let jump_comment = format!("egress-jump-{uid}");

        if cidrs.is_empty() {
            ignore_not_found(self.nft(&format!("flush chain ip6 {TABLE} {chain}"), cancel).await)?;
            ignore_not_found(self.nft(&format!("delete chain ip6 {TABLE} {chain}"), cancel).await)?;
            return Ok(());
        }

        ignore_already_exists(self.nft(&format!("add chain ip6 {TABLE} {chain}"), cancel).await)?;
        self.nft(&format!("flush chain ip6 {TABLE} {chain}"), cancel).await?;
        for cidr in cidrs {
            self.nft(&format!("add rule ip6 {TABLE} {chain} ip6 daddr {cidr} accept"), cancel)
                .await?;
        }
        self.nft(&format!("add rule ip6 {TABLE} {chain} reject"), cancel).await?;

        self.nft(
            &format!(
                "add rule ip6 {TABLE} {CHAIN} meta skuid {uid} jump {chain} comment \"{jump_comment}\""
            ),
            cancel,
        )
        .await
    }

    /// Cross-node routing (spec.md §4.2.6): assign this node's transit
    /// address on its primary interface, then install a replace-semantics
    /// route to each peer's prefix via the peer's transit address.
    pub async fn configure_transit(
        &self,
        interface: &str,
        transit_index: u16,
        cancel: &CancellationToken,
    ) -> AgentResult<()> {
        let cluster_hash = nodeagent_core::hashing::cluster_hash(&self.cluster_id);
        let transit = format!("fd00:{cluster_hash:x}:0::{transit_index}/64");
        let mut cmd = Command::new("ip");
        cmd.args(["-6", "addr", "replace", &transit, "dev", interface]);
        subprocess::run(cmd, NFT_TIMEOUT, cancel, "ip-addr-replace").await?;
        Ok(())
    }

    pub async fn install_peer_route(
        &self,
        peer_prefix_index: u16,
        peer_transit_index: u16,
        cancel: &CancellationToken,
    ) -> AgentResult<()> {
        let cluster_hash = nodeagent_core::hashing::cluster_hash(&self.cluster_id);
        let destination = format!("fd00:{cluster_hash:x}:{peer_prefix_index:x}::/48");
        let via = format!("fd00:{cluster_hash:x}:0::{peer_transit_index}");
        let mut cmd = Command::new("ip");
        cmd.args(["-6", "route", "replace", &destination, "via", &via]);
        subprocess::run(cmd, NFT_TIMEOUT, cancel, "ip-route-replace").await?;
        Ok(())
    }

    /// Service-node ingress (spec.md §4.2.6): a second, accept-by-default
    /// table that drops traffic to ULA addresses unless it came from a web
    /// node (`fd00::/16`) or the loopback.
    pub async fn ensure_service_ingress(&self, cancel: &CancellationToken) -> AgentResult<()> {
        const INGRESS_TABLE: &str = "nodeagent_ingress";
        const INGRESS_CHAIN: &str = "ingress_input";
        self.nft(&format!("add table ip6 {INGRESS_TABLE}"), cancel).await?;
        self.nft(
            &format!(
                "add chain ip6 {INGRESS_TABLE} {INGRESS_CHAIN} \
                 {{ type filter hook input priority 0 ; policy accept ; }}"
            ),
            cancel,
        )
        .await?;
        self.nft(&format!("flush chain ip6 {INGRESS_TABLE} {INGRESS_CHAIN}"), cancel)
            .await?;
        self.nft(
            &format!(
                "add rule ip6 {INGRESS_TABLE} {INGRESS_CHAIN} ip6 daddr fd00::/16 \
                 ip6 saddr != fd00::/16 ip6 saddr != ::1 drop"
            ),
            cancel,
        )
        .await
    }
}

fn ignore_already_exists(result: AgentResult<()>) -> AgentResult<()> {
    match result {
        Err(AgentError::Internal { output, .. }) if contains_any(&output, &["File exists", "already exists"]) => Ok(()),
        other => other,
    }
}

fn ignore_not_found(result: AgentResult<()>) -> AgentResult<()> {
    match result {
        Err(AgentError::Internal { output, .. }) if contains_any(&output, &["No such file", "does not exist", "not found"]) => Ok(()),
        other => other,
    }
}

fn contains_any(output: &Option<String>, needles: &[&str]) -> bool {
    output.as_deref().map(|o| needles.iter().any(|n| o.contains(n))).unwrap_or(false)
}

#[cfg(test)]
#[path = "ula_nft_tests.rs"]
mod tests;
