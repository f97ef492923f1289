use anyhow::{bail, Result};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::types::{NodeDescriptor, NodeId, NodeState};
use crate::protocol::types::Request;
use crate::protocol::wire;

pub const PROBE_INTERVAL: Duration = Duration::from_secs(5);
pub const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(10);
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Shared table of node descriptors.
///
/// Owned by the router context; mutated by the monitor loop and by the
/// router's connection-failure paths.
pub struct NodeRegistry {
    nodes: DashMap<NodeId, NodeDescriptor>,
}

impl NodeRegistry {
    pub fn new(topology: impl IntoIterator<Item = (NodeId, SocketAddr)>) -> Self {
        let nodes = DashMap::new();
        for (node_id, addr) in topology {
            nodes.insert(node_id, NodeDescriptor::new(node_id, addr));
        }
        Self { nodes }
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.nodes.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn addr_of(&self, node_id: NodeId) -> Option<SocketAddr> {
        self.nodes.get(&node_id).map(|entry| entry.addr)
    }

    pub fn state_of(&self, node_id: NodeId) -> Option<NodeState> {
        self.nodes.get(&node_id).map(|entry| entry.state)
    }

    pub fn is_active(&self, node_id: NodeId) -> bool {
        self.state_of(node_id) == Some(NodeState::Active)
    }

    /// Promotes a node and refreshes its heartbeat timestamp.
    pub fn mark_active(&self, node_id: NodeId) {
        if let Some(mut entry) = self.nodes.get_mut(&node_id) {
            if entry.state == NodeState::Inactive {
                tracing::info!("node {} is active again", node_id);
            }
            entry.state = NodeState::Active;
            entry.last_heartbeat = Instant::now();
        }
    }

    pub fn mark_inactive(&self, node_id: NodeId) {
        if let Some(mut entry) = self.nodes.get_mut(&node_id) {
            if entry.state == NodeState::Active {
                tracing::warn!("node {} marked inactive", node_id);
            }
            entry.state = NodeState::Inactive;
        }
    }

    pub fn refresh_heartbeat(&self, node_id: NodeId) {
        if let Some(mut entry) = self.nodes.get_mut(&node_id) {
            entry.last_heartbeat = Instant::now();
        }
    }

    /// Demotes every `Active` node whose last heartbeat is older than
    /// `timeout`, returning the demoted ids.
    pub fn expire_stale(&self, timeout: Duration) -> Vec<NodeId> {
        let now = Instant::now();
        let mut expired = Vec::new();

        for mut entry in self.nodes.iter_mut() {
            if entry.state == NodeState::Active
                && now.duration_since(entry.last_heartbeat) > timeout
            {
                tracing::warn!(
                    "node {} missed heartbeats for {:?}, marking inactive",
                    entry.node_id,
                    now.duration_since(entry.last_heartbeat)
                );
                entry.state = NodeState::Inactive;
                expired.push(entry.node_id);
            }
        }

        expired
    }
}

/// Periodic prober that keeps the registry honest.
///
/// One tick sweeps stale descriptors, then probes every node: inactive nodes
/// get a reconnect attempt, active nodes a routine heartbeat. A failing node
/// never interrupts the probing of the others and the loop never exits.
pub struct HealthMonitor {
    registry: Arc<NodeRegistry>,
    interval: Duration,
    heartbeat_timeout: Duration,
    probe_timeout: Duration,
}

impl HealthMonitor {
    pub fn new(registry: Arc<NodeRegistry>) -> Arc<Self> {
        Self::with_timing(registry, PROBE_INTERVAL, HEARTBEAT_TIMEOUT, PROBE_TIMEOUT)
    }

    pub fn with_timing(
        registry: Arc<NodeRegistry>,
        interval: Duration,
        heartbeat_timeout: Duration,
        probe_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            interval,
            heartbeat_timeout,
            probe_timeout,
        })
    }

    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tracing::info!(
            "starting health monitor (interval {:?}, timeout {:?})",
            self.interval,
            self.heartbeat_timeout
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            loop {
                interval.tick().await;
                self.tick().await;
            }
        })
    }

    /// Runs one monitor round. Public so tests can drive the monitor without
    /// waiting out the wall-clock interval.
    pub async fn tick(&self) {
        self.registry.expire_stale(self.heartbeat_timeout);

        for node_id in self.registry.node_ids() {
            let Some(addr) = self.registry.addr_of(node_id) else {
                continue;
            };

            match self.registry.state_of(node_id) {
                Some(NodeState::Inactive) => match self.probe(addr).await {
                    Ok(()) => {
                        tracing::info!("node {} reconnected", node_id);
                        self.registry.mark_active(node_id);
                    }
                    Err(e) => {
                        tracing::debug!("node {} still unreachable: {}", node_id, e);
                    }
                },
                Some(NodeState::Active) => match self.probe(addr).await {
                    Ok(()) => self.registry.refresh_heartbeat(node_id),
                    Err(e) => {
                        tracing::warn!("heartbeat to node {} failed: {}", node_id, e);
                        self.registry.mark_inactive(node_id);
                    }
                },
                None => {}
            }
        }
    }

    async fn probe(&self, addr: SocketAddr) -> Result<()> {
        let response = wire::call(addr, &Request::Heartbeat, self.probe_timeout).await?;
        if !response.is_ok() {
            bail!("heartbeat rejected: {:?}", response);
        }
        Ok(())
    }
}
