use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::health::service::NodeRegistry;
use crate::health::types::NodeId;
use crate::ledger::types::AccountId;

/// Cluster shape the directory is built from: the node fleet, the account-id
/// operating range and how many replicas each account band gets.
#[derive(Debug, Clone)]
pub struct Topology {
    pub nodes: Vec<(NodeId, SocketAddr)>,
    pub first_account: AccountId,
    pub last_account: AccountId,
    pub replication_factor: usize,
}

impl Topology {
    /// The default deployment: `node_count` nodes on localhost at contiguous
    /// ports starting at `port_base`, two replicas per account band.
    pub fn localhost(
        node_count: u32,
        port_base: u16,
        first_account: AccountId,
        last_account: AccountId,
    ) -> Self {
        let localhost = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let nodes = (0..node_count)
            .map(|id| (id, SocketAddr::new(localhost, port_base + id as u16)))
            .collect();

        Self {
            nodes,
            first_account,
            last_account,
            replication_factor: 2,
        }
    }
}

/// Static assignment of account ids to replica-holding nodes.
///
/// Built once at router startup and read-only afterwards.
pub struct PartitionTable {
    assignments: HashMap<NodeId, HashSet<AccountId>>,
}

impl PartitionTable {
    pub fn build(topology: &Topology) -> Self {
        let mut assignments: HashMap<NodeId, HashSet<AccountId>> = topology
            .nodes
            .iter()
            .map(|(node_id, _)| (*node_id, HashSet::new()))
            .collect();

        let node_count = topology.nodes.len();
        // An empty fleet or inverted range maps no accounts at all; every
        // lookup then reports the account as unmapped.
        if node_count == 0 || topology.last_account < topology.first_account {
            return Self { assignments };
        }

        let range = topology.last_account - topology.first_account + 1;
        let band = (range / node_count as u64).max(1);
        let replicas = topology.replication_factor.clamp(1, node_count);

        for (index, _) in topology.nodes.iter().enumerate() {
            let start = topology.first_account + index as u64 * band;
            // The last node absorbs the remainder of the range.
            let end = if index == node_count - 1 {
                topology.last_account
            } else {
                (start + band - 1).min(topology.last_account)
            };
            if start > topology.last_account {
                continue;
            }

            for offset in 0..replicas {
                let holder = topology.nodes[(index + offset) % node_count].0;
                if let Some(accounts) = assignments.get_mut(&holder) {
                    accounts.extend(start..=end);
                }
            }
        }

        Self { assignments }
    }

    /// Every node holding a replica of `account_id`, in ascending id order,
    /// regardless of health.
    pub fn holders(&self, account_id: AccountId) -> Vec<NodeId> {
        let mut holders: Vec<NodeId> = self
            .assignments
            .iter()
            .filter(|(_, accounts)| accounts.contains(&account_id))
            .map(|(node_id, _)| *node_id)
            .collect();
        holders.sort_unstable();
        holders
    }

    pub fn holds(&self, node_id: NodeId, account_id: AccountId) -> bool {
        self.assignments
            .get(&node_id)
            .is_some_and(|accounts| accounts.contains(&account_id))
    }

    pub fn accounts_for(&self, node_id: NodeId) -> Option<&HashSet<AccountId>> {
        self.assignments.get(&node_id)
    }

    /// Candidate nodes for a request on `account_id`: active replica holders
    /// in randomized order. An empty result means the request cannot be
    /// served right now (unmapped account or every holder down).
    pub fn nodes_for(&self, account_id: AccountId, registry: &NodeRegistry) -> Vec<NodeId> {
        let mut candidates: Vec<NodeId> = self
            .holders(account_id)
            .into_iter()
            .filter(|node_id| registry.is_active(*node_id))
            .collect();

        candidates.shuffle(&mut rand::thread_rng());
        candidates
    }
}
