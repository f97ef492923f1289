use std::net::SocketAddr;
use std::time::Instant;

pub type NodeId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Active,
    Inactive,
}

/// Router-side view of one worker node.
///
/// Created at router startup, mutated only by the health monitor and the
/// router's failure observations, never destroyed while the router runs.
#[derive(Debug, Clone)]
pub struct NodeDescriptor {
    pub node_id: NodeId,
    pub addr: SocketAddr,
    pub state: NodeState,
    pub last_heartbeat: Instant,
}

impl NodeDescriptor {
    pub fn new(node_id: NodeId, addr: SocketAddr) -> Self {
        Self {
            node_id,
            addr,
            state: NodeState::Active,
            last_heartbeat: Instant::now(),
        }
    }
}
