//! Best-effort propagation of confirmed transfers to replica holders.
//!
//! The router enqueues a [`SyncJob`] after answering the client; a single
//! background worker drains the queue and re-sends the transfer to every
//! other active node whose partition set contains either participant. There
//! is no acknowledgment, no retry and no conflict resolution: a failed send
//! demotes the target node and the job moves on.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::directory::partition::PartitionTable;
use crate::health::service::NodeRegistry;
use crate::health::types::NodeId;
use crate::ledger::amount::Amount;
use crate::ledger::types::{AccountId, TransactionId};
use crate::protocol::types::Request;
use crate::protocol::wire;

const QUEUE_DEPTH: usize = 1024;
const SYNC_TIMEOUT: Duration = Duration::from_secs(2);

/// One confirmed transfer awaiting propagation.
#[derive(Debug, Clone)]
pub struct SyncJob {
    pub from_id: AccountId,
    pub to_id: AccountId,
    pub amount: Amount,
    pub transaction_id: TransactionId,
    /// The node whose reply the client already received; it is skipped.
    pub processed_by: NodeId,
}

/// Producer handle for the replica-sync worker.
pub struct SyncQueue {
    sender: mpsc::Sender<SyncJob>,
}

impl SyncQueue {
    /// Spawns the background worker and returns the queue handle plus the
    /// worker's task handle.
    pub fn start(
        registry: Arc<NodeRegistry>,
        partitions: Arc<PartitionTable>,
    ) -> (Self, tokio::task::JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel::<SyncJob>(QUEUE_DEPTH);

        let handle = tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                propagate(&registry, &partitions, &job).await;
            }
            tracing::debug!("replica sync queue closed");
        });

        (Self { sender }, handle)
    }

    /// Fire-and-forget enqueue. A full queue drops the job: replication here
    /// is best-effort and must never stall the client path.
    pub fn enqueue(&self, job: SyncJob) {
        if let Err(e) = self.sender.try_send(job) {
            tracing::error!("replica sync backlog full, dropping job: {}", e);
        }
    }

    /// Jobs currently waiting in the queue.
    pub fn backlog(&self) -> usize {
        QUEUE_DEPTH - self.sender.capacity()
    }
}

async fn propagate(registry: &NodeRegistry, partitions: &PartitionTable, job: &SyncJob) {
    let request = Request::Transfer {
        from_id: job.from_id,
        to_id: job.to_id,
        amount: job.amount,
        transaction_id: Some(job.transaction_id),
    };

    for node_id in registry.node_ids() {
        if node_id == job.processed_by || !registry.is_active(node_id) {
            continue;
        }
        if !partitions.holds(node_id, job.from_id) && !partitions.holds(node_id, job.to_id) {
            continue;
        }
        let Some(addr) = registry.addr_of(node_id) else {
            continue;
        };

        match wire::call(addr, &request, SYNC_TIMEOUT).await {
            Ok(response) if response.is_ok() => {
                tracing::debug!(
                    "synced transaction {} to node {}",
                    job.transaction_id,
                    node_id
                );
            }
            Ok(response) => {
                // Application-level refusal (e.g. the node only holds the
                // destination account). Logged, never retried.
                tracing::warn!(
                    "node {} rejected sync of transaction {}: {:?}",
                    node_id,
                    job.transaction_id,
                    response
                );
            }
            Err(e) => {
                tracing::warn!(
                    "failed to sync transaction {} to node {}: {}",
                    job.transaction_id,
                    node_id,
                    e
                );
                registry.mark_inactive(node_id);
            }
        }
    }
}
