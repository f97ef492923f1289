use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use super::sync::{SyncJob, SyncQueue};
use crate::directory::partition::PartitionTable;
use crate::health::service::NodeRegistry;
use crate::health::types::NodeId;
use crate::ledger::amount::Amount;
use crate::ledger::types::{AccountId, TransactionId};
use crate::protocol::types::{ProtocolError, Request, Response};
use crate::protocol::wire;

/// Size of the client-facing connection pool.
pub const CLIENT_POOL_SIZE: usize = 50;
/// Bound on one router -> node exchange.
pub const NODE_CALL_TIMEOUT: Duration = Duration::from_secs(2);

/// Everything the router and its background services share: node health,
/// the partition directory, the transaction-id counter and the sync queue.
/// Created at router startup and torn down with it; there is no process-wide
/// state.
pub struct RouterContext {
    pub registry: Arc<NodeRegistry>,
    pub partitions: Arc<PartitionTable>,
    pub sync: SyncQueue,
    next_transaction_id: AtomicU64,
}

impl RouterContext {
    pub fn new(
        registry: Arc<NodeRegistry>,
        partitions: Arc<PartitionTable>,
        sync: SyncQueue,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            partitions,
            sync,
            next_transaction_id: AtomicU64::new(1),
        })
    }

    /// Unique, strictly increasing across concurrent callers.
    pub fn allocate_transaction_id(&self) -> TransactionId {
        self.next_transaction_id.fetch_add(1, Ordering::SeqCst)
    }
}

/// The client-facing request router.
pub struct RouterService {
    ctx: Arc<RouterContext>,
    call_timeout: Duration,
}

impl RouterService {
    pub fn new(ctx: Arc<RouterContext>) -> Arc<Self> {
        Self::with_call_timeout(ctx, NODE_CALL_TIMEOUT)
    }

    pub fn with_call_timeout(ctx: Arc<RouterContext>, call_timeout: Duration) -> Arc<Self> {
        Arc::new(Self { ctx, call_timeout })
    }

    /// Binds `addr` and serves in a background task, returning the bound
    /// address and the task handle.
    pub async fn bind(
        self: Arc<Self>,
        addr: SocketAddr,
    ) -> Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("router failed to bind {}", addr))?;
        let local_addr = listener.local_addr()?;

        tracing::info!("router listening on {}", local_addr);

        let handle = tokio::spawn(async move {
            self.serve(listener).await;
        });

        Ok((local_addr, handle))
    }

    pub async fn serve(self: Arc<Self>, listener: TcpListener) {
        let permits = Arc::new(Semaphore::new(CLIENT_POOL_SIZE));

        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::error!("router accept failed: {}", e);
                    continue;
                }
            };

            let Ok(permit) = permits.clone().acquire_owned().await else {
                break;
            };

            let service = self.clone();
            tokio::spawn(async move {
                if let Err(e) = service.handle_connection(stream).await {
                    tracing::warn!("router dropped connection from {}: {}", peer, e);
                }
                drop(permit);
            });
        }
    }

    async fn handle_connection(&self, mut stream: TcpStream) -> Result<()> {
        let request: Request = wire::read_frame(&mut stream).await?;
        let response = self.handle(request).await;
        wire::write_frame(&mut stream, &response).await
    }

    /// Routes one client request.
    pub async fn handle(&self, request: Request) -> Response {
        match request {
            Request::QueryBalance { account_id } => self.route_query(account_id).await,

            Request::Transfer {
                from_id,
                to_id,
                amount,
                ..
            } => self.route_transfer(from_id, to_id, amount).await,

            Request::Heartbeat => Response::Error(ProtocolError::UnsupportedOperation),
        }
    }

    async fn route_query(&self, account_id: AccountId) -> Response {
        let candidates = self
            .ctx
            .partitions
            .nodes_for(account_id, &self.ctx.registry);
        if candidates.is_empty() {
            return Response::Error(ProtocolError::NoNodesAvailable);
        }

        let request = Request::QueryBalance { account_id };
        let (response, _) = self.try_candidates(&candidates, &request, false).await;
        response
    }

    async fn route_transfer(
        &self,
        from_id: AccountId,
        to_id: AccountId,
        amount: Amount,
    ) -> Response {
        let transaction_id = self.ctx.allocate_transaction_id();

        let source_nodes = self.ctx.partitions.nodes_for(from_id, &self.ctx.registry);
        let dest_nodes = self.ctx.partitions.nodes_for(to_id, &self.ctx.registry);
        if source_nodes.is_empty() || dest_nodes.is_empty() {
            return Response::Error(ProtocolError::NoNodesAvailable);
        }

        let request = Request::Transfer {
            from_id,
            to_id,
            amount,
            transaction_id: Some(transaction_id),
        };

        // Only nodes holding the source account can process the transfer;
        // the first OK reply is authoritative.
        let (response, winner) = self.try_candidates(&source_nodes, &request, true).await;

        if response.is_ok() {
            if let Some(processed_by) = winner {
                self.ctx.sync.enqueue(SyncJob {
                    from_id,
                    to_id,
                    amount,
                    transaction_id,
                    processed_by,
                });
            }
        }

        response
    }

    /// Tries each candidate in order over one-shot connections.
    ///
    /// A connection failure demotes the node and advances; a non-OK reply
    /// advances without demotion. When `surface_node_errors` is set the last
    /// application error (e.g. insufficient funds) is returned to the caller
    /// instead of the generic exhaustion error.
    async fn try_candidates(
        &self,
        candidates: &[NodeId],
        request: &Request,
        surface_node_errors: bool,
    ) -> (Response, Option<NodeId>) {
        let mut last_rejection = None;

        for &node_id in candidates {
            let Some(addr) = self.ctx.registry.addr_of(node_id) else {
                continue;
            };

            match wire::call(addr, request, self.call_timeout).await {
                Ok(response) if response.is_ok() => return (response, Some(node_id)),
                Ok(response) => {
                    tracing::debug!("node {} rejected request: {:?}", node_id, response);
                    last_rejection = Some(response);
                }
                Err(e) => {
                    tracing::warn!("connection to node {} failed: {}", node_id, e);
                    self.ctx.registry.mark_inactive(node_id);
                }
            }
        }

        let response = match last_rejection {
            Some(rejection) if surface_node_errors => rejection,
            _ => Response::Error(ProtocolError::AllNodesFailed),
        };
        (response, None)
    }
}
