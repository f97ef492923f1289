use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::health::types::NodeId;
use crate::ledger::store::LedgerStore;
use crate::protocol::types::{Request, Response};
use crate::protocol::wire;

/// RPC front-end for one worker node's ledger replica.
pub struct NodeService {
    node_id: NodeId,
    store: Arc<LedgerStore>,
    worker_count: usize,
}

impl NodeService {
    pub fn new(node_id: NodeId, store: Arc<LedgerStore>) -> Arc<Self> {
        let worker_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);

        Arc::new(Self {
            node_id,
            store,
            worker_count,
        })
    }

    /// Binds `addr` and serves in a background task, returning the bound
    /// address (useful with port 0) and the task handle.
    pub async fn bind(
        self: Arc<Self>,
        addr: SocketAddr,
    ) -> Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("node {} failed to bind {}", self.node_id, addr))?;
        let local_addr = listener.local_addr()?;

        tracing::info!(
            "worker node {} listening on {} ({} workers)",
            self.node_id,
            local_addr,
            self.worker_count
        );

        let handle = tokio::spawn(async move {
            self.serve(listener).await;
        });

        Ok((local_addr, handle))
    }

    pub async fn serve(self: Arc<Self>, listener: TcpListener) {
        let permits = Arc::new(Semaphore::new(self.worker_count));

        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::error!("node {} accept failed: {}", self.node_id, e);
                    continue;
                }
            };

            let Ok(permit) = permits.clone().acquire_owned().await else {
                break;
            };

            let service = self.clone();
            tokio::spawn(async move {
                if let Err(e) = service.handle_connection(stream).await {
                    tracing::warn!(
                        "node {} dropped connection from {}: {}",
                        service.node_id,
                        peer,
                        e
                    );
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

    /// Dispatches one decoded request against the local store.
    pub async fn handle(&self, request: Request) -> Response {
        match request {
            Request::QueryBalance { account_id } => {
                match self.store.read_balance(account_id).await {
                    Ok(balance) => Response::Balance(balance),
                    Err(e) => Response::Error(e),
                }
            }

            Request::Transfer {
                from_id,
                to_id,
                amount,
                transaction_id,
            } => {
                match self
                    .store
                    .transfer(from_id, to_id, amount, transaction_id)
                    .await
                {
                    Ok(new_balance) => Response::Transfer { new_balance },
                    Err(e) => Response::Error(e),
                }
            }

            Request::Heartbeat => Response::Pong,
        }
    }
}
