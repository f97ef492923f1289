//! Worker Node Service Tests
//!
//! Exercises the dispatch table and connection handling over real loopback
//! sockets.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::ledger::amount::Amount;
use crate::ledger::store::LedgerStore;
use crate::ledger::types::Account;
use crate::node::service::NodeService;
use crate::protocol::types::{ProtocolError, Request, Response};
use crate::protocol::wire;

async fn spawn_demo_node() -> SocketAddr {
    let store = Arc::new(LedgerStore::new());
    store.insert_account(Account {
        id: 101,
        owner_id: 1,
        balance: "1500.00".parse().expect("bad amount"),
        kind: "Savings".to_string(),
    });
    store.insert_account(Account {
        id: 102,
        owner_id: 2,
        balance: "3200.50".parse().expect("bad amount"),
        kind: "Checking".to_string(),
    });

    let service = NodeService::new(0, store);
    let (addr, _handle) = service
        .bind("127.0.0.1:0".parse().expect("bad addr"))
        .await
        .expect("node bind failed");
    addr
}

#[tokio::test]
async fn answers_balance_queries() {
    let addr = spawn_demo_node().await;

    let response = wire::call(
        addr,
        &Request::QueryBalance { account_id: 101 },
        Duration::from_secs(1),
    )
    .await
    .expect("call failed");

    assert_eq!(response, Response::Balance(Amount::from_units(1500)));
}

#[tokio::test]
async fn answers_heartbeats() {
    let addr = spawn_demo_node().await;

    let response = wire::call(addr, &Request::Heartbeat, Duration::from_secs(1))
        .await
        .expect("call failed");

    assert_eq!(response, Response::Pong);
}

#[tokio::test]
async fn processes_transfers_end_to_end() {
    let addr = spawn_demo_node().await;

    let response = wire::call(
        addr,
        &Request::Transfer {
            from_id: 101,
            to_id: 102,
            amount: Amount::from_units(500),
            transaction_id: Some(1),
        },
        Duration::from_secs(1),
    )
    .await
    .expect("call failed");

    assert_eq!(
        response,
        Response::Transfer {
            new_balance: Amount::from_units(1000)
        }
    );
}

#[tokio::test]
async fn ledger_errors_travel_as_replies_not_dropped_connections() {
    let addr = spawn_demo_node().await;

    let response = wire::call(
        addr,
        &Request::QueryBalance { account_id: 999 },
        Duration::from_secs(1),
    )
    .await
    .expect("call failed");

    assert_eq!(response, Response::Error(ProtocolError::AccountNotFound(999)));
}

#[tokio::test]
async fn malformed_frame_closes_only_its_own_connection() {
    let addr = spawn_demo_node().await;

    // A garbage length prefix gets this connection dropped without a reply.
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect failed");
    stream
        .write_all(&u32::MAX.to_be_bytes())
        .await
        .expect("write failed");

    let mut buf = [0u8; 16];
    let read = stream.read(&mut buf).await.expect("read failed");
    assert_eq!(read, 0, "offending connection should be closed");

    // The service keeps serving well-formed requests.
    let response = wire::call(addr, &Request::Heartbeat, Duration::from_secs(1))
        .await
        .expect("call failed");
    assert_eq!(response, Response::Pong);
}
