use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::sync::Arc;

use ledger_cluster::directory::partition::{PartitionTable, Topology};
use ledger_cluster::health::service::{HealthMonitor, NodeRegistry};
use ledger_cluster::ledger::seed;
use ledger_cluster::node::service::NodeService;
use ledger_cluster::router::service::{RouterContext, RouterService};
use ledger_cluster::router::sync::SyncQueue;

/// Default deployment shape: one router and three worker nodes on localhost.
const ROUTER_PORT: u16 = 9000;
const NODE_PORT_BASE: u16 = 9100;
const NODE_COUNT: u32 = 3;
const FIRST_ACCOUNT: u64 = 101;
const LAST_ACCOUNT: u64 = 200;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        // .with_max_level(tracing::Level::DEBUG)
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("router") => run_router().await,
        Some("node") => {
            let node_id: u32 = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("missing node id"))?
                .parse()?;
            let data_dir = args
                .get(3)
                .map(String::as_str)
                .unwrap_or("data")
                .to_string();
            run_node(node_id, &data_dir).await
        }
        Some("seed") => {
            let data_dir = args.get(2).map(String::as_str).unwrap_or("data");
            seed::write_sample_dataset(Path::new(data_dir))
        }
        _ => {
            eprintln!("Usage: {} <role> [args]", args[0]);
            eprintln!("  {} router", args[0]);
            eprintln!("  {} node <id> [data-dir]", args[0]);
            eprintln!("  {} seed [data-dir]", args[0]);
            eprintln!();
            eprintln!("Example: {} seed data && {} node 0 data", args[0], args[0]);
            std::process::exit(1);
        }
    }
}

/// Boots the central router: partition directory, node registry, background
/// replica sync, health monitoring and the client-facing listener.
async fn run_router() -> anyhow::Result<()> {
    let topology = Topology::localhost(NODE_COUNT, NODE_PORT_BASE, FIRST_ACCOUNT, LAST_ACCOUNT);
    tracing::info!(
        "router managing {} nodes over accounts {}..={}",
        topology.nodes.len(),
        topology.first_account,
        topology.last_account
    );

    let partitions = Arc::new(PartitionTable::build(&topology));
    let registry = Arc::new(NodeRegistry::new(topology.nodes.clone()));

    let (sync, _sync_handle) = SyncQueue::start(registry.clone(), partitions.clone());
    let ctx = RouterContext::new(registry.clone(), partitions, sync);

    HealthMonitor::new(registry).start();

    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), ROUTER_PORT);
    let (_, server) = RouterService::new(ctx).bind(addr).await?;

    tracing::info!("Press Ctrl+C to shutdown");
    server.await?;
    Ok(())
}

/// Boots one worker node: loads the seed dataset, trims it to the node's
/// partition and serves the node port.
async fn run_node(node_id: u32, data_dir: &str) -> anyhow::Result<()> {
    if node_id >= NODE_COUNT {
        anyhow::bail!("node id {} out of range (0..{})", node_id, NODE_COUNT);
    }

    let topology = Topology::localhost(NODE_COUNT, NODE_PORT_BASE, FIRST_ACCOUNT, LAST_ACCOUNT);
    let partitions = PartitionTable::build(&topology);

    let store = Arc::new(seed::load(Path::new(data_dir)));
    store.retain_accounts(|account_id| partitions.holds(node_id, account_id));
    tracing::info!(
        "node {} holds {} accounts after partition trim",
        node_id,
        store.account_count()
    );

    let addr = SocketAddr::new(
        IpAddr::V4(Ipv4Addr::LOCALHOST),
        NODE_PORT_BASE + node_id as u16,
    );
    let (_, server) = NodeService::new(node_id, store).bind(addr).await?;

    tracing::info!("Press Ctrl+C to shutdown");
    server.await?;
    Ok(())
}
