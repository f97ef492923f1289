//! Distributed Ledger Cluster Library
//!
//! This library crate defines the core modules that make up the distributed system.
//! It serves as the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! The system is composed of six loosely coupled subsystems:
//!
//! - **`protocol`**: The wire layer. Length-prefixed bincode frames over TCP and the
//!   request/response vocabulary shared by the router, the nodes and the clients.
//! - **`ledger`**: The account state layer. Fixed-point money arithmetic, the
//!   in-memory account and transaction store, and the seed-file loader.
//! - **`directory`**: The partition directory. Maps every account id to the set of
//!   nodes holding a replica of it.
//! - **`health`**: The failure detection layer. A registry of node descriptors and a
//!   periodic monitor that probes nodes and flips them between active and inactive.
//! - **`router`**: The central coordination layer. Routes client requests to replica
//!   holders with failover, allocates transaction ids and runs the background
//!   replica-sync queue.
//! - **`node`**: The worker process. Serves balance queries, transfers and
//!   heartbeats against its local ledger store.

pub mod directory;
pub mod health;
pub mod ledger;
pub mod node;
pub mod protocol;
pub mod router;
