//! Request Router Module
//!
//! The central coordinator: accepts client requests, resolves replica
//! candidates through the partition directory, forwards over one-shot
//! connections with ordered failover, and propagates confirmed transfers to
//! the remaining replica holders in the background.
//!
//! ## Core Mechanisms
//! - **Ordered Failover**: Candidates are tried one at a time; a connection
//!   failure demotes the node and the next replica is tried. The client sees
//!   a failure only after every candidate is exhausted.
//! - **Transaction Ids**: A router-owned counter hands out unique, strictly
//!   increasing ids; the id travels with the forwarded transfer.
//! - **Replica Sync Queue**: Successful transfers are enqueued for a
//!   dedicated background worker that re-sends them to other replica
//!   holders, best-effort, with no acknowledgment and no retry.

pub mod service;
pub mod sync;
