//! Worker Node Module
//!
//! The per-node RPC service: a TCP accept loop feeding a bounded worker pool,
//! where each worker handles exactly one request/response exchange against
//! the local [`LedgerStore`](crate::ledger::store::LedgerStore).
//!
//! ## Core Mechanisms
//! - **Bounded Pool**: Concurrency is capped at the machine's available
//!   parallelism; excess connections wait for a permit.
//! - **One-Shot Connections**: Decode one request, dispatch, encode one
//!   reply, close. No per-connection state survives the exchange.
//! - **Errors as Data**: Local ledger failures travel back as protocol
//!   errors; only a malformed frame costs the connection itself.

pub mod service;

#[cfg(test)]
mod tests;
