//! Ledger Store Module
//!
//! The per-node state layer: in-memory account and transaction tables, the
//! fixed-point money type, and the seed-data loader that populates a node at
//! startup.
//!
//! ## Core Mechanisms
//! - **Per-Account Locking**: One reader-writer lock per account; balance
//!   reads share the lock, transfers take write locks in ascending id order
//!   to rule out lock-order inversion between opposing transfers.
//! - **Debit-Only Fallback**: A transfer whose destination is not local
//!   applies just the debit and relies on replica sync to reach the
//!   destination's owner.
//! - **No Durability**: Tables live in memory for the process lifetime;
//!   persistence is deliberately out of scope.

pub mod amount;
pub mod seed;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;
