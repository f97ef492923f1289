//! Partition & Replica Directory Module
//!
//! The router's static map from account ids to the worker nodes authorized to
//! serve them.
//!
//! ## Core Mechanisms
//! - **Banding**: The account-id range is split into contiguous, near-equal
//!   bands, one primary band per node.
//! - **Replication**: Each band is also placed on the next nodes in ring
//!   order up to the replication factor, so most accounts have more than one
//!   valid replica.
//! - **Candidate Selection**: `nodes_for` filters holders down to currently
//!   active nodes and shuffles them; the random order is the load-balancing
//!   mechanism across equally valid replicas.

pub mod partition;
