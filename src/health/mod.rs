//! Node Health Module
//!
//! Router-side liveness tracking for the worker nodes. Every node has a
//! descriptor that flips between `Active` and `Inactive`; the monitor probes
//! the fleet on a fixed interval and the router's own error paths can demote
//! a node the moment a connection to it fails.
//!
//! ## Core Mechanisms
//! - **Heartbeats**: A trivial request/reply probe; a reply refreshes the
//!   node's `last_heartbeat`.
//! - **Timeout Demotion**: An `Active` node that has not been heard from
//!   within the timeout window is demoted before the probe round.
//! - **Reconnect Probes**: `Inactive` nodes keep being probed and are
//!   promoted back the moment one probe succeeds.

pub mod service;
pub mod types;
