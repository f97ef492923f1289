//! Message Protocol Module
//!
//! Defines the request/response envelope spoken on every connection in the
//! cluster (client -> router and router -> worker node) and the framing used
//! to put it on the wire.
//!
//! ## Core Mechanisms
//! - **Tagged Messages**: Every operation is a strongly typed enum variant, so
//!   dispatch never inspects loosely typed parameter lists.
//! - **Connection per Request**: A connection carries exactly one request and
//!   one response, then closes. There is no multiplexing or pipelining.
//! - **Framing**: Length-prefixed `bincode` frames over TCP.

pub mod types;
pub mod wire;
