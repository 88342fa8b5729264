//! Network layer: the demonstration transport driving the core.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → conn.rs (register session, read delimited request,
//!                negotiate handshake, dispatch events, teardown)
//! ```
//!
//! # Design Decisions
//! - The core never performs I/O; this layer delivers delimited request
//!   bytes to the parser and writes response bytes back
//! - Each connection is one session in the shared table, registered at
//!   accept and removed by the teardown protocol
//! - Bounded accept queue prevents resource exhaustion

pub mod conn;
pub mod listener;

pub use listener::{Listener, ListenerError};
