//! WebSocket handshake negotiation and session lifecycle engine.
//!
//! # Architecture Overview
//! ```text
//! Raw request bytes ──▶ protocol::parse ──▶ Header
//!                                             │
//!                                             ▼
//! Response bytes  ◀── protocol::build ◀── HandshakePolicy
//!
//! Concurrently, per connection:
//!     accept ──▶ SessionTable::add (state: Connecting)
//!     handshake complete ──▶ Idle
//!     dispatched event ──▶ jobs_inc ──▶ Reading/Writing ──▶ jobs_dec
//!     close ──▶ begin_disconnect ──▶ jobs_wait ──▶ delete
//! ```
//!
//! The protocol functions are pure and thread-safe; the session table is
//! the only shared mutable state. The `net` module is a demonstration
//! transport wiring the two together over TCP.

// Core subsystems
pub mod config;
pub mod protocol;
pub mod session;

// Transport harness
pub mod net;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::ServerConfig;
pub use lifecycle::Shutdown;
pub use protocol::{Dialect, HandshakePolicy, Header};
pub use session::{Session, SessionTable};
