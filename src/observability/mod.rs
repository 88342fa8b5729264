//! Observability subsystem.
//!
//! # Design Decisions
//! - Structured logging via `tracing`; trace-level events on the
//!   session table mirror the hot-path operations
//! - No metrics surface; logging is the only observability layer

pub mod logging;
