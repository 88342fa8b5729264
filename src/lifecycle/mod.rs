//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Initialize core → Start listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain sessions → Exit
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accept, mark sessions disconnecting,
//!   delete all under one lock acquisition

pub mod shutdown;

pub use shutdown::Shutdown;
