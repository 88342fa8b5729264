//! WebSocket protocol negotiation.
//!
//! # Data Flow
//! ```text
//! Raw request bytes (delimited by the transport layer)
//!     → header.rs (parse, dialect detection)
//!     → handshake.rs (per-dialect upgrade response)
//!     → response bytes handed back to the transport layer
//!
//! On parse/build failure:
//!     → response.rs (plain HTTP rejection bytes)
//! ```
//!
//! # Design Decisions
//! - Parsing and building are pure functions; no I/O, no shared state
//! - Dialect is derived only from which marker headers are present,
//!   never from payload content
//! - One closed enum over the nine historical dialects, matched
//!   exhaustively when building a response

pub mod handshake;
pub mod header;
pub mod response;

pub use handshake::{build, BuildError, HandshakePolicy};
pub use header::{parse, Header, ParseError};

/// Fixed GUID concatenated with the client key before SHA-1 hashing
/// (RFC 6455 §4.2.2, also used by the hybi-07 through hybi-10 drafts).
pub const HANDSHAKE_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Decoded length of a valid `Sec-WebSocket-Key` value.
pub const SEC_WEBSOCKET_KEY_LENGTH: usize = 16;

/// Length of the Hixie76 challenge-response digest (MD5 output).
pub const HIXIE76_DIGEST_LENGTH: usize = 16;

/// The historical WebSocket handshake revisions this server can identify.
///
/// `Hybi10` covers wire version 8: the hybi-08, -09 and -10 drafts all
/// advertise `Sec-WebSocket-Version: 8` and share one handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    /// No recognizable handshake markers.
    #[default]
    Unknown,
    /// draft-hixie-75: upgrade headers only, no key material.
    Hixie75,
    /// draft-hixie-76 / hybi-00: two number-and-space keys plus a body nonce.
    Hixie76,
    /// draft-hybi-04 (`Sec-WebSocket-Version: 4`).
    Hybi04,
    /// draft-hybi-05 (`Sec-WebSocket-Version: 5`).
    Hybi05,
    /// draft-hybi-06 (`Sec-WebSocket-Version: 6`).
    Hybi06,
    /// draft-hybi-07 (`Sec-WebSocket-Version: 7`).
    Hybi07,
    /// draft-hybi-08 through -10 (`Sec-WebSocket-Version: 8`).
    Hybi10,
    /// RFC 6455 (`Sec-WebSocket-Version: 13`).
    Rfc6455,
}

impl Dialect {
    /// Map a `Sec-WebSocket-Version` value to its dialect.
    ///
    /// Returns `None` for versions this server does not recognize.
    pub fn from_version(version: u16) -> Option<Dialect> {
        match version {
            4 => Some(Dialect::Hybi04),
            5 => Some(Dialect::Hybi05),
            6 => Some(Dialect::Hybi06),
            7 => Some(Dialect::Hybi07),
            8 => Some(Dialect::Hybi10),
            13 => Some(Dialect::Rfc6455),
            _ => None,
        }
    }

    /// Whether the dialect derives its accept token from SHA-1 over the
    /// client key and the handshake GUID.
    pub fn uses_accept_token(self) -> bool {
        matches!(self, Dialect::Hybi07 | Dialect::Hybi10 | Dialect::Rfc6455)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Dialect::Unknown => "unknown",
            Dialect::Hixie75 => "hixie-75",
            Dialect::Hixie76 => "hixie-76",
            Dialect::Hybi04 => "hybi-04",
            Dialect::Hybi05 => "hybi-05",
            Dialect::Hybi06 => "hybi-06",
            Dialect::Hybi07 => "hybi-07",
            Dialect::Hybi10 => "hybi-10",
            Dialect::Rfc6455 => "rfc6455",
        };
        f.write_str(name)
    }
}
