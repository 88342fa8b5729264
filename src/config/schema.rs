//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML config
//! files; every field has a default so a minimal config is valid.

use serde::{Deserialize, Serialize};

/// Root configuration for the websocket server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, connection limits).
    pub listener: ListenerConfig,

    /// Handshake negotiation policy.
    pub handshake: HandshakeConfig,

    /// Request size limits.
    pub limits: LimitsConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9001").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9001".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Handshake negotiation policy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HandshakeConfig {
    /// Subprotocols the server supports, in preference order.
    pub subprotocols: Vec<String>,

    /// Extensions the server supports.
    pub extensions: Vec<String>,

    /// Accepted Origin values; empty accepts all origins.
    pub origins: Vec<String>,

    /// Accepted Host values; empty accepts all hosts.
    pub hosts: Vec<String>,
}

/// Request size limits enforced by the transport layer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum size of the request header block in bytes.
    pub max_header_bytes: usize,

    /// Maximum length of the request URI in bytes.
    pub max_uri_bytes: usize,

    /// Maximum size of the trailing request body in bytes.
    pub max_payload_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_header_bytes: 8_192,
            max_uri_bytes: 2_048,
            max_payload_bytes: 16_384,
        }
    }
}
