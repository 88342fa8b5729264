//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, bind address parses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function over the deserialized config
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::ServerConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// `listener.bind_address` is not a parseable socket address.
    InvalidBindAddress(String),
    /// `listener.max_connections` is zero.
    ZeroMaxConnections,
    /// A limit field is zero.
    ZeroLimit(&'static str),
    /// `limits.max_uri_bytes` exceeds `limits.max_header_bytes`.
    UriLargerThanHeader,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidBindAddress(addr) => {
                write!(f, "listener.bind_address {:?} is not a socket address", addr)
            }
            ValidationError::ZeroMaxConnections => {
                write!(f, "listener.max_connections must be greater than zero")
            }
            ValidationError::ZeroLimit(field) => {
                write!(f, "limits.{} must be greater than zero", field)
            }
            ValidationError::UriLargerThanHeader => {
                write!(f, "limits.max_uri_bytes cannot exceed limits.max_header_bytes")
            }
        }
    }
}

/// Check a deserialized config for semantic problems.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }
    if config.limits.max_header_bytes == 0 {
        errors.push(ValidationError::ZeroLimit("max_header_bytes"));
    }
    if config.limits.max_uri_bytes == 0 {
        errors.push(ValidationError::ZeroLimit("max_uri_bytes"));
    }
    if config.limits.max_payload_bytes == 0 {
        errors.push(ValidationError::ZeroLimit("max_payload_bytes"));
    }
    if config.limits.max_uri_bytes > config.limits.max_header_bytes {
        errors.push(ValidationError::UriLargerThanHeader);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
