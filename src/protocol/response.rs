//! Plain HTTP rejection responses.
//!
//! When negotiation fails the client is told why with an ordinary HTTP
//! error and the connection is closed. The transport layer writes these
//! bytes and hangs up; nothing here retries.

use crate::protocol::{BuildError, ParseError};

/// Status line + small HTML body, `Connection: close`.
fn simple_response(code: u16, reason: &str, explanation: &str) -> Vec<u8> {
    let body = format!(
        "<html><head><title>{code} {reason}</title></head><body><h1>{code} {reason}</h1><p>{explanation}</p></body></html>"
    );
    format!(
        "HTTP/1.1 {code} {reason}\r\n\
         Content-Type: text/html\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n{body}",
        body.len()
    )
    .into_bytes()
}

/// Rejection bytes for a request that failed to parse.
pub fn parse_reject(err: &ParseError) -> Vec<u8> {
    match err {
        ParseError::Malformed(_) | ParseError::Truncated => simple_response(
            400,
            "Bad Request",
            "Unable to parse http header as websocket request.",
        ),
        ParseError::UnsupportedDialect => simple_response(
            426,
            "Upgrade Required",
            "This service requires use of the websocket protocol.",
        ),
    }
}

/// Rejection bytes for a request whose response could not be built.
pub fn build_reject(err: &BuildError) -> Vec<u8> {
    match err {
        BuildError::KeyError | BuildError::Truncated => simple_response(
            400,
            "Bad Request",
            "The websocket handshake key material was invalid.",
        ),
        BuildError::UnsupportedDialect => simple_response(
            501,
            "Not Implemented",
            "This websocket protocol revision is not implemented.",
        ),
        BuildError::Forbidden => simple_response(
            403,
            "Forbidden",
            "The origin is not allowed to establish a websocket connection.",
        ),
    }
}
