//! Upgrade response construction.
//!
//! # Responsibilities
//! - Derive per-dialect key material (SHA-1 accept token, Hixie76 digest)
//! - Assemble the dialect-mandated `101` response bytes
//! - Apply server policy: subprotocol selection, extension intersection,
//!   origin and host allowlists
//!
//! # Design Decisions
//! - Pure function; safe to call from any thread with no shared state
//! - Every dialect is matched exhaustively, no silent default arm
//! - Key validation happens before any hashing

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use md5::Md5;
use sha1::{Digest, Sha1};
use thiserror::Error;

use crate::protocol::{
    Dialect, Header, HANDSHAKE_GUID, HIXIE76_DIGEST_LENGTH, SEC_WEBSOCKET_KEY_LENGTH,
};

/// Errors from building an upgrade response.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    /// Key material was missing, the wrong length, or numerically invalid.
    #[error("invalid handshake key material")]
    KeyError,

    /// The Hixie76 challenge requires 8 body bytes that were not present.
    #[error("truncated handshake: missing challenge bytes")]
    Truncated,

    /// The server does not speak this handshake revision.
    #[error("unsupported websocket dialect")]
    UnsupportedDialect,

    /// The client Origin or Host is not in the configured allowlist.
    #[error("origin or host not allowed")]
    Forbidden,
}

/// Server-side negotiation policy, typically taken from configuration.
///
/// Empty allowlists mean "accept any"; empty support sets mean "offer none".
#[derive(Debug, Clone, Default)]
pub struct HandshakePolicy {
    /// Subprotocols the server supports, in preference order.
    pub subprotocols: Vec<String>,
    /// Extensions the server supports.
    pub extensions: Vec<String>,
    /// Accepted `Origin` values; empty accepts all.
    pub origins: Vec<String>,
    /// Accepted `Host` values; empty accepts all.
    pub hosts: Vec<String>,
}

/// Build the upgrade response for a parsed request.
///
/// The returned bytes are ready to be written back to the peer verbatim;
/// for Hixie76 they end in the 16-byte binary challenge digest.
pub fn build(header: &Header, policy: &HandshakePolicy) -> Result<Vec<u8>, BuildError> {
    check_allowlists(header, policy)?;

    match header.dialect {
        Dialect::Rfc6455 | Dialect::Hybi07 | Dialect::Hybi10 => build_hybi(header, policy),
        Dialect::Hixie76 => build_hixie76(header, policy),
        Dialect::Hixie75 => Ok(build_hixie75(header, policy)),
        Dialect::Hybi04 | Dialect::Hybi05 | Dialect::Hybi06 | Dialect::Unknown => {
            Err(BuildError::UnsupportedDialect)
        }
    }
}

/// Derive the `Sec-WebSocket-Accept` token for RFC 6455 / hybi-07+.
pub fn accept_token(key: &str) -> String {
    let mut sha1 = Sha1::new();
    sha1.update(key.as_bytes());
    sha1.update(HANDSHAKE_GUID.as_bytes());
    BASE64_STANDARD.encode(sha1.finalize())
}

fn check_allowlists(header: &Header, policy: &HandshakePolicy) -> Result<(), BuildError> {
    if !policy.hosts.is_empty() {
        let host = header.host.as_deref().unwrap_or("");
        if !policy.hosts.iter().any(|h| h.eq_ignore_ascii_case(host)) {
            return Err(BuildError::Forbidden);
        }
    }
    if !policy.origins.is_empty() {
        let origin = header.origin.as_deref().unwrap_or("");
        if !policy.origins.iter().any(|o| o.eq_ignore_ascii_case(origin)) {
            return Err(BuildError::Forbidden);
        }
    }
    Ok(())
}

/// First client-offered subprotocol the server also supports.
fn select_subprotocol<'a>(header: &'a Header, policy: &HandshakePolicy) -> Option<&'a str> {
    header
        .subprotocols
        .iter()
        .find(|offered| policy.subprotocols.iter().any(|s| s == *offered))
        .map(String::as_str)
}

/// Client-offered extensions the server also supports, in offer order.
fn select_extensions<'a>(header: &'a Header, policy: &HandshakePolicy) -> Vec<&'a str> {
    header
        .extensions
        .iter()
        .filter(|offered| policy.extensions.iter().any(|e| e == *offered))
        .map(String::as_str)
        .collect()
}

fn build_hybi(header: &Header, policy: &HandshakePolicy) -> Result<Vec<u8>, BuildError> {
    let key = header.key.as_deref().ok_or(BuildError::KeyError)?;
    let decoded = BASE64_STANDARD
        .decode(key)
        .map_err(|_| BuildError::KeyError)?;
    if decoded.len() != SEC_WEBSOCKET_KEY_LENGTH {
        return Err(BuildError::KeyError);
    }

    let mut response = String::from("HTTP/1.1 101 Switching Protocols\r\n");
    response.push_str("Upgrade: websocket\r\n");
    response.push_str("Connection: Upgrade\r\n");
    response.push_str(&format!("Sec-WebSocket-Accept: {}\r\n", accept_token(key)));
    if let Some(subprotocol) = select_subprotocol(header, policy) {
        response.push_str(&format!("Sec-WebSocket-Protocol: {subprotocol}\r\n"));
    }
    let extensions = select_extensions(header, policy);
    if !extensions.is_empty() {
        response.push_str(&format!(
            "Sec-WebSocket-Extensions: {}\r\n",
            extensions.join(", ")
        ));
    }
    response.push_str("\r\n");

    Ok(response.into_bytes())
}

/// Reduce a Hixie76 key to its challenge number: the concatenated digit
/// characters divided by the count of space characters. Division must be
/// exact and the result must fit 32 bits.
fn hixie76_challenge(key: &str) -> Result<u32, BuildError> {
    let digits: String = key.chars().filter(|c| c.is_ascii_digit()).collect();
    let spaces = key.chars().filter(|&c| c == ' ').count() as u64;
    if spaces == 0 {
        return Err(BuildError::KeyError);
    }

    let number: u64 = digits.parse().map_err(|_| BuildError::KeyError)?;
    if number % spaces != 0 {
        return Err(BuildError::KeyError);
    }
    let challenge = number / spaces;
    if challenge == 0 || challenge > u64::from(u32::MAX) {
        return Err(BuildError::KeyError);
    }
    Ok(challenge as u32)
}

fn build_hixie76(header: &Header, policy: &HandshakePolicy) -> Result<Vec<u8>, BuildError> {
    let key1 = header.key1.as_deref().ok_or(BuildError::KeyError)?;
    let key2 = header.key2.as_deref().ok_or(BuildError::KeyError)?;
    let number1 = hixie76_challenge(key1)?;
    let number2 = hixie76_challenge(key2)?;
    if header.body.len() < 8 {
        return Err(BuildError::Truncated);
    }

    let mut md5 = Md5::new();
    md5.update(number1.to_be_bytes());
    md5.update(number2.to_be_bytes());
    md5.update(&header.body[..8]);
    let digest = md5.finalize();
    debug_assert_eq!(digest.len(), HIXIE76_DIGEST_LENGTH);

    let mut response = String::from("HTTP/1.1 101 WebSocket Protocol Handshake\r\n");
    response.push_str("Upgrade: WebSocket\r\n");
    response.push_str("Connection: Upgrade\r\n");
    if let Some(origin) = header.origin.as_deref() {
        response.push_str(&format!("Sec-WebSocket-Origin: {origin}\r\n"));
    }
    if let Some(host) = header.host.as_deref() {
        response.push_str(&format!(
            "Sec-WebSocket-Location: ws://{host}{}\r\n",
            header.path
        ));
    }
    if let Some(subprotocol) = select_subprotocol(header, policy) {
        response.push_str(&format!("Sec-WebSocket-Protocol: {subprotocol}\r\n"));
    }
    response.push_str("\r\n");

    let mut bytes = response.into_bytes();
    bytes.extend_from_slice(&digest);
    Ok(bytes)
}

fn build_hixie75(header: &Header, policy: &HandshakePolicy) -> Vec<u8> {
    let mut response = String::from("HTTP/1.1 101 WebSocket Protocol Handshake\r\n");
    response.push_str("Upgrade: WebSocket\r\n");
    response.push_str("Connection: Upgrade\r\n");
    if let Some(origin) = header.origin.as_deref() {
        response.push_str(&format!("WebSocket-Origin: {origin}\r\n"));
    }
    if let Some(host) = header.host.as_deref() {
        response.push_str(&format!("WebSocket-Location: ws://{host}{}\r\n", header.path));
    }
    if let Some(subprotocol) = select_subprotocol(header, policy) {
        response.push_str(&format!("WebSocket-Protocol: {subprotocol}\r\n"));
    }
    response.push_str("\r\n");
    response.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_token_rfc_vector() {
        // Sample nonce from RFC 6455 §1.3.
        assert_eq!(
            accept_token("dGhlIHNhbXBsZSBub25jZQ=="),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }

    #[test]
    fn test_hixie76_challenge_draft_vectors() {
        // Key examples from draft-hixie-thewebsocketprotocol-76 §1.2.
        assert_eq!(
            hixie76_challenge("18x 6]8vM;54 *(5:  {   U1]8  z [  8"),
            Ok(155_712_099)
        );
        assert_eq!(
            hixie76_challenge("1_ tx7X d  <  nw  334J702) 7]o}` 0"),
            Ok(173_347_027)
        );
    }

    #[test]
    fn test_hixie76_challenge_rejects_bad_keys() {
        // No spaces to divide by.
        assert_eq!(hixie76_challenge("123456"), Err(BuildError::KeyError));
        // 7 is not divisible by 2 spaces.
        assert_eq!(hixie76_challenge(" 7 "), Err(BuildError::KeyError));
        // No digits at all.
        assert_eq!(hixie76_challenge("a b c"), Err(BuildError::KeyError));
        // Digit string exceeds u64.
        assert_eq!(
            hixie76_challenge("9 9999999999999999999999999"),
            Err(BuildError::KeyError)
        );
    }

    #[test]
    fn test_hybi_key_must_decode_to_16_bytes() {
        let header = Header {
            dialect: Dialect::Rfc6455,
            key: Some("c2hvcnQ=".to_string()), // "short"
            ..Header::default()
        };
        assert_eq!(
            build(&header, &HandshakePolicy::default()),
            Err(BuildError::KeyError)
        );
    }

    #[test]
    fn test_unsupported_dialects_refused() {
        for dialect in [Dialect::Hybi04, Dialect::Hybi05, Dialect::Hybi06, Dialect::Unknown] {
            let header = Header {
                dialect,
                ..Header::default()
            };
            assert_eq!(
                build(&header, &HandshakePolicy::default()),
                Err(BuildError::UnsupportedDialect)
            );
        }
    }

    #[test]
    fn test_origin_allowlist() {
        let header = Header {
            dialect: Dialect::Rfc6455,
            key: Some("dGhlIHNhbXBsZSBub25jZQ==".to_string()),
            origin: Some("http://evil.example".to_string()),
            ..Header::default()
        };
        let policy = HandshakePolicy {
            origins: vec!["http://good.example".to_string()],
            ..HandshakePolicy::default()
        };
        assert_eq!(build(&header, &policy), Err(BuildError::Forbidden));
    }
}
