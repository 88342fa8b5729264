//! Request header parsing and dialect detection.
//!
//! # Responsibilities
//! - Split one complete, CRLF-delimited upgrade request into its parts
//! - Record every header in order, recognizing a fixed vocabulary
//! - Derive the handshake dialect from which marker headers are present
//!
//! # Design Decisions
//! - Pure function over an already-delimited buffer; the transport layer
//!   owns byte delivery and delimiting
//! - Dialect precedence is a first-class ordered rule:
//!   version header > Hixie76 key pair > Hixie75 upgrade markers
//! - Unrecognized headers are retained but never influence detection

use thiserror::Error;

use crate::protocol::Dialect;

/// Errors from parsing an upgrade request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// Request line or a header line did not have the expected shape.
    #[error("malformed request: {0}")]
    Malformed(&'static str),

    /// The buffer did not contain the terminating blank line.
    #[error("truncated request: missing terminating blank line")]
    Truncated,

    /// No recognizable handshake markers, or an unrecognized version value.
    #[error("unsupported websocket dialect")]
    UnsupportedDialect,
}

/// HTTP methods accepted on the upgrade path.
const METHODS: &[&str] = &["GET"];

/// HTTP versions accepted on the upgrade path.
const VERSIONS: &[&str] = &["HTTP/1.1", "HTTP/2.0"];

/// Header names the parser recognizes. Everything else is retained in the
/// ordered field list but ignored by dialect detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KnownHeader {
    Host,
    Origin,
    Cookie,
    Connection,
    Upgrade,
    SecWebSocketKey,
    SecWebSocketKey1,
    SecWebSocketKey2,
    SecWebSocketVersion,
    SecWebSocketProtocol,
    SecWebSocketExtensions,
    SecWebSocketOrigin,
    WebSocketProtocol,
}

impl KnownHeader {
    fn from_name(name: &str) -> Option<KnownHeader> {
        const TABLE: &[(&str, KnownHeader)] = &[
            ("Host", KnownHeader::Host),
            ("Origin", KnownHeader::Origin),
            ("Cookie", KnownHeader::Cookie),
            ("Connection", KnownHeader::Connection),
            ("Upgrade", KnownHeader::Upgrade),
            ("Sec-WebSocket-Key", KnownHeader::SecWebSocketKey),
            ("Sec-WebSocket-Key1", KnownHeader::SecWebSocketKey1),
            ("Sec-WebSocket-Key2", KnownHeader::SecWebSocketKey2),
            ("Sec-WebSocket-Version", KnownHeader::SecWebSocketVersion),
            ("Sec-WebSocket-Protocol", KnownHeader::SecWebSocketProtocol),
            ("Sec-WebSocket-Extensions", KnownHeader::SecWebSocketExtensions),
            ("Sec-WebSocket-Origin", KnownHeader::SecWebSocketOrigin),
            ("WebSocket-Protocol", KnownHeader::WebSocketProtocol),
        ];
        TABLE
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, h)| *h)
    }
}

/// A parsed upgrade request.
///
/// Owned by the caller; dropped once the handshake has completed or failed.
#[derive(Debug, Clone, Default)]
pub struct Header {
    /// Detected handshake dialect.
    pub dialect: Dialect,
    /// Every header in request order, duplicates preserved.
    pub fields: Vec<(String, String)>,
    /// Requested resource path.
    pub path: String,
    /// `Host` value.
    pub host: Option<String>,
    /// `Origin` or `Sec-WebSocket-Origin` value.
    pub origin: Option<String>,
    /// `Sec-WebSocket-Key` value (RFC 6455 / hybi-04 and later).
    pub key: Option<String>,
    /// `Sec-WebSocket-Key1` value (Hixie76).
    pub key1: Option<String>,
    /// `Sec-WebSocket-Key2` value (Hixie76).
    pub key2: Option<String>,
    /// Offered subprotocols in request order.
    pub subprotocols: Vec<String>,
    /// Offered extensions in request order.
    pub extensions: Vec<String>,
    /// Numeric `Sec-WebSocket-Version` when present and numeric.
    pub version: Option<u16>,
    /// Raw bytes following the header block (Hixie76 challenge nonce).
    pub body: Vec<u8>,
}

impl Header {
    /// First value recorded for `name`, matched case-insensitively.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Parse one complete upgrade request into a [`Header`].
///
/// The buffer must hold the full request: request line, header lines, the
/// terminating blank line and any trailing body bytes, CRLF-delimited
/// throughout. The transport layer is responsible for reading that much.
pub fn parse(raw: &[u8]) -> Result<Header, ParseError> {
    let head_end = find_blank_line(raw).ok_or(ParseError::Truncated)?;
    let head =
        std::str::from_utf8(&raw[..head_end]).map_err(|_| ParseError::Malformed("non-ASCII header block"))?;
    let body = raw[head_end + 4..].to_vec();

    let mut lines = head.split("\r\n");
    let request_line = lines.next().ok_or(ParseError::Malformed("empty request"))?;
    let path = parse_request_line(request_line)?;

    let mut header = Header {
        path,
        body,
        ..Header::default()
    };
    let mut upgrade: Option<String> = None;
    let mut connection: Option<String> = None;
    let mut version_raw: Option<String> = None;

    for line in lines {
        if line.is_empty() {
            continue;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or(ParseError::Malformed("header line without colon"))?;
        let name = name.trim();
        let value = value.trim();
        header.fields.push((name.to_string(), value.to_string()));

        match KnownHeader::from_name(name) {
            Some(KnownHeader::Host) => header.host = Some(value.to_string()),
            Some(KnownHeader::Origin) | Some(KnownHeader::SecWebSocketOrigin) => {
                header.origin = Some(value.to_string())
            }
            Some(KnownHeader::Connection) => connection = Some(value.to_string()),
            Some(KnownHeader::Upgrade) => upgrade = Some(value.to_string()),
            Some(KnownHeader::SecWebSocketKey) => header.key = Some(value.to_string()),
            Some(KnownHeader::SecWebSocketKey1) => header.key1 = Some(value.to_string()),
            Some(KnownHeader::SecWebSocketKey2) => header.key2 = Some(value.to_string()),
            Some(KnownHeader::SecWebSocketVersion) => version_raw = Some(value.to_string()),
            Some(KnownHeader::SecWebSocketProtocol) | Some(KnownHeader::WebSocketProtocol) => {
                header
                    .subprotocols
                    .extend(split_list(value).map(str::to_string));
            }
            Some(KnownHeader::SecWebSocketExtensions) => {
                header
                    .extensions
                    .extend(split_list(value).map(str::to_string));
            }
            Some(KnownHeader::Cookie) | None => {}
        }
    }

    header.dialect = detect_dialect(
        &header,
        version_raw.as_deref(),
        upgrade.as_deref(),
        connection.as_deref(),
    )?;
    if let Some(raw) = version_raw.as_deref() {
        header.version = raw.trim().parse().ok();
    }

    Ok(header)
}

/// Locate the `\r\n\r\n` separating headers from body.
fn find_blank_line(raw: &[u8]) -> Option<usize> {
    raw.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Validate `METHOD path HTTP-VERSION` and return the path.
fn parse_request_line(line: &str) -> Result<String, ParseError> {
    let mut parts = line.split(' ').filter(|p| !p.is_empty());
    let method = parts.next().ok_or(ParseError::Malformed("empty request line"))?;
    let path = parts.next().ok_or(ParseError::Malformed("request line without path"))?;
    let version = parts
        .next()
        .ok_or(ParseError::Malformed("request line without HTTP version"))?;

    if !METHODS.contains(&method) {
        return Err(ParseError::Malformed("method not allowed on upgrade path"));
    }
    if !VERSIONS.contains(&version) {
        return Err(ParseError::Malformed("unsupported HTTP version"));
    }

    let absolute = ["ws://", "wss://", "http://", "https://"].iter().any(|scheme| {
        path.len() >= scheme.len()
            && path.as_bytes()[..scheme.len()].eq_ignore_ascii_case(scheme.as_bytes())
    });
    if !path.starts_with('/') && !absolute {
        return Err(ParseError::Malformed(
            "resource is neither a relative path nor an absolute URI",
        ));
    }

    Ok(path.to_string())
}

/// Apply the dialect precedence rule: version > Hixie76 keys > Hixie75
/// upgrade markers. An unrecognized version value is an error, not Unknown.
fn detect_dialect(
    header: &Header,
    version_raw: Option<&str>,
    upgrade: Option<&str>,
    connection: Option<&str>,
) -> Result<Dialect, ParseError> {
    if let Some(raw) = version_raw {
        let version: u16 = raw
            .trim()
            .parse()
            .map_err(|_| ParseError::UnsupportedDialect)?;
        return Dialect::from_version(version).ok_or(ParseError::UnsupportedDialect);
    }

    if header.key1.is_some() && header.key2.is_some() {
        return Ok(Dialect::Hixie76);
    }

    let no_keys = header.key.is_none() && header.key1.is_none() && header.key2.is_none();
    let upgrade_ok = upgrade.is_some_and(|u| u.eq_ignore_ascii_case("websocket"));
    let connection_ok =
        connection.is_some_and(|c| split_list(c).any(|token| token.eq_ignore_ascii_case("upgrade")));
    if no_keys && upgrade_ok && connection_ok {
        return Ok(Dialect::Hixie75);
    }

    Err(ParseError::UnsupportedDialect)
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}
