//! Shared fixtures for the integration suites.

/// Assemble a raw upgrade request from header lines and body bytes.
pub fn request(path: &str, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let mut raw = format!("GET {path} HTTP/1.1\r\n");
    for (name, value) in headers {
        raw.push_str(&format!("{name}: {value}\r\n"));
    }
    raw.push_str("\r\n");
    let mut bytes = raw.into_bytes();
    bytes.extend_from_slice(body);
    bytes
}

/// The RFC 6455 §1.2 sample client handshake.
pub fn rfc6455_request() -> Vec<u8> {
    request(
        "/chat",
        &[
            ("Host", "server.example.com"),
            ("Upgrade", "websocket"),
            ("Connection", "Upgrade"),
            ("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ=="),
            ("Origin", "http://example.com"),
            ("Sec-WebSocket-Protocol", "chat, superchat"),
            ("Sec-WebSocket-Version", "13"),
        ],
        b"",
    )
}

/// The draft-hixie-76 §1.2 example handshake, body nonce included.
pub fn hixie76_request() -> Vec<u8> {
    request(
        "/demo",
        &[
            ("Host", "example.com"),
            ("Connection", "Upgrade"),
            ("Sec-WebSocket-Key2", "12998 5 Y3 1  .P00"),
            ("Sec-WebSocket-Protocol", "sample"),
            ("Upgrade", "WebSocket"),
            ("Sec-WebSocket-Key1", "4 @1  46546xW%0l 1 5"),
            ("Origin", "http://example.com"),
        ],
        b"^n:ds[4U",
    )
}
