//! Handshake negotiation tests: dialect detection precedence and
//! byte-exact per-dialect responses.

use websocket_server::protocol::{build, parse, BuildError, Dialect, HandshakePolicy, ParseError};

mod common;
use common::{hixie76_request, request, rfc6455_request};

#[test]
fn test_rfc6455_response_byte_exact() {
    let header = parse(&rfc6455_request()).unwrap();
    assert_eq!(header.dialect, Dialect::Rfc6455);

    let response = build(&header, &HandshakePolicy::default()).unwrap();
    assert_eq!(
        response,
        b"HTTP/1.1 101 Switching Protocols\r\n\
          Upgrade: websocket\r\n\
          Connection: Upgrade\r\n\
          Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\r\n"
            .to_vec()
    );
}

#[test]
fn test_rfc6455_subprotocol_selection() {
    let header = parse(&rfc6455_request()).unwrap();
    let policy = HandshakePolicy {
        subprotocols: vec!["superchat".to_string(), "chat".to_string()],
        ..HandshakePolicy::default()
    };

    // First client-offered protocol the server supports wins, not the
    // server's own preference order.
    let response = String::from_utf8(build(&header, &policy).unwrap()).unwrap();
    assert!(response.contains("Sec-WebSocket-Protocol: chat\r\n"));
}

#[test]
fn test_rfc6455_extension_intersection() {
    let mut raw_header = parse(&rfc6455_request()).unwrap();
    raw_header.extensions = vec![
        "permessage-deflate".to_string(),
        "x-custom".to_string(),
    ];
    let policy = HandshakePolicy {
        extensions: vec!["permessage-deflate".to_string()],
        ..HandshakePolicy::default()
    };

    let response = String::from_utf8(build(&raw_header, &policy).unwrap()).unwrap();
    assert!(response.contains("Sec-WebSocket-Extensions: permessage-deflate\r\n"));
    assert!(!response.contains("x-custom"));
}

#[test]
fn test_hixie76_response_matches_draft_example() {
    let header = parse(&hixie76_request()).unwrap();
    assert_eq!(header.dialect, Dialect::Hixie76);
    assert_eq!(header.body, b"^n:ds[4U");

    let policy = HandshakePolicy {
        subprotocols: vec!["sample".to_string()],
        ..HandshakePolicy::default()
    };
    let response = build(&header, &policy).unwrap();

    // The draft's expected challenge digest trails the header block.
    assert!(response.ends_with(b"8jKS'y:G*Co,Wxa-"));
    let text = String::from_utf8_lossy(&response);
    assert!(text.starts_with("HTTP/1.1 101 WebSocket Protocol Handshake\r\n"));
    assert!(text.contains("Sec-WebSocket-Origin: http://example.com\r\n"));
    assert!(text.contains("Sec-WebSocket-Location: ws://example.com/demo\r\n"));
    assert!(text.contains("Sec-WebSocket-Protocol: sample\r\n"));
}

#[test]
fn test_hixie76_second_draft_vector() {
    let raw = request(
        "/demo",
        &[
            ("Host", "example.com"),
            ("Upgrade", "WebSocket"),
            ("Connection", "Upgrade"),
            ("Sec-WebSocket-Key1", "18x 6]8vM;54 *(5:  {   U1]8  z [  8"),
            ("Sec-WebSocket-Key2", "1_ tx7X d  <  nw  334J702) 7]o}` 0"),
            ("Origin", "http://example.com"),
        ],
        b"Tm[K T2u",
    );
    let header = parse(&raw).unwrap();
    let response = build(&header, &HandshakePolicy::default()).unwrap();
    assert!(response.ends_with(b"fQJ,fN/4F4!~K~MH"));
}

#[test]
fn test_hixie76_truncated_nonce() {
    let raw = request(
        "/",
        &[
            ("Sec-WebSocket-Key1", "1 2"),
            ("Sec-WebSocket-Key2", "3 4"),
        ],
        b"short",
    );
    let header = parse(&raw).unwrap();
    assert_eq!(
        build(&header, &HandshakePolicy::default()),
        Err(BuildError::Truncated)
    );
}

#[test]
fn test_hixie75_static_response() {
    let raw = request(
        "/live",
        &[
            ("Host", "localhost:9001"),
            ("Origin", "http://localhost"),
            ("Upgrade", "WebSocket"),
            ("Connection", "Upgrade"),
        ],
        b"",
    );
    let header = parse(&raw).unwrap();
    assert_eq!(header.dialect, Dialect::Hixie75);

    let response = String::from_utf8(build(&header, &HandshakePolicy::default()).unwrap()).unwrap();
    assert!(response.starts_with("HTTP/1.1 101 WebSocket Protocol Handshake\r\n"));
    assert!(response.contains("WebSocket-Origin: http://localhost\r\n"));
    assert!(response.contains("WebSocket-Location: ws://localhost:9001/live\r\n"));
    assert!(response.ends_with("\r\n\r\n"));
}

#[test]
fn test_dialect_detection_for_every_version() {
    for (version, dialect) in [
        ("4", Dialect::Hybi04),
        ("5", Dialect::Hybi05),
        ("6", Dialect::Hybi06),
        ("7", Dialect::Hybi07),
        ("8", Dialect::Hybi10),
        ("13", Dialect::Rfc6455),
    ] {
        let raw = request("/", &[("Sec-WebSocket-Version", version)], b"");
        let header = parse(&raw).unwrap();
        assert_eq!(header.dialect, dialect, "version {version}");
    }
}

#[test]
fn test_unrecognized_version_is_an_error() {
    for version in ["0", "9", "12", "14", "255", "banana"] {
        let raw = request("/", &[("Sec-WebSocket-Version", version)], b"");
        assert_eq!(
            parse(&raw).unwrap_err(),
            ParseError::UnsupportedDialect,
            "version {version}"
        );
    }
}

#[test]
fn test_version_outranks_hixie76_keys() {
    let raw = request(
        "/",
        &[
            ("Sec-WebSocket-Key1", "1 2"),
            ("Sec-WebSocket-Key2", "3 4"),
            ("Sec-WebSocket-Version", "13"),
        ],
        b"",
    );
    assert_eq!(parse(&raw).unwrap().dialect, Dialect::Rfc6455);
}

#[test]
fn test_hixie76_keys_outrank_upgrade_markers() {
    let raw = request(
        "/",
        &[
            ("Upgrade", "websocket"),
            ("Connection", "Upgrade"),
            ("Sec-WebSocket-Key1", "1 2"),
            ("Sec-WebSocket-Key2", "3 4"),
        ],
        b"",
    );
    assert_eq!(parse(&raw).unwrap().dialect, Dialect::Hixie76);
}

#[test]
fn test_upgrade_markers_alone_are_hixie75() {
    let raw = request(
        "/",
        &[("Upgrade", "WebSocket"), ("Connection", "keep-alive, Upgrade")],
        b"",
    );
    assert_eq!(parse(&raw).unwrap().dialect, Dialect::Hixie75);
}

#[test]
fn test_lone_rfc_key_without_version_is_unsupported() {
    // An RFC-style key with no version header matches no precedence
    // rule: rule 3 requires the request to carry no key material.
    let raw = request(
        "/",
        &[
            ("Upgrade", "websocket"),
            ("Connection", "Upgrade"),
            ("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ=="),
        ],
        b"",
    );
    assert_eq!(parse(&raw).unwrap_err(), ParseError::UnsupportedDialect);
}

#[test]
fn test_plain_http_request_is_unsupported() {
    let raw = request("/index.html", &[("Host", "example.com")], b"");
    assert_eq!(parse(&raw).unwrap_err(), ParseError::UnsupportedDialect);
}

#[test]
fn test_malformed_inputs_never_yield_a_header() {
    // Missing colon separator.
    let raw = b"GET / HTTP/1.1\r\nBroken header line\r\n\r\n".to_vec();
    assert!(matches!(parse(&raw).unwrap_err(), ParseError::Malformed(_)));

    // Missing terminating blank line.
    let raw = b"GET / HTTP/1.1\r\nHost: example.com\r\n".to_vec();
    assert_eq!(parse(&raw).unwrap_err(), ParseError::Truncated);

    // Empty buffer.
    assert_eq!(parse(b"").unwrap_err(), ParseError::Truncated);
}

#[test]
fn test_hybi_wrong_key_length_is_key_error() {
    let raw = request(
        "/",
        &[
            ("Sec-WebSocket-Version", "13"),
            ("Sec-WebSocket-Key", "dG9vc2hvcnQ="), // 8 bytes decoded
        ],
        b"",
    );
    let header = parse(&raw).unwrap();
    assert_eq!(
        build(&header, &HandshakePolicy::default()),
        Err(BuildError::KeyError)
    );
}

#[test]
fn test_hybi07_and_hybi10_use_accept_token() {
    for version in ["7", "8"] {
        let raw = request(
            "/",
            &[
                ("Sec-WebSocket-Version", version),
                ("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ=="),
            ],
            b"",
        );
        let header = parse(&raw).unwrap();
        let response = String::from_utf8(build(&header, &HandshakePolicy::default()).unwrap()).unwrap();
        assert!(
            response.contains("Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n"),
            "version {version}"
        );
    }
}

#[test]
fn test_hybi04_through_06_not_spoken() {
    for version in ["4", "5", "6"] {
        let raw = request(
            "/",
            &[
                ("Sec-WebSocket-Version", version),
                ("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ=="),
            ],
            b"",
        );
        let header = parse(&raw).unwrap();
        assert_eq!(
            build(&header, &HandshakePolicy::default()),
            Err(BuildError::UnsupportedDialect),
            "version {version}"
        );
    }
}

#[test]
fn test_host_allowlist_enforced() {
    let header = parse(&rfc6455_request()).unwrap();
    let policy = HandshakePolicy {
        hosts: vec!["other.example.com".to_string()],
        ..HandshakePolicy::default()
    };
    assert_eq!(build(&header, &policy), Err(BuildError::Forbidden));

    let policy = HandshakePolicy {
        hosts: vec!["server.example.com".to_string()],
        ..HandshakePolicy::default()
    };
    assert!(build(&header, &policy).is_ok());
}
