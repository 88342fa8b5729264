//! Per-connection lifecycle driver.
//!
//! # Responsibilities
//! - Generate unique session descriptors
//! - Register the session at accept, remove it via the teardown protocol
//! - Deliver one delimited request to the parser and write the response
//! - Wrap every dispatched read in a job registration
//!
//! # Design Decisions
//! - The blocking `jobs_wait` drain runs on the blocking thread pool
//! - Post-handshake payload is discarded: framing is a separate layer

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::ServerConfig;
use crate::protocol::response::{build_reject, parse_reject};
use crate::protocol::{self, Dialect, HandshakePolicy, ParseError};
use crate::session::{EventSet, Session, SessionState, SessionTable};

/// Global counter for session descriptors.
/// Relaxed ordering is sufficient since we only need uniqueness.
static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Allocate a fresh connection descriptor.
pub fn next_session_id() -> u64 {
    SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, thiserror::Error)]
enum ConnError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The request was answered with an HTTP rejection.
    #[error("handshake rejected")]
    Rejected,
}

/// Drive one accepted connection from handshake to teardown.
pub async fn handle_connection(
    mut stream: TcpStream,
    peer: std::net::SocketAddr,
    config: Arc<ServerConfig>,
    table: Arc<SessionTable>,
) {
    let id = next_session_id();
    let session = match table.add(id, peer) {
        Ok(session) => session,
        Err(err) => {
            tracing::error!(session_id = id, error = %err, "Failed to register session");
            return;
        }
    };

    match negotiate(&mut stream, &session, &config).await {
        Ok(()) => {
            if let Err(err) = event_loop(&mut stream, &session).await {
                tracing::debug!(session_id = id, error = %err, "Connection ended with error");
            }
        }
        Err(err) => {
            tracing::debug!(session_id = id, peer = %peer, error = %err, "Handshake failed");
        }
    }

    teardown(&table, &session).await;
}

/// Read the delimited request, negotiate, and write the response bytes.
async fn negotiate(
    stream: &mut TcpStream,
    session: &Arc<Session>,
    config: &ServerConfig,
) -> Result<(), ConnError> {
    let raw = read_request(stream, config).await?;

    let mut header = match protocol::parse(&raw) {
        Ok(header) => header,
        Err(err) => {
            stream.write_all(&parse_reject(&err)).await?;
            return Err(ConnError::Rejected);
        }
    };

    if header.path.len() > config.limits.max_uri_bytes {
        let err = ParseError::Malformed("request URI too large");
        stream.write_all(&parse_reject(&err)).await?;
        return Err(ConnError::Rejected);
    }

    // The Hixie76 challenge nonce may trail the header block by a few
    // bytes the first read did not pick up.
    if header.dialect == Dialect::Hixie76 && header.body.len() < 8 {
        let mut nonce = vec![0u8; 8 - header.body.len()];
        stream.read_exact(&mut nonce).await?;
        header.body.extend_from_slice(&nonce);
    }

    let policy = HandshakePolicy {
        subprotocols: config.handshake.subprotocols.clone(),
        extensions: config.handshake.extensions.clone(),
        origins: config.handshake.origins.clone(),
        hosts: config.handshake.hosts.clone(),
    };
    let response = match protocol::build(&header, &policy) {
        Ok(response) => response,
        Err(err) => {
            stream.write_all(&build_reject(&err)).await?;
            return Err(ConnError::Rejected);
        }
    };

    stream.write_all(&response).await?;
    session.complete_handshake(header.dialect);
    tracing::info!(
        session_id = session.id(),
        peer = %session.peer(),
        dialect = %header.dialect,
        path = %header.path,
        "Connection upgraded"
    );
    Ok(())
}

/// Read until the header block terminator, enforcing size limits.
async fn read_request(stream: &mut TcpStream, config: &ServerConfig) -> Result<BytesMut, ConnError> {
    let max = config.limits.max_header_bytes + config.limits.max_payload_bytes;
    let mut buf = BytesMut::with_capacity(1024);

    loop {
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            return Ok(buf);
        }
        if buf.len() > max {
            let err = ParseError::Malformed("request exceeds configured size limits");
            stream.write_all(&parse_reject(&err)).await?;
            return Err(ConnError::Rejected);
        }
        let n = stream.read_buf(&mut buf).await?;
        if n == 0 {
            // Peer closed before finishing the header block; nothing
            // sensible to answer.
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
        }
    }
}

/// Dispatch read events against the session until the peer hangs up.
///
/// Every dispatched event is bracketed by `jobs_inc`/`jobs_dec` on all
/// exit paths; a refused increment means teardown has begun elsewhere.
async fn event_loop(stream: &mut TcpStream, session: &Arc<Session>) -> Result<(), ConnError> {
    let mut buf = [0u8; 4096];
    loop {
        if session.jobs_inc().is_err() {
            return Ok(());
        }
        session.set_state(SessionState::Reading);
        session.set_events(EventSet::READ);

        let read = stream.read(&mut buf).await;
        session.set_state(SessionState::Idle);
        session.set_events(EventSet::NONE);
        session.jobs_dec();

        match read {
            Ok(0) => return Ok(()),
            Ok(n) => {
                // Frame handling lives above this crate; drop the bytes.
                tracing::trace!(session_id = session.id(), bytes = n, "Discarding payload");
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// The teardown protocol: mark disconnecting, drain jobs, remove.
async fn teardown(table: &Arc<SessionTable>, session: &Arc<Session>) {
    session.set_state(SessionState::Closing);
    if !session.begin_disconnect() {
        return;
    }

    let drained = Arc::clone(session);
    if let Err(err) = tokio::task::spawn_blocking(move || drained.jobs_wait()).await {
        tracing::error!(session_id = session.id(), error = %err, "Job drain task failed");
    }

    if let Err(err) = table.delete(session.id()) {
        tracing::error!(session_id = session.id(), error = %err, "Failed to remove session");
    } else {
        tracing::debug!(session_id = session.id(), "Session torn down");
    }
}
