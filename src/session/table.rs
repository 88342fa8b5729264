//! Concurrent registry of live sessions.
//!
//! # Responsibilities
//! - Own every [`Session`] from accept to removal
//! - Serialize structural changes (insert/remove/iterate) behind one
//!   table-wide lock
//! - Keep per-session job tracking off that lock
//!
//! # Teardown Protocol
//! ```text
//! begin_disconnect()        – no new job may be admitted from here on
//!     → jobs_wait()         – block until in-flight jobs have drained
//!     → delete()            – remove under the table lock
//! ```
//! Any thread that registered a job before the flag flipped is
//! guaranteed to finish and decrement before the entry is removed, so
//! no worker ever observes a removed session.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

use crate::session::{Session, SessionId};

/// Caller-logic errors from structural table operations. Surfaced, not
/// retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    /// A session with this descriptor is already registered.
    #[error("session {0} already registered")]
    DuplicateKey(SessionId),

    /// No session with this descriptor.
    #[error("session {0} not found")]
    NotFound(SessionId),
}

/// Registry mapping connection descriptors to sessions.
///
/// Structural operations take the table-wide lock; they are expected to
/// be infrequent relative to per-event job tracking, which lives on the
/// sessions themselves.
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
}

impl SessionTable {
    pub fn new() -> SessionTable {
        SessionTable::default()
    }

    /// Create and register a session for a newly accepted connection.
    pub fn add(&self, id: SessionId, peer: SocketAddr) -> Result<Arc<Session>, TableError> {
        let mut sessions = self.write_locked();
        if sessions.contains_key(&id) {
            return Err(TableError::DuplicateKey(id));
        }
        let session = Arc::new(Session::new(id, peer));
        sessions.insert(id, Arc::clone(&session));
        tracing::trace!(session_id = id, peer = %peer, total = sessions.len(), "Session added");
        Ok(session)
    }

    /// Look up a session by descriptor.
    pub fn find(&self, id: SessionId) -> Option<Arc<Session>> {
        self.read_locked().get(&id).cloned()
    }

    /// Remove a session that has completed the teardown protocol.
    ///
    /// Calling this while the session still has jobs, or before
    /// disconnection began, is a caller bug.
    pub fn delete(&self, id: SessionId) -> Result<(), TableError> {
        let mut sessions = self.write_locked();
        let session = Self::remove_locked(&mut sessions, id)?;
        debug_assert!(
            session.is_disconnecting(),
            "session {id} removed before disconnect began"
        );
        debug_assert_eq!(session.jobs(), 0, "session {id} removed with jobs in flight");
        Ok(())
    }

    /// Remove every session under a single lock acquisition. Shutdown
    /// path; skips the teardown preconditions.
    pub fn delete_all(&self) {
        let mut sessions = self.write_locked();
        let ids: Vec<SessionId> = sessions.keys().copied().collect();
        for id in ids {
            let _ = Self::remove_locked(&mut sessions, id);
        }
        tracing::debug!("All sessions deleted");
    }

    /// Removal shared by `delete` and `delete_all`; the caller already
    /// holds the table lock.
    fn remove_locked(
        sessions: &mut HashMap<SessionId, Arc<Session>>,
        id: SessionId,
    ) -> Result<Arc<Session>, TableError> {
        let session = sessions.remove(&id).ok_or(TableError::NotFound(id))?;
        tracing::trace!(session_id = id, total = sessions.len(), "Session removed");
        Ok(session)
    }

    /// Snapshot of the current sessions; not a live view.
    pub fn all(&self) -> Vec<Arc<Session>> {
        self.read_locked().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read_locked().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_locked().is_empty()
    }

    fn read_locked(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, HashMap<SessionId, Arc<Session>>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_locked(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<SessionId, Arc<Session>>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}
