//! Per-connection session state and job tracking.
//!
//! # Responsibilities
//! - Hold one connection's lifecycle state, event flags and dialect
//! - Count in-flight jobs dispatched against the session
//! - Refuse new jobs once disconnection has begun
//! - Let the teardown path block until all jobs have drained
//!
//! # Data Flow
//! ```text
//! Session States:
//!     Connecting → Idle (handshake complete)
//!          → Reading / Writing (event dispatched)
//!          → Idle (event complete)
//!          → Closing (teardown, terminal)
//!     Any state → Closing on error or peer close
//! ```
//!
//! # Design Decisions
//! - The job counter and disconnecting flag share one mutex so that
//!   check-and-increment is a single atomic step
//! - Job tracking never touches the table-wide lock; the hot path only
//!   contends with jobs on the same session
//! - Decrementing below zero is an asserted defect, not an error value

pub mod table;

pub use table::{SessionTable, TableError};

use std::net::SocketAddr;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::protocol::Dialect;

/// Unique connection descriptor, immutable for the session's lifetime.
pub type SessionId = u64;

/// Returned by [`Session::jobs_inc`] once disconnection has begun.
///
/// The caller must abandon the dispatched unit of work for this session
/// without decrementing.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("session is already disconnecting")]
pub struct AlreadyDisconnecting;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Accepted but not yet handshaked.
    #[default]
    Connecting,
    /// Handshaked, waiting for events.
    Idle,
    /// A read event is being handled.
    Reading,
    /// A write event is being handled.
    Writing,
    /// Teardown has begun; terminal.
    Closing,
}

/// Readiness events pending on a session. Flags combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventSet(u8);

impl EventSet {
    /// No pending events.
    pub const NONE: EventSet = EventSet(0);
    /// Read readiness.
    pub const READ: EventSet = EventSet(1);
    /// Write readiness.
    pub const WRITE: EventSet = EventSet(2);

    pub fn contains(self, other: EventSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: EventSet) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: EventSet) {
        self.0 &= !other.0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for EventSet {
    type Output = EventSet;

    fn bitor(self, rhs: EventSet) -> EventSet {
        EventSet(self.0 | rhs.0)
    }
}

/// Mutable session fields, guarded together.
#[derive(Debug, Default)]
struct SessionInner {
    state: SessionState,
    events: EventSet,
    dialect: Dialect,
}

/// Job counter and disconnecting flag. One mutex guards both so that
/// `jobs_inc` can check and increment in a single step.
#[derive(Debug, Default)]
struct JobState {
    count: usize,
    disconnecting: bool,
}

/// One active connection.
///
/// Owned exclusively by the [`SessionTable`]; other components hold
/// `Arc` references handed out by `add`/`find` and must follow the
/// teardown protocol before the table removes the entry.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    peer: SocketAddr,
    inner: Mutex<SessionInner>,
    jobs: Mutex<JobState>,
    jobs_drained: Condvar,
}

impl Session {
    pub(crate) fn new(id: SessionId, peer: SocketAddr) -> Session {
        Session {
            id,
            peer,
            inner: Mutex::new(SessionInner::default()),
            jobs: Mutex::new(JobState::default()),
            jobs_drained: Condvar::new(),
        }
    }

    /// The connection descriptor this session is keyed by.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Peer address of the connection.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn state(&self) -> SessionState {
        self.lock_inner().state
    }

    pub fn set_state(&self, state: SessionState) {
        self.lock_inner().state = state;
    }

    pub fn events(&self) -> EventSet {
        self.lock_inner().events
    }

    pub fn set_events(&self, events: EventSet) {
        self.lock_inner().events = events;
    }

    pub fn dialect(&self) -> Dialect {
        self.lock_inner().dialect
    }

    /// Record a completed handshake: stores the negotiated dialect and
    /// moves the session from Connecting to Idle.
    pub fn complete_handshake(&self, dialect: Dialect) {
        let mut inner = self.lock_inner();
        inner.dialect = dialect;
        inner.state = SessionState::Idle;
        tracing::debug!(session_id = self.id, %dialect, "Handshake complete");
    }

    /// Register one dispatched unit of work against this session.
    ///
    /// Check and increment happen under one lock acquisition: once
    /// disconnection has begun this fails for every caller, with no
    /// interleaving that lets a late job slip through.
    pub fn jobs_inc(&self) -> Result<(), AlreadyDisconnecting> {
        let mut jobs = self.lock_jobs();
        if jobs.disconnecting {
            return Err(AlreadyDisconnecting);
        }
        jobs.count += 1;
        tracing::trace!(session_id = self.id, jobs = jobs.count, "Job registered");
        Ok(())
    }

    /// Finish one unit of work. Every successful [`Session::jobs_inc`]
    /// must be paired with exactly one call on every exit path.
    pub fn jobs_dec(&self) {
        let mut jobs = self.lock_jobs();
        assert!(jobs.count > 0, "job counter underflow on session {}", self.id);
        jobs.count -= 1;
        tracing::trace!(session_id = self.id, jobs = jobs.count, "Job finished");
        if jobs.count == 0 {
            self.jobs_drained.notify_all();
        }
    }

    /// Block the calling thread until the job counter reaches zero.
    ///
    /// No timeout or cancellation; a caller needing a bounded wait must
    /// layer a deadline around this.
    pub fn jobs_wait(&self) {
        let mut jobs = self.lock_jobs();
        while jobs.count > 0 {
            jobs = self
                .jobs_drained
                .wait(jobs)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Current job count; diagnostic only, stale the moment it returns.
    pub fn jobs(&self) -> usize {
        self.lock_jobs().count
    }

    /// Mark the session disconnecting. Returns true for the one caller
    /// that flipped the flag, so teardown runs exactly once. The flag is
    /// monotonic: it never reverts.
    pub fn begin_disconnect(&self) -> bool {
        let mut jobs = self.lock_jobs();
        if jobs.disconnecting {
            return false;
        }
        jobs.disconnecting = true;
        tracing::trace!(session_id = self.id, jobs = jobs.count, "Disconnect begun");
        true
    }

    pub fn is_disconnecting(&self) -> bool {
        self.lock_jobs().disconnecting
    }

    fn lock_inner(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_jobs(&self) -> MutexGuard<'_, JobState> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
