//! Session table: pairs one producer connection with at most one consumer.

mod memory;


pub use memory::MemorySessionStore;

use std::time::{Duration, Instant};

use companion_common::{ConnectionId, RelayError};

/// Role a connection plays inside a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Producer,
    Consumer,
}

/// A live pairing session.
#[derive(Debug, Clone)]
pub struct Session {
    pub code: String,
    /// Fixed for the lifetime of the session.
    pub producer: ConnectionId,
    pub consumer: Option<ConnectionId>,
    pub created_at: Instant,
    /// Last create, join, payload update or liveness ping. Drives idle reaping.
    pub last_activity: Instant,
    /// Empty until the producer sends its first update.
    pub last_payload: String,
}

impl Session {
    pub fn new(code: String, producer: ConnectionId) -> Self {
        let now = Instant::now();
        Self {
            code,
            producer,
            consumer: None,
            created_at: now,
            last_activity: now,
            last_payload: String::new(),
        }
    }

    /// True while no consumer is bound.
    pub fn is_open(&self) -> bool {
        self.consumer.is_none()
    }
}

/// Result of tearing down whatever a disconnecting connection was bound to.
#[derive(Debug, Clone)]
pub enum DisconnectOutcome {
    /// Every session the connection produced, already removed from the table.
    Producer { ended: Vec<Session> },
    /// The session the connection consumed, now open again.
    Consumer { session: Session },
}

impl DisconnectOutcome {
    pub fn role(&self) -> Role {
        match self {
            DisconnectOutcome::Producer { .. } => Role::Producer,
            DisconnectOutcome::Consumer { .. } => Role::Consumer,
        }
    }
}

/// Authoritative owner of the session table and its reverse indices.
///
/// Implementations are single-writer; callers serialize access (the
/// gateway holds one lock around each store operation and the sends it
/// triggers).
pub trait SessionStore: Send + 'static {
    /// Allocate a fresh code and register `producer` as its owner.
    fn create_session(&mut self, producer: &ConnectionId) -> Result<Session, RelayError>;

    /// Bind `consumer` to the session identified by `code` (case-insensitive).
    fn join_session(&mut self, code: &str, consumer: &ConnectionId)
        -> Result<Session, RelayError>;

    /// Most recently created live session owned by `connection`.
    fn find_by_producer(&self, connection: &ConnectionId) -> Option<&Session>;

    fn find_by_consumer(&self, connection: &ConnectionId) -> Option<&Session>;

    /// Overwrite the session's payload. Returns false if no such session.
    fn update_payload(&mut self, code: &str, payload: String) -> bool;

    fn remove_session(&mut self, code: &str) -> Option<Session>;

    /// Mark every session `connection` is bound to as active. Returns false
    /// if it is bound to none.
    fn touch(&mut self, connection: &ConnectionId) -> bool;

    /// Apply the lifecycle transition for a dropped connection. `None` when
    /// the connection never completed a create or join.
    fn handle_disconnect(&mut self, connection: &ConnectionId) -> Option<DisconnectOutcome>;

    /// Remove sessions whose last activity is older than `max_idle` at `now`.
    fn reap_idle(&mut self, max_idle: Duration, now: Instant) -> Vec<Session>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
