//! Relay gateway: per-connection protocol state machine and fan-out.
//!
//! Every inbound event runs as one unit under a single lock that covers
//! both the session store and the outbound queues. A catch-up payload
//! queued on join is therefore always ahead of any live update queued
//! afterwards for the same consumer.
//!
//! Outboxes are bounded. A peer whose queue is full is evicted through the
//! normal disconnect path once the current event finishes.


use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use companion_common::{ConnectionId, RelayError};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::{DisconnectOutcome, MemorySessionStore, Session, SessionStore};

pub const REASON_PRODUCER_LEFT: &str = "Producer disconnected";
pub const REASON_EXPIRED: &str = "Session expired";

pub const DEFAULT_OUTBOX_CAPACITY: usize = 256;

/// Protocol state of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unbound,
    Producer,
    Consumer,
}

struct Peer {
    state: ConnectionState,
    outbox: mpsc::Sender<ServerMessage>,
}

struct Inner<S> {
    store: S,
    peers: HashMap<ConnectionId, Peer>,
    /// Peers whose outbox overflowed during the current event.
    evicted: Vec<ConnectionId>,
    outbox_capacity: usize,
}

/// Shared handle to the broker. Cheap to clone.
pub struct RelayGateway<S = MemorySessionStore> {
    inner: Arc<Mutex<Inner<S>>>,
}

impl<S> Clone for RelayGateway<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: SessionStore> RelayGateway<S> {
    pub fn new(store: S) -> Self {
        Self::with_outbox_capacity(store, DEFAULT_OUTBOX_CAPACITY)
    }

    /// `capacity` bounds how many messages may queue for one connection.
    pub fn with_outbox_capacity(store: S, capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                store,
                peers: HashMap::new(),
                evicted: Vec::new(),
                outbox_capacity: capacity.max(1),
            })),
        }
    }

    /// Register a new transport connection. Messages for it arrive on the
    /// returned receiver until it disconnects or is evicted, after which the
    /// receiver yields `None`.
    pub async fn connect(&self) -> (ConnectionId, mpsc::Receiver<ServerMessage>) {
        let mut inner = self.inner.lock().await;
        let (tx, rx) = mpsc::channel(inner.outbox_capacity);
        let id = ConnectionId::new();
        inner.peers.insert(
            id.clone(),
            Peer {
                state: ConnectionState::Unbound,
                outbox: tx,
            },
        );
        (id, rx)
    }

    /// Apply one inbound protocol message from `conn`.
    pub async fn handle(&self, conn: &ConnectionId, msg: ClientMessage) {
        let mut inner = self.inner.lock().await;
        match msg {
            ClientMessage::RequestCreate => inner.request_create(conn),
            ClientMessage::RequestJoin { code } => inner.request_join(conn, code),
            ClientMessage::PayloadUpdate { payload } => inner.payload_update(conn, payload),
        }
        inner.flush_evictions();
    }

    /// Tell `conn` its last frame could not be understood. No state changes.
    pub async fn reject(&self, conn: &ConnectionId, message: String) {
        let mut inner = self.inner.lock().await;
        inner.send(conn, ServerMessage::Error { message });
        inner.flush_evictions();
    }

    /// Record liveness traffic (ping/pong) for whatever `conn` is bound to.
    pub async fn touch(&self, conn: &ConnectionId) -> bool {
        self.inner.lock().await.store.touch(conn)
    }

    /// Transport-level disconnect: forget the connection and notify the
    /// remaining peer, if any.
    pub async fn disconnect(&self, conn: &ConnectionId) {
        let mut inner = self.inner.lock().await;
        inner.disconnect(conn);
        inner.flush_evictions();
    }

    /// Drop sessions idle for longer than `max_idle`. Returns how many.
    pub async fn reap_idle(&self, max_idle: Duration) -> usize {
        self.reap_idle_at(max_idle, Instant::now()).await
    }

    pub async fn reap_idle_at(&self, max_idle: Duration, now: Instant) -> usize {
        let mut inner = self.inner.lock().await;
        let reaped = inner.store.reap_idle(max_idle, now);
        for session in &reaped {
            inner.end_session(session, REASON_EXPIRED, true);
        }
        inner.flush_evictions();
        reaped.len()
    }

    pub async fn session_count(&self) -> usize {
        self.inner.lock().await.store.len()
    }

    /// `None` once the connection is gone.
    pub async fn state_of(&self, conn: &ConnectionId) -> Option<ConnectionState> {
        self.inner.lock().await.peers.get(conn).map(|p| p.state)
    }
}

impl<S: SessionStore> Inner<S> {
    fn state(&self, conn: &ConnectionId) -> ConnectionState {
        self.peers
            .get(conn)
            .map_or(ConnectionState::Unbound, |p| p.state)
    }

    fn set_state(&mut self, conn: &ConnectionId, state: ConnectionState) {
        if let Some(peer) = self.peers.get_mut(conn) {
            peer.state = state;
        }
    }

    fn send(&mut self, conn: &ConnectionId, msg: ServerMessage) {
        let Some(peer) = self.peers.get(conn) else {
            debug!(conn = %conn.short(), "No such connection, dropping message");
            return;
        };
        match peer.outbox.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                if !self.evicted.contains(conn) {
                    warn!(conn = %conn.short(), "Outbox full, evicting slow peer");
                    self.evicted.push(conn.clone());
                }
            }
            Err(TrySendError::Closed(_)) => {
                debug!(conn = %conn.short(), "Outbox closed, dropping message");
            }
        }
    }

    /// Disconnect every peer that overflowed. Notifying their counterparts
    /// may overflow further queues, so loop until none are left.
    fn flush_evictions(&mut self) {
        while let Some(conn) = self.evicted.pop() {
            self.disconnect(&conn);
        }
    }

    fn request_create(&mut self, conn: &ConnectionId) {
        if self.state(conn) == ConnectionState::Consumer {
            warn!(conn = %conn.short(), "Consumer attempted to create a session");
            self.send(conn, ServerMessage::create_failed(&RelayError::AlreadyBound));
            return;
        }

        match self.store.create_session(conn) {
            Ok(session) => {
                self.set_state(conn, ConnectionState::Producer);
                self.send(conn, ServerMessage::created(&session.code));
            }
            Err(e) => {
                error!(conn = %conn.short(), error = %e, "Session creation failed");
                self.send(conn, ServerMessage::create_failed(&e));
            }
        }
    }

    fn request_join(&mut self, conn: &ConnectionId, code: Option<String>) {
        if self.state(conn) != ConnectionState::Unbound {
            warn!(conn = %conn.short(), "Bound connection attempted to join");
            self.send(conn, ServerMessage::join_failed(&RelayError::AlreadyBound));
            return;
        }

        let result = match code {
            Some(code) => self.store.join_session(&code, conn),
            None => Err(RelayError::InvalidRequest("missing pairing code".into())),
        };

        match result {
            Ok(session) => {
                self.set_state(conn, ConnectionState::Consumer);
                self.send(conn, ServerMessage::joined(&session.code));
                self.send(
                    &session.producer,
                    ServerMessage::PeerConnected {
                        code: session.code.clone(),
                    },
                );
                if !session.last_payload.is_empty() {
                    self.send(conn, ServerMessage::payload(session.last_payload));
                }
            }
            Err(e) => {
                info!(conn = %conn.short(), error = %e, "Join rejected");
                self.send(conn, ServerMessage::join_failed(&e));
            }
        }
    }

    fn payload_update(&mut self, conn: &ConnectionId, payload: String) {
        if self.state(conn) != ConnectionState::Producer {
            warn!(conn = %conn.short(), "Payload update from non-producer ignored");
            return;
        }

        let Some((code, consumer)) = self
            .store
            .find_by_producer(conn)
            .map(|s| (s.code.clone(), s.consumer.clone()))
        else {
            debug!(conn = %conn.short(), "Producer has no live session, update ignored");
            return;
        };

        debug!(code = %code, bytes = payload.len(), "Payload update");
        match consumer {
            Some(consumer) => {
                self.store.update_payload(&code, payload.clone());
                self.send(&consumer, ServerMessage::payload(payload));
            }
            None => {
                self.store.update_payload(&code, payload);
            }
        }
    }

    fn disconnect(&mut self, conn: &ConnectionId) {
        self.peers.remove(conn);

        let Some(outcome) = self.store.handle_disconnect(conn) else {
            debug!(conn = %conn.short(), "Unbound connection closed");
            return;
        };
        debug!(conn = %conn.short(), role = ?outcome.role(), "Releasing bound connection");

        match outcome {
            DisconnectOutcome::Producer { ended } => {
                for session in &ended {
                    self.end_session(session, REASON_PRODUCER_LEFT, false);
                }
            }
            DisconnectOutcome::Consumer { session } => {
                self.send(&session.producer, ServerMessage::PeerDisconnected);
            }
        }
    }

    /// Notify the peers of a session that is already gone from the store and
    /// release connections left without a session.
    fn end_session(&mut self, session: &Session, reason: &str, notify_producer: bool) {
        if let Some(consumer) = &session.consumer {
            self.send(
                consumer,
                ServerMessage::SessionEnded {
                    reason: reason.to_string(),
                },
            );
            self.set_state(consumer, ConnectionState::Unbound);
        }

        if notify_producer {
            self.send(
                &session.producer,
                ServerMessage::SessionEnded {
                    reason: reason.to_string(),
                },
            );
            if self.store.find_by_producer(&session.producer).is_none() {
                self.set_state(&session.producer, ConnectionState::Unbound);
            }
        }
    }
}
