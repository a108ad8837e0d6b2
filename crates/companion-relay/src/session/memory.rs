use std::collections::HashMap;
use std::time::{Duration, Instant};

use companion_common::{ConnectionId, RelayError};
use tracing::{debug, info};

use super::{DisconnectOutcome, Session, SessionStore};
use crate::code::{normalize, CodeGenerator};

/// In-process session table with connection reverse indices.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: HashMap<String, Session>,
    /// Codes each producer owns, oldest first.
    by_producer: HashMap<ConnectionId, Vec<String>>,
    by_consumer: HashMap<ConnectionId, String>,
    codes: CodeGenerator,
}

impl MemorySessionStore {
    pub fn new(codes: CodeGenerator) -> Self {
        Self {
            codes,
            ..Default::default()
        }
    }

    fn is_bound(&self, connection: &ConnectionId) -> bool {
        self.by_producer.contains_key(connection) || self.by_consumer.contains_key(connection)
    }

    fn unindex_producer(&mut self, producer: &ConnectionId, code: &str) {
        if let Some(codes) = self.by_producer.get_mut(producer) {
            codes.retain(|c| c != code);
            if codes.is_empty() {
                self.by_producer.remove(producer);
            }
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn create_session(&mut self, producer: &ConnectionId) -> Result<Session, RelayError> {
        if self.by_consumer.contains_key(producer) {
            return Err(RelayError::AlreadyBound);
        }

        let sessions = &self.sessions;
        let code = self.codes.generate(|c| sessions.contains_key(c))?;
        let session = Session::new(code.clone(), producer.clone());

        self.sessions.insert(code.clone(), session.clone());
        self.by_producer
            .entry(producer.clone())
            .or_default()
            .push(code.clone());

        info!(code = %code, conn = %producer.short(), "Session created");
        Ok(session)
    }

    fn join_session(
        &mut self,
        code: &str,
        consumer: &ConnectionId,
    ) -> Result<Session, RelayError> {
        let code = normalize(code);
        if code.is_empty() {
            return Err(RelayError::InvalidRequest("missing pairing code".into()));
        }
        if self.is_bound(consumer) {
            return Err(RelayError::AlreadyBound);
        }

        let session = self
            .sessions
            .get_mut(&code)
            .ok_or(RelayError::SessionNotFound)?;
        if !session.is_open() {
            return Err(RelayError::SessionOccupied);
        }

        session.consumer = Some(consumer.clone());
        session.last_activity = Instant::now();
        self.by_consumer.insert(consumer.clone(), code.clone());

        info!(code = %code, conn = %consumer.short(), "Consumer joined session");
        Ok(session.clone())
    }

    fn find_by_producer(&self, connection: &ConnectionId) -> Option<&Session> {
        let code = self.by_producer.get(connection)?.last()?;
        self.sessions.get(code)
    }

    fn find_by_consumer(&self, connection: &ConnectionId) -> Option<&Session> {
        let code = self.by_consumer.get(connection)?;
        self.sessions.get(code)
    }

    fn update_payload(&mut self, code: &str, payload: String) -> bool {
        match self.sessions.get_mut(&normalize(code)) {
            Some(session) => {
                session.last_payload = payload;
                session.last_activity = Instant::now();
                true
            }
            None => false,
        }
    }

    fn remove_session(&mut self, code: &str) -> Option<Session> {
        let session = self.sessions.remove(&normalize(code))?;
        self.unindex_producer(&session.producer, &session.code);
        if let Some(consumer) = &session.consumer {
            self.by_consumer.remove(consumer);
        }
        debug!(code = %session.code, "Session removed");
        Some(session)
    }

    fn touch(&mut self, connection: &ConnectionId) -> bool {
        let now = Instant::now();
        let codes: Vec<String> = match (
            self.by_producer.get(connection),
            self.by_consumer.get(connection),
        ) {
            (Some(codes), _) => codes.clone(),
            (None, Some(code)) => vec![code.clone()],
            (None, None) => return false,
        };
        for code in &codes {
            if let Some(session) = self.sessions.get_mut(code) {
                session.last_activity = now;
            }
        }
        true
    }

    fn handle_disconnect(&mut self, connection: &ConnectionId) -> Option<DisconnectOutcome> {
        if let Some(codes) = self.by_producer.remove(connection) {
            let ended: Vec<Session> = codes
                .iter()
                .filter_map(|code| self.sessions.remove(code))
                .collect();
            for session in &ended {
                if let Some(consumer) = &session.consumer {
                    self.by_consumer.remove(consumer);
                }
                info!(code = %session.code, "Producer disconnected, session removed");
            }
            return Some(DisconnectOutcome::Producer { ended });
        }

        let code = self.by_consumer.remove(connection)?;
        let session = self.sessions.get_mut(&code)?;
        session.consumer = None;
        info!(code = %code, "Consumer disconnected, session open again");
        Some(DisconnectOutcome::Consumer {
            session: session.clone(),
        })
    }

    fn reap_idle(&mut self, max_idle: Duration, now: Instant) -> Vec<Session> {
        let stale: Vec<String> = self
            .sessions
            .values()
            .filter(|s| now.saturating_duration_since(s.last_activity) > max_idle)
            .map(|s| s.code.clone())
            .collect();

        stale
            .iter()
            .filter_map(|code| {
                info!(code = %code, "Reaping idle session");
                self.remove_session(code)
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.sessions.len()
    }
}
