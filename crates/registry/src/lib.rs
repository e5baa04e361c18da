//! Session Registry and state machine (C6, spec §4.6).
//!
//! The registry is the only cross-session shared structure (spec §5): a
//! single-writer `RwLock` serializes mutation while snapshot reads proceed
//! without blocking. Side effects the state table names (subscribing to a
//! room, tearing down a pipeline, killing edge processes) are **not**
//! performed here — this crate only tracks state and hands back
//! [`ReaperEvent`]s for a higher layer (the pipeline/facade wiring) to act
//! on, the same separation the teacher draws between `SessionManager`
//! bookkeeping and the cleanup task's logging/side effects.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use orchestrator_core::{EdgePids, EdgeRole, Error, Result, Session, SessionSnapshot, SessionState};
use parking_lot::RwLock;
use tokio::sync::{mpsc, watch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaperReason {
    ConnectingTimeout,
    DegradedGraceExceeded,
    IdleTimeout,
    /// Raised by the Conversation Pipeline itself (spec §4.1, §7: repeated
    /// `LlmFailed` above a configured threshold is unrecoverable), not by
    /// the periodic `reap()` scan.
    RepeatedLlmFailure,
}

#[derive(Debug, Clone)]
pub struct ReaperEvent {
    pub identifier: String,
    pub room_url: String,
    pub reason: ReaperReason,
}

#[derive(Debug, Clone)]
pub struct ReaperThresholds {
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub transport_grace: Duration,
    pub interval: Duration,
}

impl Default for ReaperThresholds {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(120),
            idle_timeout: Duration::from_secs(60),
            transport_grace: Duration::from_secs(15),
            interval: Duration::from_secs(10),
        }
    }
}

struct Index {
    sessions: HashMap<String, Session>,
    room_to_identifier: HashMap<String, String>,
}

pub struct SessionRegistry {
    index: RwLock<Index>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            index: RwLock::new(Index { sessions: HashMap::new(), room_to_identifier: HashMap::new() }),
        }
    }

    /// Fails with `Duplicate` if either key already names an active session
    /// (spec §3 invariant: at most one session per `room_url`/`identifier`).
    pub fn create(&self, room_url: &str, identifier: &str) -> Result<Session> {
        let mut index = self.index.write();

        if index.sessions.contains_key(identifier) {
            return Err(Error::Duplicate(identifier.to_string()));
        }
        if index.room_to_identifier.contains_key(room_url) {
            return Err(Error::Duplicate(room_url.to_string()));
        }

        let session = Session::new(identifier, room_url);
        index.room_to_identifier.insert(room_url.to_string(), identifier.to_string());
        index.sessions.insert(identifier.to_string(), session.clone());

        Ok(session)
    }

    pub fn get_by_identifier(&self, identifier: &str) -> Option<Session> {
        self.index.read().sessions.get(identifier).cloned()
    }

    pub fn get_by_room(&self, room_url: &str) -> Option<Session> {
        let index = self.index.read();
        let identifier = index.room_to_identifier.get(room_url)?;
        index.sessions.get(identifier).cloned()
    }

    pub fn list_active(&self) -> Vec<SessionSnapshot> {
        self.index.read().sessions.values().map(SessionSnapshot::from).collect()
    }

    /// Removes a session only once `Terminated` (spec §3 invariant: a
    /// terminated session leaves the registry before its resources can be
    /// reassigned).
    pub fn remove(&self, identifier: &str) -> Result<()> {
        let mut index = self.index.write();
        let Some(session) = index.sessions.get(identifier) else {
            return Err(Error::UnknownSession(identifier.to_string()));
        };
        if session.state != SessionState::Terminated {
            return Err(Error::Internal(format!(
                "cannot remove session {identifier} in state {}",
                session.state.display_name()
            )));
        }
        let room_url = session.room_url.clone();
        index.sessions.remove(identifier);
        index.room_to_identifier.remove(&room_url);
        Ok(())
    }

    fn with_session_mut<T>(&self, identifier: &str, f: impl FnOnce(&mut Session) -> T) -> Result<T> {
        let mut index = self.index.write();
        let session =
            index.sessions.get_mut(identifier).ok_or_else(|| Error::UnknownSession(identifier.to_string()))?;
        Ok(f(session))
    }

    pub fn touch(&self, identifier: &str) -> Result<()> {
        self.with_session_mut(identifier, |s| s.touch())
    }

    pub fn transition_to(&self, identifier: &str, state: SessionState) -> Result<()> {
        self.with_session_mut(identifier, |s| s.transition_to(state))
    }

    pub fn record_edge_pid(&self, identifier: &str, role: EdgeRole, pid: u32) -> Result<()> {
        self.with_session_mut(identifier, |s| {
            if s.state.allows_edge_pids() {
                s.edge_pids.set(role, pid);
            }
        })
    }

    pub fn edge_pids(&self, identifier: &str) -> Result<EdgePids> {
        self.with_session_mut(identifier, |s| s.edge_pids.clone())
    }

    /// Scans every session and advances any that have exceeded a
    /// timeout/grace window into `Terminating`, returning one event per
    /// session advanced this pass (spec §4.6: "automatic reaper... advancing
    /// timeouts"). Does not perform the cleanup side effects itself.
    pub fn reap(&self, thresholds: &ReaperThresholds) -> Vec<ReaperEvent> {
        let mut index = self.index.write();
        let mut events = Vec::new();

        for session in index.sessions.values_mut() {
            let reason = match session.state {
                SessionState::Connecting if session.time_in_state() > thresholds.connect_timeout => {
                    Some(ReaperReason::ConnectingTimeout)
                }
                SessionState::Degraded if session.time_in_state() > thresholds.transport_grace => {
                    Some(ReaperReason::DegradedGraceExceeded)
                }
                SessionState::Active if session.idle_for() > thresholds.idle_timeout => {
                    Some(ReaperReason::IdleTimeout)
                }
                _ => None,
            };

            if let Some(reason) = reason {
                session.transition_to(SessionState::Terminating);
                events.push(ReaperEvent {
                    identifier: session.identifier.clone(),
                    room_url: session.room_url.clone(),
                    reason,
                });
            }
        }

        events
    }

    /// Spawns the bounded-interval reaper loop (spec default 10s) and wires
    /// its events to `events_tx` for a caller to drive actual teardown.
    /// Returns a shutdown handle mirroring the teacher's `watch`-based
    /// cleanup-task shutdown.
    pub fn spawn_reaper(
        self: &Arc<Self>,
        thresholds: ReaperThresholds,
        events_tx: mpsc::UnboundedSender<ReaperEvent>,
    ) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let registry = Arc::clone(self);
        let interval = thresholds.interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        for event in registry.reap(&thresholds) {
                            tracing::info!(identifier = %event.identifier, reason = ?event.reason, "reaper advanced session to terminating");
                            if events_tx.send(event).is_err() {
                                return;
                            }
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("session reaper shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_rejects_duplicate_identifier() {
        let registry = SessionRegistry::new();
        registry.create("room-1", "sess-1").unwrap();
        let result = registry.create("room-2", "sess-1");
        assert!(matches!(result, Err(Error::Duplicate(_))));
    }

    #[test]
    fn create_rejects_duplicate_room() {
        let registry = SessionRegistry::new();
        registry.create("room-1", "sess-1").unwrap();
        let result = registry.create("room-1", "sess-2");
        assert!(matches!(result, Err(Error::Duplicate(_))));
    }

    #[test]
    fn remove_refuses_non_terminated_session() {
        let registry = SessionRegistry::new();
        registry.create("room-1", "sess-1").unwrap();
        let result = registry.remove("sess-1");
        assert!(result.is_err());
    }

    #[test]
    fn remove_succeeds_once_terminated() {
        let registry = SessionRegistry::new();
        registry.create("room-1", "sess-1").unwrap();
        registry.transition_to("sess-1", SessionState::Terminated).unwrap();
        registry.remove("sess-1").unwrap();
        assert!(registry.get_by_identifier("sess-1").is_none());
    }

    #[test]
    fn reap_advances_a_stalled_connecting_session() {
        let registry = SessionRegistry::new();
        registry.create("room-1", "sess-1").unwrap();
        registry.transition_to("sess-1", SessionState::Connecting).unwrap();

        let thresholds = ReaperThresholds { connect_timeout: Duration::from_secs(0), ..Default::default() };
        let events = registry.reap(&thresholds);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].reason, ReaperReason::ConnectingTimeout);
        let session = registry.get_by_identifier("sess-1").unwrap();
        assert_eq!(session.state, SessionState::Terminating);
    }

    #[test]
    fn reap_leaves_healthy_sessions_alone() {
        let registry = SessionRegistry::new();
        registry.create("room-1", "sess-1").unwrap();
        registry.transition_to("sess-1", SessionState::Connecting).unwrap();

        let events = registry.reap(&ReaperThresholds::default());
        assert!(events.is_empty());
    }
}
