//! Session data model (spec §3, §4.6).

use std::collections::HashMap;
use std::time::Instant;

/// The external roles an edge device can register a process PID under
/// (spec §4.5, §9 open question: both roles are optional and independent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeRole {
    Capture,
    Player,
}

impl EdgeRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeRole::Capture => "capture",
            EdgeRole::Player => "player",
        }
    }
}

/// Best-effort PID table for the two edge roles. Populated only while the
/// owning session is `Connecting` or `Active` (spec §3 invariant).
#[derive(Debug, Clone, Default)]
pub struct EdgePids {
    pub capture: Option<u32>,
    pub player: Option<u32>,
}

impl EdgePids {
    pub fn get(&self, role: EdgeRole) -> Option<u32> {
        match role {
            EdgeRole::Capture => self.capture,
            EdgeRole::Player => self.player,
        }
    }

    pub fn set(&mut self, role: EdgeRole, pid: u32) {
        match role {
            EdgeRole::Capture => self.capture = Some(pid),
            EdgeRole::Player => self.player = Some(pid),
        }
    }

    pub fn clear(&mut self) {
        self.capture = None;
        self.player = None;
    }

    pub fn as_map(&self) -> HashMap<EdgeRole, u32> {
        let mut m = HashMap::new();
        if let Some(pid) = self.capture {
            m.insert(EdgeRole::Capture, pid);
        }
        if let Some(pid) = self.player {
            m.insert(EdgeRole::Player, pid);
        }
        m
    }
}

/// Session lifecycle states (spec §4.6). Transitions are owned by the
/// registry; this type itself carries no transition logic so it stays a
/// plain value the registry, pipeline, and facade can all read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Provisioning,
    Connecting,
    Active,
    Degraded,
    Terminating,
    Terminated,
}

impl SessionState {
    pub fn display_name(&self) -> &'static str {
        match self {
            SessionState::Provisioning => "provisioning",
            SessionState::Connecting => "connecting",
            SessionState::Active => "active",
            SessionState::Degraded => "degraded",
            SessionState::Terminating => "terminating",
            SessionState::Terminated => "terminated",
        }
    }

    /// PIDs are only meaningful while connecting/active (spec §3 invariant).
    pub fn allows_edge_pids(&self) -> bool {
        matches!(self, SessionState::Connecting | SessionState::Active)
    }
}

/// The central entity: one conversational engagement (spec §3).
///
/// Owned exclusively by the Session Registry (C6). The pipeline actor,
/// transport room handle, and status journal referenced here are each
/// owned by this session, not shared across sessions.
#[derive(Debug, Clone)]
pub struct Session {
    pub identifier: String,
    pub room_url: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub state: SessionState,
    pub edge_pids: EdgePids,
    #[doc(hidden)]
    pub last_activity_at: chrono::DateTime<chrono::Utc>,
    /// Monotonic instant used for timeout/grace-window arithmetic; kept
    /// separate from `last_activity_at` (wall clock, for snapshots/API)
    /// the same way the teacher keeps `Instant` internally alongside a
    /// serializable timestamp for external consumers.
    #[doc(hidden)]
    pub last_activity_instant: Instant,
    pub state_entered_at: Instant,
}

impl Session {
    pub fn new(identifier: impl Into<String>, room_url: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            identifier: identifier.into(),
            room_url: room_url.into(),
            created_at: now,
            state: SessionState::Provisioning,
            edge_pids: EdgePids::default(),
            last_activity_at: now,
            last_activity_instant: Instant::now(),
            state_entered_at: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_activity_at = chrono::Utc::now();
        self.last_activity_instant = Instant::now();
    }

    pub fn transition_to(&mut self, state: SessionState) {
        self.state = state;
        self.state_entered_at = Instant::now();
        if !state.allows_edge_pids() {
            self.edge_pids.clear();
        }
    }

    pub fn time_in_state(&self) -> std::time::Duration {
        self.state_entered_at.elapsed()
    }

    pub fn idle_for(&self) -> std::time::Duration {
        self.last_activity_instant.elapsed()
    }
}

/// A point-in-time, serializable view of a `Session` (spec §4.7 "session
/// snapshot"). This is what `list_active` and the `/rooms` facade endpoint
/// hand back; it never exposes the internal `Instant`s.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionSnapshot {
    pub room_url: String,
    pub identifier: String,
    pub state: SessionState,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub bot_running: bool,
    pub bot_pid: Option<u32>,
    pub pi_client_pid: Option<u32>,
    pub video_service_pid: Option<u32>,
}

impl From<&Session> for SessionSnapshot {
    fn from(s: &Session) -> Self {
        Self {
            room_url: s.room_url.clone(),
            identifier: s.identifier.clone(),
            state: s.state,
            created_at: s.created_at,
            bot_running: matches!(s.state, SessionState::Active | SessionState::Degraded),
            bot_pid: None,
            pi_client_pid: s.edge_pids.get(EdgeRole::Capture),
            video_service_pid: s.edge_pids.get(EdgeRole::Player),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_pids_cleared_outside_connecting_active() {
        let mut s = Session::new("id-1", "room-1");
        s.edge_pids.set(EdgeRole::Capture, 123);
        s.transition_to(SessionState::Terminating);
        assert!(s.edge_pids.get(EdgeRole::Capture).is_none());
    }

    #[test]
    fn snapshot_reflects_roles() {
        let mut s = Session::new("id-1", "room-1");
        s.transition_to(SessionState::Active);
        s.edge_pids.set(EdgeRole::Player, 42);
        let snap = SessionSnapshot::from(&s);
        assert_eq!(snap.video_service_pid, Some(42));
        assert!(snap.bot_running);
    }
}
