//! Status Journal (C8, spec §4.8).
//!
//! One append-only, bounded sequence per session. Readers track their own
//! cursor (the highest `seq` they've consumed) and call [`StatusJournal::read_from`]
//! to get everything newer; a dropped span shows up as a single
//! `Gap{count}` entry so the cursor stays meaningful across trims.

use std::collections::{HashMap, VecDeque};

use orchestrator_core::{ObservationKind, StatusObservation};
use parking_lot::RwLock;

struct SessionJournal {
    entries: VecDeque<StatusObservation>,
    next_seq: u64,
}

impl SessionJournal {
    fn new() -> Self {
        Self { entries: VecDeque::new(), next_seq: 1 }
    }

    fn append(&mut self, kind: ObservationKind, retention: usize) -> StatusObservation {
        let observation = StatusObservation { seq: self.next_seq, emitted_at: chrono::Utc::now(), kind };
        self.next_seq += 1;
        self.entries.push_back(observation.clone());
        while self.entries.len() > retention {
            self.entries.pop_front();
        }
        observation
    }

    fn read_from(&self, cursor: u64) -> Vec<StatusObservation> {
        let mut result = Vec::new();

        if let Some(front) = self.entries.front() {
            if front.seq > cursor + 1 {
                let count = front.seq - cursor - 1;
                result.push(StatusObservation {
                    seq: front.seq - 1,
                    emitted_at: front.emitted_at,
                    kind: ObservationKind::Gap { count },
                });
            }
        }

        result.extend(self.entries.iter().filter(|o| o.seq > cursor).cloned());
        result
    }
}

#[derive(Debug, Clone)]
pub struct JournalConfig {
    pub retention_entries: usize,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self { retention_entries: 1000 }
    }
}

/// Owns one bounded journal per active session. Safe to share across the
/// registry and the HTTP facade: writes come only from a session's own
/// pipeline actor, so per-session contention is limited to a reader polling
/// concurrently with that actor's appends.
pub struct StatusJournal {
    config: JournalConfig,
    sessions: RwLock<HashMap<String, SessionJournal>>,
}

impl StatusJournal {
    pub fn new(config: JournalConfig) -> Self {
        Self { config, sessions: RwLock::new(HashMap::new()) }
    }

    pub fn append(&self, session_id: &str, kind: ObservationKind) -> StatusObservation {
        let mut sessions = self.sessions.write();
        let journal = sessions.entry(session_id.to_string()).or_insert_with(SessionJournal::new);
        journal.append(kind, self.config.retention_entries)
    }

    pub fn read_from(&self, session_id: &str, cursor: u64) -> Vec<StatusObservation> {
        let sessions = self.sessions.read();
        sessions.get(session_id).map(|j| j.read_from(cursor)).unwrap_or_default()
    }

    pub fn remove(&self, session_id: &str) {
        self.sessions.write().remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_from_zero_returns_everything() {
        let journal = StatusJournal::new(JournalConfig::default());
        journal.append("s1", ObservationKind::ProcessEvent { detail: "a".into() });
        journal.append("s1", ObservationKind::ProcessEvent { detail: "b".into() });

        let entries = journal.read_from("s1", 0);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].seq, 1);
        assert_eq!(entries[1].seq, 2);
    }

    #[test]
    fn trimming_emits_a_gap_marker_for_dropped_entries() {
        let journal = StatusJournal::new(JournalConfig { retention_entries: 2 });
        for i in 0..5 {
            journal.append("s1", ObservationKind::ProcessEvent { detail: format!("e{i}") });
        }

        let entries = journal.read_from("s1", 0);
        assert!(matches!(entries[0].kind, ObservationKind::Gap { count: 3 }));
        assert_eq!(entries.len(), 3); // gap + 2 retained entries
    }

    #[test]
    fn cursor_past_retention_window_sees_no_gap_when_nothing_was_dropped() {
        let journal = StatusJournal::new(JournalConfig::default());
        journal.append("s1", ObservationKind::ProcessEvent { detail: "a".into() });
        journal.append("s1", ObservationKind::ProcessEvent { detail: "b".into() });

        let entries = journal.read_from("s1", 1);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].seq, 2);
    }

    #[test]
    fn unknown_session_returns_empty() {
        let journal = StatusJournal::new(JournalConfig::default());
        assert!(journal.read_from("nope", 0).is_empty());
    }
}
