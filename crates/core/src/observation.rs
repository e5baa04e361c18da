//! Status Observation variants (spec §3, §4.8).

use crate::ClipCandidate;

/// One entry in a session's Status Journal. `seq` and `emitted_at` are
/// assigned by the journal on append, not by the producer, so the journal
/// alone owns monotonicity.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StatusObservation {
    pub seq: u64,
    pub emitted_at: chrono::DateTime<chrono::Utc>,
    pub kind: ObservationKind,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObservationKind {
    UserUtterance { text: String, language_tag: String },
    LlmReasoning { text: String },
    SearchAttempt { query: String, results: Vec<ClipCandidate> },
    ClipSelected { clip_id: String, command_seq: u64 },
    ClipPlayed { clip_id: String, command_seq: u64 },
    ProcessEvent { detail: String },
    Error { kind: String, message: String },
    /// Bounded-retention marker (spec §4.8): emitted in place of entries the
    /// journal has dropped, so the cursor stays monotonic across trims.
    Gap { count: u64 },
}
