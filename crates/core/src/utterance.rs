//! Finalized transcriptions produced by the Transcriber (spec §3, §4.2).

/// A finalized transcription for one session. Produced by C2, consumed
/// exactly once by the pipeline's turn handler, then archived into the
/// journal as a `UserUtterance` observation.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Utterance {
    pub session_id: String,
    pub text: String,
    pub language_tag: String,
    pub received_at: chrono::DateTime<chrono::Utc>,
}

impl Utterance {
    pub fn new(
        session_id: impl Into<String>,
        text: impl Into<String>,
        language_tag: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            text: text.into(),
            language_tag: language_tag.into(),
            received_at: chrono::Utc::now(),
        }
    }

    /// Empty-string utterances are dropped before a turn is taken
    /// (spec §8 boundary behaviors).
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}
