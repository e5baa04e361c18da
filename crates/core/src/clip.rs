//! Clip Candidate (spec §3), returned by the Clip Search collaborator (C3).

/// A ranked candidate clip returned from semantic search.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ClipCandidate {
    pub clip_id: String,
    pub source_uri: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub caption: String,
    pub score: f64,
}

impl ClipCandidate {
    /// `end_seconds > start_seconds` is a data-model invariant from the
    /// search backend; we validate rather than trust it blindly, the same
    /// defensive posture the pipeline takes with LLM-supplied `PlayClip`
    /// arguments.
    pub fn is_well_formed(&self) -> bool {
        self.end_seconds > self.start_seconds && (0.0..=1.0).contains(&self.score)
    }
}
