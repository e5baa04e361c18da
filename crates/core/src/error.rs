//! Error taxonomy (spec §7).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur anywhere in the orchestrator.
///
/// Facade handlers map these to HTTP status codes; the pipeline catches
/// most of these and records them as journal `Error` observations instead
/// of killing the session (see §4.4 step 6 and §7 propagation policy).
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("transport unavailable: {0}")]
    TransportUnavailable(String),

    #[error("transport lost: {0}")]
    TransportLost(String),

    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("LLM call failed: {0}")]
    LlmFailed(String),

    #[error("search unavailable: {0}")]
    SearchUnavailable(String),

    #[error("search timed out")]
    SearchTimeout,

    #[error("invalid tool call: {0}")]
    InvalidToolCall(String),

    #[error("duplicate session: {0}")]
    Duplicate(String),

    #[error("unknown room: {0}")]
    UnknownRoom(String),

    #[error("unknown session: {0}")]
    UnknownSession(String),

    #[error("termination failed for pid {pid}: {reason}")]
    TerminationFailed { pid: u32, reason: String },

    #[error("session stalled: no tool calls for {consecutive_turns} consecutive turns")]
    Stalled { consecutive_turns: u32 },

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Short machine-readable kind, used as the `kind` field on journal
    /// `Error` observations and in tool-result error payloads sent back to
    /// the LLM.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::TransportUnavailable(_) => "transport_unavailable",
            Error::TransportLost(_) => "transport_lost",
            Error::TranscriptionFailed(_) => "transcription_failed",
            Error::LlmFailed(_) => "llm",
            Error::SearchUnavailable(_) => "search_unavailable",
            Error::SearchTimeout => "search_timeout",
            Error::InvalidToolCall(_) => "invalid_tool_call",
            Error::Duplicate(_) => "duplicate",
            Error::UnknownRoom(_) => "unknown_room",
            Error::UnknownSession(_) => "unknown_session",
            Error::TerminationFailed { .. } => "termination_failed",
            Error::Stalled { .. } => "stalled",
            Error::Timeout(_) => "timeout",
            Error::Internal(_) => "internal",
        }
    }
}
