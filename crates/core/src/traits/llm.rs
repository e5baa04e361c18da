//! Language Model capability (C4, spec §4.4).

use async_trait::async_trait;

use crate::error::Result;
use crate::tool_call::{ToolCall, ToolResult};

/// Chat message role, mirrored from the wire format the LLM backend speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One turn in the rolling context window handed to the model (spec §4.4:
/// "the last N turns", N from `llm.context_turns`).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// A single round-trip with the model: zero or more tool calls plus,
/// optionally, reasoning text surfaced for the journal (never spoken to the
/// user — the bot has no text-to-speech output, spec §1 Non-goals).
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub reasoning: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

/// Drives one turn of the tool-calling conversation loop (spec §4.4).
///
/// Implementations own retry/backoff and must respect `turn_timeout_seconds`
/// internally; the pipeline treats a timeout the same as any other
/// `Error::LlmFailed`.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Produce the next completion given the rolling message history and the
    /// results of any tool calls issued in the previous round (empty on the
    /// first round of a turn).
    async fn complete(
        &self,
        history: &[Message],
        prior_results: &[ToolResult],
    ) -> Result<Completion>;

    /// Human-readable model identifier, surfaced in logs and error context.
    fn model_id(&self) -> &str;
}
