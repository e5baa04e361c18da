//! Tool Call variants emitted by the LLM (spec §3).

use crate::ClipCandidate;

/// Arguments for the `SearchClips` tool.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchClipsArgs {
    pub query: String,
    pub top_k: u32,
}

/// Arguments for the `PlayClip` tool.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PlayClipArgs {
    pub clip_id: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
}

impl PlayClipArgs {
    /// `end_seconds <= start_seconds` or a negative start is rejected
    /// per spec §4.4 tie-break policy and §8 boundary behavior.
    pub fn validate(&self) -> Result<(), String> {
        if self.start_seconds < 0.0 {
            return Err(format!(
                "start_seconds must be non-negative, got {}",
                self.start_seconds
            ));
        }
        if self.end_seconds <= self.start_seconds {
            return Err(format!(
                "end_seconds ({}) must be greater than start_seconds ({})",
                self.end_seconds, self.start_seconds
            ));
        }
        Ok(())
    }
}

/// An LLM-emitted tool call, scoped to one `call_id` within the turn.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolCall {
    SearchClips { call_id: String, args: SearchClipsArgs },
    PlayClip { call_id: String, args: PlayClipArgs },
}

impl ToolCall {
    pub fn call_id(&self) -> &str {
        match self {
            ToolCall::SearchClips { call_id, .. } => call_id,
            ToolCall::PlayClip { call_id, .. } => call_id,
        }
    }
}

/// The single result record the pipeline guarantees per `call_id`
/// (spec §3 Tool Call invariant), fed back into the LLM's context as the
/// tool result.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolResult {
    SearchClips {
        call_id: String,
        results: Vec<ClipCandidate>,
        reason: Option<String>,
    },
    PlayClip {
        call_id: String,
        ok: bool,
        error: Option<String>,
        command_seq: Option<u64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_width_clip() {
        let args = PlayClipArgs {
            clip_id: "c1".into(),
            start_seconds: 5.0,
            end_seconds: 5.0,
        };
        assert!(args.validate().is_err());
    }

    #[test]
    fn rejects_negative_start() {
        let args = PlayClipArgs {
            clip_id: "c1".into(),
            start_seconds: -1.0,
            end_seconds: 5.0,
        };
        assert!(args.validate().is_err());
    }

    #[test]
    fn accepts_well_formed_range() {
        let args = PlayClipArgs {
            clip_id: "c1".into(),
            start_seconds: 0.0,
            end_seconds: 5.0,
        };
        assert!(args.validate().is_ok());
    }
}
