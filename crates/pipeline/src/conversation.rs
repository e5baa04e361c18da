use std::sync::Arc;
use std::time::Duration;

use futures::stream::{BoxStream, StreamExt};
use orchestrator_core::{
    ClipCandidate, ClipSearch, Completion, Error, LanguageModel, ObservationKind, PlayCommand,
    PlaybackCommandPayload, Recipient, Result, SessionState, ToolCall, ToolResult, Transport,
    Utterance,
};
use orchestrator_journal::StatusJournal;
use orchestrator_registry::{ReaperEvent, ReaperReason, SessionRegistry};
use tokio::sync::mpsc;

use crate::context::ConversationContext;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub context_turns: u32,
    pub turn_timeout: Duration,
    /// Consecutive tool-call-free utterances before an `Error{kind:stalled}`
    /// observation is appended (spec §4.4 tie-break policy).
    pub stall_threshold: u32,
    /// Reject `PlayClip` calls referencing a `clip_id` outside the most
    /// recent `SearchClips` results instead of allowing the edge to resolve
    /// it (spec §9 Open Question; default permissive).
    pub strict_clip_validation: bool,
    /// Consecutive `LlmFailed` turns before the session is forced into
    /// `Terminating` (spec §4.1, §7, §8 S6: default 5 consecutive timeouts).
    pub llm_failure_threshold: u32,
    /// Hard cap on tool-call round-trips within a single turn, guarding
    /// against a model that never stops calling tools.
    pub max_tool_rounds: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            context_turns: 12,
            turn_timeout: Duration::from_secs(30),
            stall_threshold: 3,
            strict_clip_validation: false,
            llm_failure_threshold: 5,
            max_tool_rounds: 4,
        }
    }
}

/// One actor per session (spec §4.4): owns the rolling LLM context, the
/// last search results (for soft `PlayClip` validation), and the
/// strictly-increasing `command_seq` counter. Runs single-threaded against
/// its own utterance stream — nothing about a session's turn state is ever
/// touched from another task.
pub struct ConversationPipeline {
    session_id: String,
    room_url: String,
    transport: Arc<dyn Transport>,
    llm: Arc<dyn LanguageModel>,
    clip_search: Arc<dyn ClipSearch>,
    journal: Arc<StatusJournal>,
    registry: Arc<SessionRegistry>,
    events_tx: mpsc::UnboundedSender<ReaperEvent>,
    config: PipelineConfig,
    context: ConversationContext,
    last_search_results: Option<Vec<ClipCandidate>>,
    command_seq: u64,
    stall_counter: u32,
    llm_failure_counter: u32,
}

impl ConversationPipeline {
    pub fn new(
        session_id: impl Into<String>,
        room_url: impl Into<String>,
        transport: Arc<dyn Transport>,
        llm: Arc<dyn LanguageModel>,
        clip_search: Arc<dyn ClipSearch>,
        journal: Arc<StatusJournal>,
        registry: Arc<SessionRegistry>,
        events_tx: mpsc::UnboundedSender<ReaperEvent>,
        config: PipelineConfig,
    ) -> Self {
        let context = ConversationContext::new(config.context_turns);
        Self {
            session_id: session_id.into(),
            room_url: room_url.into(),
            transport,
            llm,
            clip_search,
            journal,
            registry,
            events_tx,
            config,
            context,
            last_search_results: None,
            command_seq: 0,
            stall_counter: 0,
            llm_failure_counter: 0,
        }
    }

    pub fn command_seq(&self) -> u64 {
        self.command_seq
    }

    /// Drives the turn loop (spec §4.4 steps 1-7) until the utterance
    /// stream ends — which happens when the transcriber's audio source is
    /// closed, typically by `cleanup_room` cancelling the pipeline's work.
    pub async fn run(mut self, mut utterances: BoxStream<'static, Result<Utterance>>) {
        while let Some(item) = utterances.next().await {
            match item {
                Ok(utterance) => self.handle_turn(utterance).await,
                Err(e) => self.record_error(&e),
            }
        }
    }

    /// Drives the turn to completion (spec §4.4 steps 4-6): invokes the LLM,
    /// dispatches any tool calls it emits, then calls the LLM again with
    /// their `ToolResult`s — looping until a round produces no tool calls,
    /// the configured round cap is hit, or the call itself fails.
    async fn handle_turn(&mut self, utterance: Utterance) {
        if utterance.is_empty() {
            return;
        }

        self.journal.append(
            &self.session_id,
            ObservationKind::UserUtterance { text: utterance.text.clone(), language_tag: utterance.language_tag.clone() },
        );
        self.context.push_user(utterance.text.clone());
        let _ = self.registry.touch(&self.session_id);

        let mut prior_results: Vec<ToolResult> = Vec::new();
        let mut last_reasoning = String::new();

        for round in 1..=self.config.max_tool_rounds {
            let completion = match self.complete_round(&prior_results).await {
                Some(completion) => completion,
                None => return,
            };
            self.llm_failure_counter = 0;

            if let Some(reasoning) = completion.reasoning.as_ref().filter(|t| !t.trim().is_empty()) {
                self.journal.append(&self.session_id, ObservationKind::LlmReasoning { text: reasoning.clone() });
                last_reasoning = reasoning.clone();
            }

            if completion.tool_calls.is_empty() {
                self.stall_counter += 1;
                if self.stall_counter >= self.config.stall_threshold {
                    self.journal.append(
                        &self.session_id,
                        ObservationKind::Error {
                            kind: "stalled".to_string(),
                            message: format!("no tool calls for {} consecutive utterances", self.stall_counter),
                        },
                    );
                    self.stall_counter = 0;
                }
                break;
            }

            self.stall_counter = 0;
            prior_results.clear();
            for tool_call in &completion.tool_calls {
                prior_results.push(self.handle_tool_call(tool_call).await);
            }

            if round == self.config.max_tool_rounds {
                tracing::warn!(session_id = %self.session_id, round, "reached max tool-call rounds for this turn, stopping");
            }
        }

        self.context.push_assistant(last_reasoning);
    }

    /// One `complete()` call under the turn timeout. Journals and tallies
    /// the failure on any error; returns `None` to end the turn.
    async fn complete_round(&mut self, prior_results: &[ToolResult]) -> Option<Completion> {
        match tokio::time::timeout(self.config.turn_timeout, self.llm.complete(self.context.as_slice(), prior_results))
            .await
        {
            Ok(Ok(completion)) => Some(completion),
            Ok(Err(e)) => {
                self.record_error(&e);
                None
            }
            Err(_) => {
                self.record_error(&Error::LlmFailed("turn timed out".to_string()));
                None
            }
        }
    }

    async fn handle_tool_call(&mut self, tool_call: &ToolCall) -> ToolResult {
        match tool_call {
            ToolCall::SearchClips { call_id, args } => {
                tracing::debug!(call_id = %call_id, query = %args.query, "dispatching SearchClips");
                match self.clip_search.search(&args.query, args.top_k).await {
                    Ok(results) => {
                        self.journal.append(
                            &self.session_id,
                            ObservationKind::SearchAttempt { query: args.query.clone(), results: results.clone() },
                        );
                        let reason = if results.is_empty() { Some("no matching clips".to_string()) } else { None };
                        self.last_search_results = Some(results.clone());
                        ToolResult::SearchClips { call_id: call_id.clone(), results, reason }
                    }
                    Err(e) => {
                        self.record_error(&e);
                        ToolResult::SearchClips { call_id: call_id.clone(), results: Vec::new(), reason: Some(e.to_string()) }
                    }
                }
            }
            ToolCall::PlayClip { call_id, args } => {
                tracing::debug!(call_id = %call_id, clip_id = %args.clip_id, "dispatching PlayClip");
                if let Err(reason) = args.validate() {
                    self.journal.append(
                        &self.session_id,
                        ObservationKind::Error { kind: "invalid_tool_call".to_string(), message: reason.clone() },
                    );
                    return ToolResult::PlayClip {
                        call_id: call_id.clone(),
                        ok: false,
                        error: Some(reason),
                        command_seq: None,
                    };
                }

                let known = self
                    .last_search_results
                    .as_ref()
                    .map(|results| results.iter().any(|c| c.clip_id == args.clip_id))
                    .unwrap_or(false);

                if !known {
                    if self.config.strict_clip_validation {
                        let message = format!("unknown clip_id {}", args.clip_id);
                        self.journal.append(
                            &self.session_id,
                            ObservationKind::Error { kind: "invalid_tool_call".to_string(), message: message.clone() },
                        );
                        return ToolResult::PlayClip {
                            call_id: call_id.clone(),
                            ok: false,
                            error: Some(message),
                            command_seq: None,
                        };
                    }
                    tracing::warn!(clip_id = %args.clip_id, "PlayClip referenced a clip outside the last search results; allowing per permissive policy");
                }

                let source_uri = self
                    .last_search_results
                    .as_ref()
                    .and_then(|results| results.iter().find(|c| c.clip_id == args.clip_id))
                    .map(|c| c.source_uri.clone())
                    .unwrap_or_else(|| args.clip_id.clone());

                self.command_seq += 1;
                let command = PlayCommand {
                    session_id: self.session_id.clone(),
                    source_uri,
                    start_seconds: args.start_seconds,
                    end_seconds: args.end_seconds,
                    fullscreen: true,
                    issued_at: chrono::Utc::now(),
                    command_seq: self.command_seq,
                };

                let payload = PlaybackCommandPayload::from(&command);
                let bytes = match serde_json::to_vec(&payload) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let err = Error::Internal(format!("encoding play command: {e}"));
                        self.record_error(&err);
                        return ToolResult::PlayClip {
                            call_id: call_id.clone(),
                            ok: false,
                            error: Some(err.to_string()),
                            command_seq: None,
                        };
                    }
                };

                if let Err(e) = self.transport.send_app_message(&self.room_url, bytes, Recipient::Any).await {
                    let message = e.to_string();
                    self.record_error(&e);
                    return ToolResult::PlayClip {
                        call_id: call_id.clone(),
                        ok: false,
                        error: Some(message),
                        command_seq: None,
                    };
                }

                self.journal.append(
                    &self.session_id,
                    ObservationKind::ClipSelected { clip_id: args.clip_id.clone(), command_seq: self.command_seq },
                );
                ToolResult::PlayClip { call_id: call_id.clone(), ok: true, error: None, command_seq: Some(self.command_seq) }
            }
        }
    }

    /// Journals every error; `TransportLost` additionally marks the session
    /// `Degraded` (spec §4.1: "C4 catches this and transitions the session
    /// to Degraded"), and a run of `LlmFailed`s past the configured
    /// threshold forces `Terminating` and notifies the facade so it can run
    /// the usual teardown (spec §7/§8 S6).
    fn record_error(&mut self, error: &Error) {
        self.journal.append(
            &self.session_id,
            ObservationKind::Error { kind: error.kind().to_string(), message: error.to_string() },
        );

        if matches!(error, Error::TransportLost(_)) {
            let _ = self.registry.transition_to(&self.session_id, SessionState::Degraded);
        }

        if matches!(error, Error::LlmFailed(_)) {
            self.llm_failure_counter += 1;
            if self.llm_failure_counter >= self.config.llm_failure_threshold {
                let _ = self.registry.transition_to(&self.session_id, SessionState::Terminating);
                let _ = self.events_tx.send(ReaperEvent {
                    identifier: self.session_id.clone(),
                    room_url: self.room_url.clone(),
                    reason: ReaperReason::RepeatedLlmFailure,
                });
                self.llm_failure_counter = 0;
            }
        } else {
            self.llm_failure_counter = 0;
        }
    }
}
