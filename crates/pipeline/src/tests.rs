#![cfg(test)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use orchestrator_core::{
    ClipCandidate, ClipSearch, Completion, Error, LanguageModel, Message, ObservationKind,
    PlayClipArgs, Recipient, Result, SearchClipsArgs, SessionState, ToolCall, ToolResult,
    Transport, TransportEvent, Utterance,
};
use orchestrator_journal::{JournalConfig, StatusJournal};
use orchestrator_registry::SessionRegistry;
use tokio::sync::mpsc;

use crate::conversation::{ConversationPipeline, PipelineConfig};

struct NullTransport;

#[async_trait]
impl Transport for NullTransport {
    async fn create_room(&self) -> Result<(String, String)> {
        Ok(("room".to_string(), "token".to_string()))
    }
    async fn destroy_room(&self, _room_url: &str) -> Result<()> {
        Ok(())
    }
    async fn send_app_message(&self, _room_url: &str, _payload: Vec<u8>, _recipient: Recipient) -> Result<()> {
        Ok(())
    }
    async fn subscribe(&self, _room_url: &str) -> Result<BoxStream<'static, TransportEvent>> {
        Ok(stream::empty().boxed())
    }
}

/// Returns a scripted sequence of completions, one per call, looping the
/// last entry once exhausted.
struct ScriptedLlm {
    completions: Vec<Completion>,
    call_count: AtomicU32,
}

impl ScriptedLlm {
    fn new(completions: Vec<Completion>) -> Self {
        Self { completions, call_count: AtomicU32::new(0) }
    }
}

#[async_trait]
impl LanguageModel for ScriptedLlm {
    async fn complete(&self, _history: &[Message], _prior_results: &[ToolResult]) -> Result<Completion> {
        let index = self.call_count.fetch_add(1, Ordering::SeqCst) as usize;
        Ok(self.completions.get(index).or_else(|| self.completions.last()).cloned().unwrap_or_default())
    }
    fn model_id(&self) -> &str {
        "scripted"
    }
}

struct FakeClipSearch {
    candidate: ClipCandidate,
}

#[async_trait]
impl ClipSearch for FakeClipSearch {
    async fn search(&self, _query: &str, _top_k: u32) -> Result<Vec<ClipCandidate>> {
        Ok(vec![self.candidate.clone()])
    }
}

fn candidate() -> ClipCandidate {
    ClipCandidate {
        clip_id: "clip-1".to_string(),
        source_uri: "s3://clips/clip-1.mp4".to_string(),
        start_seconds: 0.0,
        end_seconds: 5.0,
        caption: "a greeting".to_string(),
        score: 0.9,
    }
}

fn utterance(text: &str) -> Result<Utterance> {
    Ok(Utterance::new("sess-1", text, "en"))
}

fn build_pipeline(
    llm: Arc<dyn LanguageModel>,
    clip_search: Arc<dyn ClipSearch>,
) -> (ConversationPipeline, Arc<StatusJournal>, Arc<SessionRegistry>) {
    let journal = Arc::new(StatusJournal::new(JournalConfig::default()));
    let registry = Arc::new(SessionRegistry::new());
    registry.create("room-1", "sess-1").unwrap();
    let (events_tx, _events_rx) = mpsc::unbounded_channel();

    let pipeline = ConversationPipeline::new(
        "sess-1",
        "room-1",
        Arc::new(NullTransport),
        llm,
        clip_search,
        journal.clone(),
        registry.clone(),
        events_tx,
        PipelineConfig { turn_timeout: Duration::from_secs(5), ..Default::default() },
    );

    (pipeline, journal, registry)
}

#[tokio::test]
async fn search_then_play_emits_selected_clip_and_increments_command_seq() {
    let llm = Arc::new(ScriptedLlm::new(vec![Completion {
        reasoning: Some("found a match".to_string()),
        tool_calls: vec![
            ToolCall::SearchClips {
                call_id: "call-1".to_string(),
                args: SearchClipsArgs { query: "greeting".to_string(), top_k: 3 },
            },
            ToolCall::PlayClip {
                call_id: "call-2".to_string(),
                args: PlayClipArgs { clip_id: "clip-1".to_string(), start_seconds: 0.0, end_seconds: 5.0 },
            },
        ],
    }]));
    let clip_search = Arc::new(FakeClipSearch { candidate: candidate() });
    let (pipeline, journal, _registry) = build_pipeline(llm, clip_search);

    pipeline.run(stream::iter(vec![utterance("show me a greeting")]).boxed()).await;

    let entries = journal.read_from("sess-1", 0);
    let kinds: Vec<_> = entries.iter().map(|e| &e.kind).collect();
    assert!(matches!(kinds[0], ObservationKind::UserUtterance { .. }));
    assert!(kinds.iter().any(|k| matches!(k, ObservationKind::SearchAttempt { .. })));
    assert!(kinds.iter().any(|k| matches!(k, ObservationKind::ClipSelected { command_seq: 1, .. })));
    assert!(kinds.iter().any(|k| matches!(k, ObservationKind::LlmReasoning { .. })));
}

#[tokio::test]
async fn invalid_play_clip_range_is_rejected_without_incrementing_command_seq() {
    let llm = Arc::new(ScriptedLlm::new(vec![Completion {
        reasoning: None,
        tool_calls: vec![ToolCall::PlayClip {
            call_id: "call-1".to_string(),
            args: PlayClipArgs { clip_id: "clip-1".to_string(), start_seconds: 5.0, end_seconds: 1.0 },
        }],
    }]));
    let clip_search = Arc::new(FakeClipSearch { candidate: candidate() });
    let (pipeline, journal, _registry) = build_pipeline(llm, clip_search);

    pipeline.run(stream::iter(vec![utterance("play something backwards")]).boxed()).await;

    let entries = journal.read_from("sess-1", 0);
    assert!(entries
        .iter()
        .any(|e| matches!(&e.kind, ObservationKind::Error { kind, .. } if kind == "invalid_tool_call")));
}

#[tokio::test]
async fn three_consecutive_tool_call_free_turns_append_a_stalled_error() {
    let llm = Arc::new(ScriptedLlm::new(vec![Completion::default()]));
    let clip_search = Arc::new(FakeClipSearch { candidate: candidate() });
    let (pipeline, journal, _registry) = build_pipeline(llm, clip_search);

    let utterances = vec![utterance("hello"), utterance("still here"), utterance("anyone home")];
    pipeline.run(stream::iter(utterances).boxed()).await;

    let entries = journal.read_from("sess-1", 0);
    assert!(entries
        .iter()
        .any(|e| matches!(&e.kind, ObservationKind::Error { kind, .. } if kind == "stalled")));
}

#[tokio::test]
async fn llm_error_is_journaled_and_turn_ends() {
    struct FailingLlm;
    #[async_trait]
    impl LanguageModel for FailingLlm {
        async fn complete(&self, _history: &[Message], _prior_results: &[ToolResult]) -> Result<Completion> {
            Err(Error::LlmFailed("backend unreachable".to_string()))
        }
        fn model_id(&self) -> &str {
            "failing"
        }
    }

    let clip_search = Arc::new(FakeClipSearch { candidate: candidate() });
    let (pipeline, journal, _registry) = build_pipeline(Arc::new(FailingLlm), clip_search);

    pipeline.run(stream::iter(vec![utterance("hello")]).boxed()).await;

    let entries = journal.read_from("sess-1", 0);
    assert!(entries.iter().any(|e| matches!(&e.kind, ObservationKind::Error { kind, .. } if kind == "llm")));
}

#[tokio::test]
async fn llm_is_called_again_with_tool_results_until_no_more_tool_calls() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        Completion {
            reasoning: None,
            tool_calls: vec![ToolCall::SearchClips {
                call_id: "call-1".to_string(),
                args: SearchClipsArgs { query: "greeting".to_string(), top_k: 3 },
            }],
        },
        Completion {
            reasoning: Some("playing it".to_string()),
            tool_calls: vec![ToolCall::PlayClip {
                call_id: "call-2".to_string(),
                args: PlayClipArgs { clip_id: "clip-1".to_string(), start_seconds: 0.0, end_seconds: 5.0 },
            }],
        },
    ]));
    let clip_search = Arc::new(FakeClipSearch { candidate: candidate() });
    let (pipeline, journal, _registry) = build_pipeline(llm, clip_search);

    pipeline.run(stream::iter(vec![utterance("show me a greeting")]).boxed()).await;

    let entries = journal.read_from("sess-1", 0);
    let kinds: Vec<_> = entries.iter().map(|e| &e.kind).collect();
    assert!(kinds.iter().any(|k| matches!(k, ObservationKind::SearchAttempt { .. })));
    assert!(kinds.iter().any(|k| matches!(k, ObservationKind::ClipSelected { command_seq: 1, .. })));
}

#[tokio::test]
async fn repeated_llm_failures_terminate_the_session() {
    struct FailingLlm;
    #[async_trait]
    impl LanguageModel for FailingLlm {
        async fn complete(&self, _history: &[Message], _prior_results: &[ToolResult]) -> Result<Completion> {
            Err(Error::LlmFailed("backend unreachable".to_string()))
        }
        fn model_id(&self) -> &str {
            "failing"
        }
    }

    let clip_search = Arc::new(FakeClipSearch { candidate: candidate() });
    let (pipeline, journal, registry) = build_pipeline(Arc::new(FailingLlm), clip_search);

    let utterances = vec![
        utterance("a"),
        utterance("b"),
        utterance("c"),
        utterance("d"),
        utterance("e"),
    ];
    pipeline.run(stream::iter(utterances).boxed()).await;

    let session = registry.get_by_identifier("sess-1").unwrap();
    assert_eq!(session.state, SessionState::Terminating);

    let entries = journal.read_from("sess-1", 0);
    let llm_errors = entries
        .iter()
        .filter(|e| matches!(&e.kind, ObservationKind::Error { kind, .. } if kind == "llm"))
        .count();
    assert_eq!(llm_errors, 5);
}

#[tokio::test]
async fn transport_lost_during_play_clip_marks_session_degraded() {
    struct FailingTransport;
    #[async_trait]
    impl Transport for FailingTransport {
        async fn create_room(&self) -> Result<(String, String)> {
            Ok(("room".to_string(), "token".to_string()))
        }
        async fn destroy_room(&self, _room_url: &str) -> Result<()> {
            Ok(())
        }
        async fn send_app_message(&self, _room_url: &str, _payload: Vec<u8>, _recipient: Recipient) -> Result<()> {
            Err(Error::TransportLost("gateway gone".to_string()))
        }
        async fn subscribe(&self, _room_url: &str) -> Result<BoxStream<'static, TransportEvent>> {
            Ok(stream::empty().boxed())
        }
    }

    let llm = Arc::new(ScriptedLlm::new(vec![Completion {
        reasoning: None,
        tool_calls: vec![ToolCall::PlayClip {
            call_id: "call-1".to_string(),
            args: PlayClipArgs { clip_id: "clip-1".to_string(), start_seconds: 0.0, end_seconds: 5.0 },
        }],
    }]));
    let clip_search = Arc::new(FakeClipSearch { candidate: candidate() });

    let journal = Arc::new(StatusJournal::new(JournalConfig::default()));
    let registry = Arc::new(SessionRegistry::new());
    registry.create("room-1", "sess-1").unwrap();
    registry.transition_to("sess-1", SessionState::Active).unwrap();
    let (events_tx, _events_rx) = mpsc::unbounded_channel();

    let pipeline = ConversationPipeline::new(
        "sess-1",
        "room-1",
        Arc::new(FailingTransport),
        llm,
        clip_search,
        journal.clone(),
        registry.clone(),
        events_tx,
        PipelineConfig { turn_timeout: Duration::from_secs(5), ..Default::default() },
    );

    pipeline.run(stream::iter(vec![utterance("play clip-1")]).boxed()).await;

    let session = registry.get_by_identifier("sess-1").unwrap();
    assert_eq!(session.state, SessionState::Degraded);
}
