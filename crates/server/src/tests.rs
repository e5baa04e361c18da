#![cfg(test)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::stream::{self, BoxStream, StreamExt};
use orchestrator_config::{LlmConfig, SearchConfig, ServerConfig, SessionConfig, Settings, TransportConfig};
use orchestrator_core::{AudioFrame, ClipCandidate, ClipSearch, Completion, LanguageModel, Message, Result, ToolResult, Transcriber, Utterance};
use orchestrator_journal::StatusJournal;
use orchestrator_registry::SessionRegistry;
use orchestrator_supervisor::{DeviceProcessSupervisor, SupervisorConfig};
use orchestrator_transport::mock::InMemoryTransport;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::state::AppState;

struct EmptyTranscriber;

impl Transcriber for EmptyTranscriber {
    fn transcribe_stream(&self, _session_id: String, _audio: BoxStream<'static, AudioFrame>) -> BoxStream<'static, Result<Utterance>> {
        stream::empty().boxed()
    }
}

struct StallLlm;

#[async_trait]
impl LanguageModel for StallLlm {
    async fn complete(&self, _history: &[Message], _prior_results: &[ToolResult]) -> Result<Completion> {
        Ok(Completion::default())
    }
    fn model_id(&self) -> &str {
        "stall"
    }
}

struct EmptyClipSearch;

#[async_trait]
impl ClipSearch for EmptyClipSearch {
    async fn search(&self, _query: &str, _top_k: u32) -> Result<Vec<ClipCandidate>> {
        Ok(Vec::new())
    }
}

fn test_settings() -> Settings {
    Settings {
        server: ServerConfig::default(),
        transport: TransportConfig { api_key: "test".into() },
        llm: LlmConfig { api_key: "test".into(), model_id: "test-model".into(), context_turns: 12, turn_timeout_seconds: 30 },
        search: SearchConfig { endpoint: "http://localhost:9100".into(), timeout_seconds: 5 },
        session: SessionConfig::default(),
        journal: orchestrator_config::JournalConfig::default(),
    }
}

fn test_state() -> Arc<AppState> {
    let (events_tx, _events_rx) = tokio::sync::mpsc::unbounded_channel();
    Arc::new(AppState::new(
        None,
        test_settings(),
        Arc::new(SessionRegistry::new()),
        Arc::new(StatusJournal::new(orchestrator_journal::JournalConfig::default())),
        Arc::new(DeviceProcessSupervisor::new(SupervisorConfig::default())),
        Arc::new(InMemoryTransport::new()),
        Arc::new(EmptyTranscriber),
        Arc::new(StallLlm),
        Arc::new(EmptyClipSearch),
        events_tx,
    ))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn connect_register_and_cleanup_round_trip() {
    let state = test_state();
    let app = crate::create_router(state);

    let response = app
        .clone()
        .oneshot(Request::builder().method("POST").uri("/connect").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let connect: Value = body_json(response).await;
    let room_url = connect["room_url"].as_str().unwrap().to_string();

    let response = app.clone().oneshot(Request::builder().uri("/rooms").body(Body::empty()).unwrap()).await.unwrap();
    let rooms: Value = body_json(response).await;
    assert_eq!(rooms["active_rooms"].as_array().unwrap().len(), 1);

    let register_body = json!({ "room_url": room_url, "pi_client_pid": 999_999 }).to_string();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/register-pi-client")
                .header("content-type", "application/json")
                .body(Body::from(register_body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cleanup_body = json!({ "room_url": room_url }).to_string();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/cleanup-room")
                .header("content-type", "application/json")
                .body(Body::from(cleanup_body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let outcome: Value = body_json(response).await;
    assert_eq!(outcome["pi_client_terminated"], json!(true));

    let response = app.clone().oneshot(Request::builder().uri("/rooms").body(Body::empty()).unwrap()).await.unwrap();
    let rooms: Value = body_json(response).await;
    assert!(rooms["active_rooms"].as_array().unwrap().is_empty());

    // a second cleanup for the same room is idempotent, not UnknownRoom.
    let cleanup_body = json!({ "room_url": room_url }).to_string();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/cleanup-room")
                .header("content-type", "application/json")
                .body(Body::from(cleanup_body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let outcome: Value = body_json(response).await;
    assert_eq!(outcome["bot_terminated"], json!(true));
    assert_eq!(outcome["pi_client_terminated"], json!(true));
    assert_eq!(outcome["video_service_terminated"], json!(true));
    assert!(outcome["errors"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn register_edge_pid_for_unknown_room_is_not_found() {
    let state = test_state();
    let app = crate::create_router(state);

    let body = json!({ "room_url": "mem://nope", "video_service_pid": 1 }).to_string();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/register-video-service")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
