//! Facade HTTP surface (C7, spec §6).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use orchestrator_core::{EdgeRole, Error, ObservationKind};

use crate::error::ApiError;
use crate::session_actor;
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/connect", post(connect))
        .route("/rooms", get(list_rooms))
        .route("/register-pi-client", post(register_pi_client))
        .route("/register-video-service", post(register_video_service))
        .route("/cleanup-room", post(cleanup_room))
        .route("/conversation-status/:identifier", get(conversation_status))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/admin/reload-config", post(reload_config))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub room_url: String,
    pub bot_token: String,
    pub identifier: String,
}

/// `POST /connect` (spec §4.7 `connect()`): creates the transport room,
/// registers the session, and starts its pipeline actor. Request body is
/// accepted but ignored in v1 (spec §6).
async fn connect(State(state): State<Arc<AppState>>) -> Result<Json<ConnectResponse>, ApiError> {
    let (room_url, bot_token) = state.transport.create_room().await?;
    let identifier = Uuid::new_v4().to_string();

    state.registry.create(&room_url, &identifier)?;
    state.registry.transition_to(&identifier, orchestrator_core::SessionState::Connecting)?;

    if let Err(e) = session_actor::spawn(state.clone(), identifier.clone(), room_url.clone()).await {
        let _ = state.registry.transition_to(&identifier, orchestrator_core::SessionState::Terminated);
        let _ = state.registry.remove(&identifier);
        return Err(e.into());
    }

    Ok(Json(ConnectResponse { room_url, bot_token, identifier }))
}

#[derive(Debug, Serialize)]
pub struct RoomsResponse {
    pub active_rooms: Vec<orchestrator_core::SessionSnapshot>,
}

/// `GET /rooms` (spec §4.7 `list_active()`).
async fn list_rooms(State(state): State<Arc<AppState>>) -> Json<RoomsResponse> {
    Json(RoomsResponse { active_rooms: state.registry.list_active() })
}

#[derive(Debug, Deserialize)]
pub struct RegisterPiClientRequest {
    pub room_url: String,
    pub pi_client_pid: u32,
}

#[derive(Debug, Deserialize)]
pub struct RegisterVideoServiceRequest {
    pub room_url: String,
    pub video_service_pid: u32,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// `POST /register-pi-client` (spec §4.5, §4.7 `register_edge_pid`).
async fn register_pi_client(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterPiClientRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    register_edge_pid(&state, &req.room_url, EdgeRole::Capture, req.pi_client_pid)?;
    Ok(Json(OkResponse { ok: true }))
}

/// `POST /register-video-service` (spec §4.5, §4.7 `register_edge_pid`).
async fn register_video_service(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterVideoServiceRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    register_edge_pid(&state, &req.room_url, EdgeRole::Player, req.video_service_pid)?;
    Ok(Json(OkResponse { ok: true }))
}

fn register_edge_pid(state: &AppState, room_url: &str, role: EdgeRole, pid: u32) -> Result<(), Error> {
    let session = state.registry.get_by_room(room_url).ok_or_else(|| Error::UnknownRoom(room_url.to_string()))?;
    state.registry.record_edge_pid(&session.identifier, role, pid)?;
    state.supervisor.register(&session.identifier, role, pid);
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct CleanupRoomRequest {
    pub room_url: String,
}

/// `POST /cleanup-room` (spec §4.7 `cleanup_room`): forces `Terminating` and
/// waits (default 10s) for a clean teardown.
async fn cleanup_room(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CleanupRoomRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(session) = state.registry.get_by_room(&req.room_url) else {
        return match state.cleaned_room_outcome(&req.room_url) {
            Some(outcome) => Ok(Json(outcome)),
            None => Err(Error::UnknownRoom(req.room_url.clone()).into()),
        };
    };

    let outcome = state.cleanup_session(&session.identifier).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct ConversationStatusQuery {
    #[serde(default)]
    pub last_seen: u64,
}

#[derive(Debug, Serialize)]
pub struct ConversationStatusResponse {
    pub state: orchestrator_core::SessionState,
    pub user_speaking: bool,
    pub context: ConversationStatusContext,
}

#[derive(Debug, Serialize)]
pub struct ConversationStatusContext {
    pub status_messages: Vec<orchestrator_core::StatusObservation>,
    pub total_message_count: u64,
}

/// `GET /conversation-status/{identifier}` (spec §4.7 `conversation_status`,
/// §6 wire contract).
async fn conversation_status(
    State(state): State<Arc<AppState>>,
    Path(identifier): Path<String>,
    Query(query): Query<ConversationStatusQuery>,
) -> Result<Json<ConversationStatusResponse>, ApiError> {
    let session = state
        .registry
        .get_by_identifier(&identifier)
        .ok_or_else(|| Error::UnknownSession(identifier.clone()))?;

    let status_messages = state.journal.read_from(&identifier, query.last_seen);
    let total_message_count = status_messages.last().map(|o| o.seq).unwrap_or(query.last_seen);
    let user_speaking = matches!(status_messages.last().map(|o| &o.kind), Some(ObservationKind::UserUtterance { .. }));

    Ok(Json(ConversationStatusResponse {
        state: session.state,
        user_speaking,
        context: ConversationStatusContext { status_messages, total_message_count },
    }))
}

async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "status": "ok", "active_sessions": state.registry.list_active().len() }))
}

/// `POST /admin/reload-config` (spec §12): re-reads configuration from disk
/// and environment without a restart. Already-running sessions keep the
/// snapshot they started with; new `/connect` calls see the new values.
async fn reload_config(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .reload_config()
        .map_err(|e| ApiError(Error::Internal(format!("reload-config failed: {e}"))))?;
    Ok(Json(json!({ "ok": true })))
}
