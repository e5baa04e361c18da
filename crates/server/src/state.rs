//! Application state: the collaborators every handler and session actor
//! shares (spec §4.7, §5 "shared-resource policy").

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use orchestrator_clipsearch::HttpClipSearch;
use orchestrator_config::Settings;
use orchestrator_core::{ClipSearch, Error, LanguageModel, Result, Transcriber, Transport};
use orchestrator_journal::StatusJournal;
use orchestrator_llm::HttpLanguageModel;
use orchestrator_registry::{ReaperEvent, ReaperThresholds, SessionRegistry};
use orchestrator_supervisor::DeviceProcessSupervisor;
use orchestrator_transcriber::HttpTranscriber;
use orchestrator_transport::HttpTransportClient;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// The two background tasks a connected session owns: the transport event
/// pump (demuxes audio from control events) and the pipeline actor itself.
/// Dropped/aborted together on cleanup.
pub struct SessionTasks {
    pub event_pump: JoinHandle<()>,
    pub pipeline: JoinHandle<()>,
}

/// Settings are reloadable (spec §12 `/admin/reload-config`): handlers and
/// newly-started session actors always read the current value; components
/// already running against an older snapshot (a spawned reaper, an active
/// pipeline actor) keep what they were started with, the same partial-reload
/// posture the teacher's config hot-reload takes with its Tower layers.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<RwLock<Settings>>,
    pub registry: Arc<SessionRegistry>,
    pub journal: Arc<StatusJournal>,
    pub supervisor: Arc<DeviceProcessSupervisor>,
    pub transport: Arc<dyn Transport>,
    pub transcriber: Arc<dyn Transcriber>,
    pub llm: Arc<dyn LanguageModel>,
    pub clip_search: Arc<dyn ClipSearch>,
    pub tasks: Arc<RwLock<HashMap<String, SessionTasks>>>,
    /// Shared with the reaper (`spawn_reaper`'s sender side): lets a
    /// session's own pipeline actor request its teardown (repeated LLM
    /// failure, spec §7/§8 S6) through the same channel the periodic reaper
    /// scan uses, so both funnel into one cleanup path in `main.rs`.
    pub termination_tx: mpsc::UnboundedSender<ReaperEvent>,
    /// Rooms `cleanup_session` has already torn down, so a second
    /// `/cleanup-room` call for the same room (spec §8: "second call returns
    /// a terminal report with empty errors and all flags true") can be
    /// answered even though the session itself is gone from `registry`.
    cleaned_rooms: Arc<RwLock<HashSet<String>>>,
    env: Option<String>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        env: Option<String>,
        settings: Settings,
        registry: Arc<SessionRegistry>,
        journal: Arc<StatusJournal>,
        supervisor: Arc<DeviceProcessSupervisor>,
        transport: Arc<dyn Transport>,
        transcriber: Arc<dyn Transcriber>,
        llm: Arc<dyn LanguageModel>,
        clip_search: Arc<dyn ClipSearch>,
        termination_tx: mpsc::UnboundedSender<ReaperEvent>,
    ) -> Self {
        Self {
            settings: Arc::new(RwLock::new(settings)),
            registry,
            journal,
            supervisor,
            transport,
            transcriber,
            llm,
            clip_search,
            tasks: Arc::new(RwLock::new(HashMap::new())),
            termination_tx,
            cleaned_rooms: Arc::new(RwLock::new(HashSet::new())),
            env,
        }
    }

    /// Returns the idempotent terminal report for a room that's already been
    /// cleaned up, if any (spec §8 `cleanup_room` idempotence).
    pub fn cleaned_room_outcome(&self, room_url: &str) -> Option<CleanupOutcome> {
        if self.cleaned_rooms.read().contains(room_url) {
            Some(CleanupOutcome {
                bot_terminated: true,
                pi_client_terminated: true,
                video_service_terminated: true,
                errors: Vec::new(),
            })
        } else {
            None
        }
    }

    pub fn settings_snapshot(&self) -> Settings {
        self.settings.read().clone()
    }

    /// Re-reads `config/default.{toml,yaml}` + the env overlay + environment
    /// variables and swaps it in; future `/connect` calls and reload-aware
    /// reads pick it up immediately (spec §12).
    pub fn reload_config(&self) -> anyhow::Result<()> {
        let reloaded = orchestrator_config::load_settings(self.env.as_deref())?;
        *self.settings.write() = reloaded;
        Ok(())
    }

    pub fn reaper_thresholds(&self) -> ReaperThresholds {
        let settings = self.settings.read();
        let session = &settings.session;
        ReaperThresholds {
            connect_timeout: Duration::from_secs(session.connect_timeout_seconds),
            idle_timeout: Duration::from_secs(session.idle_timeout_seconds),
            transport_grace: Duration::from_secs(session.transport_grace_seconds),
            interval: Duration::from_secs(session.reaper_interval_seconds),
        }
    }

    /// Orderly teardown for one session (spec §4.6 `Terminating` row, §4.7
    /// `cleanup_room`): cancels its tasks, kills edge processes, tears down
    /// the transport room, then waits for `verify_clean` before marking the
    /// session `Terminated` and dropping it from the registry.
    pub async fn cleanup_session(&self, identifier: &str) -> Result<CleanupOutcome> {
        let session = self.registry.get_by_identifier(identifier).ok_or_else(|| Error::UnknownSession(identifier.to_string()))?;
        let _ = self.registry.transition_to(identifier, orchestrator_core::SessionState::Terminating);

        if let Some(tasks) = self.tasks.write().remove(identifier) {
            tasks.event_pump.abort();
            tasks.pipeline.abort();
        }

        let report = self.supervisor.terminate(identifier).await;

        let destroy_result = self.transport.destroy_room(&session.room_url).await;
        let bot_terminated = destroy_result.is_ok();
        let mut errors: Vec<String> = report.errors.iter().map(|e| e.to_string()).collect();
        if let Err(e) = &destroy_result {
            errors.push(e.to_string());
        }

        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        while tokio::time::Instant::now() < deadline {
            if self.supervisor.verify_clean(identifier) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }

        let _ = self.registry.transition_to(identifier, orchestrator_core::SessionState::Terminated);
        self.journal.remove(identifier);
        let _ = self.registry.remove(identifier);
        self.cleaned_rooms.write().insert(session.room_url.clone());

        Ok(CleanupOutcome {
            bot_terminated,
            pi_client_terminated: report.capture_terminated,
            video_service_terminated: report.player_terminated,
            errors,
        })
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CleanupOutcome {
    pub bot_terminated: bool,
    pub pi_client_terminated: bool,
    pub video_service_terminated: bool,
    pub errors: Vec<String>,
}

/// Builds the real (HTTP-backed) collaborator set from settings (spec §6
/// "Configuration"). The in-memory transport used by tests is wired up by
/// the caller instead of through this constructor.
pub fn build_http_collaborators(
    settings: &Settings,
) -> anyhow::Result<(Arc<dyn Transport>, Arc<dyn Transcriber>, Arc<dyn LanguageModel>, Arc<dyn ClipSearch>)> {
    let transport = HttpTransportClient::new(orchestrator_transport::HttpTransportConfig {
        api_key: settings.transport.api_key.clone(),
        ..Default::default()
    })?;

    let transcriber = HttpTranscriber::new(orchestrator_transcriber::HttpTranscriberConfig::default())?;

    let llm = HttpLanguageModel::new(orchestrator_llm::HttpLlmConfig {
        api_key: settings.llm.api_key.clone(),
        model_id: settings.llm.model_id.clone(),
        request_timeout: Duration::from_secs(settings.llm.turn_timeout_seconds),
        ..Default::default()
    })?;

    let clip_search = HttpClipSearch::new(orchestrator_clipsearch::HttpClipSearchConfig {
        endpoint: settings.search.endpoint.clone(),
        timeout: Duration::from_secs(settings.search.timeout_seconds),
    })?;

    Ok((Arc::new(transport), Arc::new(transcriber), Arc::new(llm), Arc::new(clip_search)))
}
