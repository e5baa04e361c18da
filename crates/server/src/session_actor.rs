//! Wires a freshly-created session to its transport subscription, the
//! transcriber, and its [`ConversationPipeline`] actor (spec §4.4 data flow:
//! edge capture -> C1 -> C4 ingest -> C2 -> utterance -> C4 turn).

use std::sync::Arc;
use std::time::Duration;

use futures::stream::StreamExt;
use orchestrator_core::{ObservationKind, SessionState, TransportEvent};
use orchestrator_pipeline::{ConversationPipeline, PipelineConfig};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::state::{AppState, SessionTasks};

/// Subscribes to the room's transport events, demuxes audio frames to the
/// transcriber and everything else to state transitions/journal entries,
/// and starts the session's pipeline actor.
pub async fn spawn(state: Arc<AppState>, identifier: String, room_url: String) -> orchestrator_core::Result<()> {
    let mut events = state.transport.subscribe(&room_url).await?;
    let (audio_tx, audio_rx) = tokio::sync::mpsc::unbounded_channel();

    let pump_state = state.clone();
    let pump_identifier = identifier.clone();
    let event_pump = tokio::spawn(async move {
        let mut bot_seen = false;
        while let Some(event) = events.next().await {
            match event {
                TransportEvent::Audio(frame) => {
                    if audio_tx.send(frame).is_err() {
                        break;
                    }
                }
                TransportEvent::ParticipantJoined { participant_id, is_bot } => {
                    if !is_bot && !bot_seen {
                        bot_seen = true;
                        let _ = pump_state.registry.transition_to(&pump_identifier, SessionState::Active);
                        let _ = pump_state.registry.touch(&pump_identifier);
                    }
                    pump_state.journal.append(
                        &pump_identifier,
                        ObservationKind::ProcessEvent { detail: format!("participant {participant_id} joined") },
                    );
                }
                TransportEvent::ParticipantLeft { participant_id } => {
                    pump_state.journal.append(
                        &pump_identifier,
                        ObservationKind::ProcessEvent { detail: format!("participant {participant_id} left") },
                    );
                }
                TransportEvent::AppMessage { payload, .. } => {
                    if let Ok(text) = String::from_utf8(payload) {
                        pump_state
                            .journal
                            .append(&pump_identifier, ObservationKind::ProcessEvent { detail: text });
                    }
                }
                TransportEvent::Gap => {
                    let _ = pump_state.registry.transition_to(&pump_identifier, SessionState::Degraded);
                    pump_state.journal.append(
                        &pump_identifier,
                        ObservationKind::ProcessEvent { detail: "transport event gap, marked degraded".to_string() },
                    );
                }
                TransportEvent::Recovered => {
                    let still_degraded = pump_state
                        .registry
                        .get_by_identifier(&pump_identifier)
                        .map(|s| s.state == SessionState::Degraded)
                        .unwrap_or(false);
                    if still_degraded {
                        let _ = pump_state.registry.transition_to(&pump_identifier, SessionState::Active);
                        let _ = pump_state.registry.touch(&pump_identifier);
                        pump_state.journal.append(
                            &pump_identifier,
                            ObservationKind::ProcessEvent { detail: "transport recovered, resumed active".to_string() },
                        );
                    }
                }
            }
        }
    });

    let audio_stream = UnboundedReceiverStream::new(audio_rx).boxed();
    let utterances = state.transcriber.transcribe_stream(identifier.clone(), audio_stream);

    let pipeline_config = {
        let settings = state.settings.read();
        PipelineConfig {
            context_turns: settings.llm.context_turns,
            turn_timeout: Duration::from_secs(settings.llm.turn_timeout_seconds),
            strict_clip_validation: settings.session.strict_clip_validation,
            ..Default::default()
        }
    };

    let pipeline = ConversationPipeline::new(
        identifier.clone(),
        room_url,
        state.transport.clone(),
        state.llm.clone(),
        state.clip_search.clone(),
        state.journal.clone(),
        state.registry.clone(),
        state.termination_tx.clone(),
        pipeline_config,
    );

    let pipeline_task = tokio::spawn(async move {
        pipeline.run(utterances).await;
    });

    state.tasks.write().insert(identifier, SessionTasks { event_pump, pipeline: pipeline_task });

    Ok(())
}
