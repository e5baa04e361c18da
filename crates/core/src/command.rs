//! Play Command (spec §3): the orchestrator-to-edge message.

/// Command instructing the edge device to play a clip. `command_seq` is
/// strictly increasing per session; the edge may drop any command whose
/// `command_seq` is lower than one it has already begun executing.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PlayCommand {
    pub session_id: String,
    pub source_uri: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub fullscreen: bool,
    pub issued_at: chrono::DateTime<chrono::Utc>,
    pub command_seq: u64,
}

/// Wire payload for the `video-playback-command` app message (spec §6).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlaybackCommandPayload {
    Play {
        source_uri: String,
        start_seconds: f64,
        end_seconds: f64,
        fullscreen: bool,
        command_seq: u64,
    },
    Stop {
        command_seq: u64,
    },
}

impl From<&PlayCommand> for PlaybackCommandPayload {
    fn from(cmd: &PlayCommand) -> Self {
        PlaybackCommandPayload::Play {
            source_uri: cmd.source_uri.clone(),
            start_seconds: cmd.start_seconds,
            end_seconds: cmd.end_seconds,
            fullscreen: cmd.fullscreen,
            command_seq: cmd.command_seq,
        }
    }
}
