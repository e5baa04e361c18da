//! Transport Gateway capability (C1, spec §4.1).

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::audio::AudioFrame;
use crate::error::Result;

/// Recipient selector for `send_app_message`.
#[derive(Debug, Clone)]
pub enum Recipient {
    Any,
    Specific(String),
}

/// Events yielded by a room subscription (spec §4.1). The stream is
/// restartable across a transport outage — implementations re-subscribe
/// transparently and surface a `Gap` marker when continuity can't be
/// guaranteed, the same best-effort posture spec §4.1 asks for.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    ParticipantJoined { participant_id: String, is_bot: bool },
    ParticipantLeft { participant_id: String },
    AppMessage { from: String, payload: Vec<u8> },
    Audio(AudioFrame),
    /// Emitted after a reconnect when events between the drop and the
    /// resubscribe could not be recovered.
    Gap,
    /// Emitted once the resubscribe succeeds and event delivery is
    /// continuous again. Pairs with a preceding `Gap` to let a session move
    /// back from `Degraded` to `Active` within the grace window (spec §8
    /// S5: "transport hiccup... transitions Active -> Degraded -> Active").
    Recovered,
}

/// Abstracts the external WebRTC transport service (spec §4.1).
///
/// Implementations multiplex internally by `room_url`; callers never see
/// connection-pooling concerns. Every operation that can block — room
/// creation, message send — is bounded by a retry/backoff policy owned by
/// the implementation, not the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Creates a room and returns its external address plus a bot
    /// join-token. Retried internally (default 3 attempts, 500ms+jitter)
    /// before surfacing `Error::TransportUnavailable`.
    async fn create_room(&self) -> Result<(String, String)>;

    /// Idempotent: succeeds if the room is already absent.
    async fn destroy_room(&self, room_url: &str) -> Result<()>;

    /// At-least-once delivery; the edge deduplicates via `command_seq`
    /// carried inside `payload`.
    async fn send_app_message(
        &self,
        room_url: &str,
        payload: Vec<u8>,
        recipient: Recipient,
    ) -> Result<()>;

    /// Lazy event stream for the room; yields until `destroy_room` is
    /// called or the upstream closes it.
    async fn subscribe(&self, room_url: &str) -> Result<BoxStream<'static, TransportEvent>>;
}
