//! Transcriber capability (C2, spec §4.2).

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::audio::AudioFrame;
use crate::error::Result;
use crate::utterance::Utterance;

/// Converts one participant's audio frames into finalized utterances.
///
/// Implementations decide utterance boundaries with a voice-activity
/// heuristic; every `Utterance` the stream yields is treated as final by
/// the caller — there is no "is this really done" negotiation at this
/// layer. Must be safe to run one instance per session concurrently, and
/// must not buffer audio beyond what's needed to finalize the current
/// utterance (spec §4.2).
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Begin transcribing a stream of audio frames for one session,
    /// yielding finalized utterances as boundaries are detected.
    fn transcribe_stream(
        &self,
        session_id: String,
        audio: BoxStream<'static, AudioFrame>,
    ) -> BoxStream<'static, Result<Utterance>>;
}
