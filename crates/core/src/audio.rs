//! Audio frame type shared between Transport and Transcriber.
//!
//! Canonical format is 16-bit signed PCM, mono, 16 kHz (spec §4.2); frames
//! arriving at a different rate are resampled by the Transcriber, not by
//! the transport.

use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SampleRate(pub u32);

impl SampleRate {
    pub const CANONICAL: SampleRate = SampleRate(16_000);
}

/// One chunk of PCM audio captured from a single participant.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub participant_id: String,
    pub samples: Arc<[i16]>,
    pub sample_rate: SampleRate,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl AudioFrame {
    pub fn duration_ms(&self) -> u64 {
        (self.samples.len() as u64 * 1000) / self.sample_rate.0.max(1) as u64
    }

    pub fn is_canonical_rate(&self) -> bool {
        self.sample_rate == SampleRate::CANONICAL
    }
}
