//! Minimal energy-based voice-activity boundary detector.
//!
//! Not a neural VAD — good enough to decide "an utterance just ended" from
//! RMS energy over a sliding window, which is all C2 needs to finalize
//! boundaries (spec §4.2). A real deployment can swap this crate's
//! transcriber for one backed by a proper VAD without touching the
//! `Transcriber` trait.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadState {
    Silence,
    Speech,
}

#[derive(Debug, Clone)]
pub struct VadConfig {
    /// RMS energy (on a 0..=1 normalized scale) above which a frame counts
    /// as speech.
    pub energy_threshold: f32,
    /// Consecutive silent milliseconds required to close an utterance.
    pub silence_hold_ms: u64,
    /// Minimum accumulated speech, below which a silence boundary is
    /// treated as noise rather than a finalized utterance.
    pub min_utterance_ms: u64,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self { energy_threshold: 0.02, silence_hold_ms: 500, min_utterance_ms: 200 }
    }
}

pub struct VoiceActivityDetector {
    config: VadConfig,
    state: VadState,
    silence_accum_ms: u64,
    speech_accum_ms: u64,
}

impl VoiceActivityDetector {
    pub fn new(config: VadConfig) -> Self {
        Self { config, state: VadState::Silence, silence_accum_ms: 0, speech_accum_ms: 0 }
    }

    fn rms(samples: &[i16]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = samples.iter().map(|s| (*s as f64 / i16::MAX as f64).powi(2)).sum();
        ((sum_sq / samples.len() as f64).sqrt()) as f32
    }

    /// Feeds one frame; returns `true` when this frame closes an utterance
    /// long enough to finalize (the caller should flush its buffer).
    pub fn push_frame(&mut self, samples: &[i16], duration_ms: u64) -> bool {
        let is_speech = Self::rms(samples) >= self.config.energy_threshold;

        match (self.state, is_speech) {
            (VadState::Silence, true) => {
                self.state = VadState::Speech;
                self.speech_accum_ms = duration_ms;
                self.silence_accum_ms = 0;
                false
            }
            (VadState::Speech, true) => {
                self.speech_accum_ms += duration_ms;
                self.silence_accum_ms = 0;
                false
            }
            (VadState::Speech, false) => {
                self.silence_accum_ms += duration_ms;
                if self.silence_accum_ms >= self.config.silence_hold_ms {
                    let finalized = self.speech_accum_ms >= self.config.min_utterance_ms;
                    self.state = VadState::Silence;
                    self.speech_accum_ms = 0;
                    self.silence_accum_ms = 0;
                    finalized
                } else {
                    false
                }
            }
            (VadState::Silence, false) => false,
        }
    }

    pub fn state(&self) -> VadState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loud_frame() -> Vec<i16> {
        vec![12_000, -12_000].repeat(80)
    }

    fn silent_frame() -> Vec<i16> {
        vec![0i16; 160]
    }

    #[test]
    fn finalizes_after_speech_then_sustained_silence() {
        let mut vad = VoiceActivityDetector::new(VadConfig::default());
        assert!(!vad.push_frame(&loud_frame(), 10));
        for _ in 0..25 {
            assert!(!vad.push_frame(&loud_frame(), 10));
        }
        let mut finalized = false;
        for _ in 0..60 {
            if vad.push_frame(&silent_frame(), 10) {
                finalized = true;
                break;
            }
        }
        assert!(finalized);
    }

    #[test]
    fn brief_speech_below_minimum_does_not_finalize() {
        let mut vad = VoiceActivityDetector::new(VadConfig::default());
        vad.push_frame(&loud_frame(), 10);
        let mut finalized = false;
        for _ in 0..60 {
            if vad.push_frame(&silent_frame(), 10) {
                finalized = true;
            }
        }
        assert!(!finalized);
    }
}
