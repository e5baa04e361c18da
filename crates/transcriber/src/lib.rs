//! Transcriber client (C2, spec §4.2).

mod http;
mod resample;
mod vad;

pub use http::{HttpTranscriber, HttpTranscriberConfig};
pub use vad::{VadConfig, VadState, VoiceActivityDetector};
