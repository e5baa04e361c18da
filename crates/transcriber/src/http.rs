use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use orchestrator_core::{AudioFrame, Error, Result, Transcriber, Utterance};
use serde::{Deserialize, Serialize};

use crate::resample;
use crate::vad::{VadConfig, VoiceActivityDetector};

#[derive(Debug, Clone)]
pub struct HttpTranscriberConfig {
    pub endpoint: String,
    pub language_tag: String,
    pub request_timeout: Duration,
    pub vad: VadConfig,
}

impl Default for HttpTranscriberConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8090/transcribe".to_string(),
            language_tag: "en".to_string(),
            request_timeout: Duration::from_secs(10),
            vad: VadConfig::default(),
        }
    }
}

#[derive(Serialize)]
struct TranscribeRequest<'a> {
    session_id: &'a str,
    language_tag: &'a str,
    sample_rate_hz: u32,
    samples: &'a [i16],
}

#[derive(Deserialize)]
struct TranscribeResponse {
    text: String,
    #[serde(default)]
    language_tag: Option<String>,
}

/// Buffers one participant's audio, finalizes utterance boundaries with an
/// energy-based VAD, and calls an external STT sidecar once per boundary
/// (spec §4.2). Each session gets its own buffer and VAD instance.
pub struct HttpTranscriber {
    client: reqwest::Client,
    config: HttpTranscriberConfig,
}

impl HttpTranscriber {
    pub fn new(config: HttpTranscriberConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Internal(format!("building transcriber http client: {e}")))?;
        Ok(Self { client, config })
    }

    async fn call_backend(&self, session_id: &str, samples: &[i16]) -> Result<TranscribeResponse> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&TranscribeRequest {
                session_id,
                language_tag: &self.config.language_tag,
                sample_rate_hz: orchestrator_core::SampleRate::CANONICAL.0,
                samples,
            })
            .send()
            .await
            .map_err(|e| Error::TranscriptionFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::TranscriptionFailed(format!("backend returned {}", response.status())));
        }

        response.json().await.map_err(|e| Error::TranscriptionFailed(e.to_string()))
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    fn transcribe_stream(
        &self,
        session_id: String,
        mut audio: BoxStream<'static, AudioFrame>,
    ) -> BoxStream<'static, Result<Utterance>> {
        let client = self.client.clone();
        let config = self.config.clone();

        let stream = async_stream::stream! {
            let mut vad = VoiceActivityDetector::new(config.vad.clone());
            let mut buffer: Vec<i16> = Vec::new();
            let transcriber = HttpTranscriber { client, config: config.clone() };

            while let Some(frame) = audio.next().await {
                let duration_ms = frame.duration_ms();
                let canonical_samples = if frame.is_canonical_rate() {
                    frame.samples.to_vec()
                } else {
                    tracing::debug!(
                        participant_id = %frame.participant_id,
                        input_hz = frame.sample_rate.0,
                        "resampling frame to canonical rate"
                    );
                    resample::to_canonical_rate(&frame.samples, frame.sample_rate)
                };
                buffer.extend_from_slice(&canonical_samples);

                if vad.push_frame(&canonical_samples, duration_ms) {
                    let samples = std::mem::take(&mut buffer);
                    match transcriber.call_backend(&session_id, &samples).await {
                        Ok(response) => {
                            let utterance = Utterance::new(
                                session_id.clone(),
                                response.text,
                                response.language_tag.unwrap_or_else(|| config.language_tag.clone()),
                            );
                            if !utterance.is_empty() {
                                yield Ok(utterance);
                            }
                        }
                        Err(e) => yield Err(e),
                    }
                }
            }
        };

        Box::pin(stream)
    }
}
