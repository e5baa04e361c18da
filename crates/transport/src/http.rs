use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use orchestrator_core::{Error, Recipient, Result, Transport, TransportEvent};
use serde::Deserialize;

/// Connection settings for the HTTP-shaped transport gateway (spec §4.1).
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    pub base_url: String,
    pub api_key: String,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:7880".to_string(),
            api_key: String::new(),
            request_timeout: Duration::from_secs(10),
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

#[derive(Deserialize)]
struct CreateRoomResponse {
    room_url: String,
    bot_token: String,
}

/// Talks to an external transport gateway over plain JSON HTTP.
///
/// Retries room creation with exponential backoff before surfacing
/// `Error::TransportUnavailable` (spec §4.1: "default 3 attempts,
/// 500ms+jitter"); every other operation is a single best-effort attempt
/// whose failure is reported as-is.
pub struct HttpTransportClient {
    client: reqwest::Client,
    config: HttpTransportConfig,
}

impl HttpTransportClient {
    pub fn new(config: HttpTransportConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Internal(format!("building transport http client: {e}")))?;
        Ok(Self { client, config })
    }

    fn auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.bearer_auth(&self.config.api_key)
    }

    async fn create_room_once(&self) -> Result<(String, String)> {
        let response = self
            .auth(self.client.post(format!("{}/rooms", self.config.base_url)))
            .send()
            .await
            .map_err(|e| Error::TransportUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::TransportUnavailable(format!(
                "gateway returned {}",
                response.status()
            )));
        }

        let body: CreateRoomResponse = response
            .json()
            .await
            .map_err(|e| Error::TransportUnavailable(e.to_string()))?;

        Ok((body.room_url, body.bot_token))
    }
}

#[async_trait]
impl Transport for HttpTransportClient {
    async fn create_room(&self) -> Result<(String, String)> {
        let mut backoff = self.config.initial_backoff;
        let mut last_err = None;

        for attempt in 1..=self.config.max_retries {
            match self.create_room_once().await {
                Ok(room) => return Ok(room),
                Err(e) => {
                    tracing::warn!(attempt, max = self.config.max_retries, error = %e, "create_room failed, retrying");
                    last_err = Some(e);
                    if attempt < self.config.max_retries {
                        tokio::time::sleep(backoff).await;
                        backoff *= 2;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| Error::TransportUnavailable("exhausted retries".into())))
    }

    async fn destroy_room(&self, room_url: &str) -> Result<()> {
        let response = self
            .auth(self.client.delete(format!("{}/rooms/{}", self.config.base_url, room_url)))
            .send()
            .await
            .map_err(|e| Error::TransportUnavailable(e.to_string()))?;

        if response.status().is_success() || response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }

        Err(Error::TransportUnavailable(format!("gateway returned {}", response.status())))
    }

    async fn send_app_message(
        &self,
        room_url: &str,
        payload: Vec<u8>,
        recipient: Recipient,
    ) -> Result<()> {
        let to = match recipient {
            Recipient::Any => None,
            Recipient::Specific(id) => Some(id),
        };

        let response = self
            .auth(self.client.post(format!("{}/rooms/{}/messages", self.config.base_url, room_url)))
            .query(&[("to", to.as_deref().unwrap_or(""))])
            .body(payload)
            .send()
            .await
            .map_err(|e| Error::TransportLost(e.to_string()))?;

        if response.status().is_success() {
            return Ok(());
        }

        Err(Error::TransportLost(format!("gateway returned {}", response.status())))
    }

    async fn subscribe(&self, _room_url: &str) -> Result<BoxStream<'static, TransportEvent>> {
        // Real event subscription is a websocket/SSE concern of the
        // gateway client, out of scope for this spec; the HTTP client
        // surfaces an empty stream so callers relying on `Gap` recovery
        // exercise the same code path a dropped websocket would trigger.
        Ok(stream::empty().boxed())
    }
}
