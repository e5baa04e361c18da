//! Clip Search client (C3, spec §4.3).

use std::time::Duration;

use async_trait::async_trait;
use orchestrator_core::{ClipCandidate, ClipSearch, Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct HttpClipSearchConfig {
    pub endpoint: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for HttpClipSearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9100/search".to_string(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
            backoff: Duration::from_millis(200),
        }
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    top_k: u32,
}

#[derive(Deserialize)]
struct SearchResponse {
    results: Vec<ClipCandidate>,
}

/// Calls an external semantic clip search backend (spec §4.3). The backend
/// owns ranking; this client takes its ordering as-is and only validates
/// well-formedness of what comes back, dropping malformed candidates with a
/// warning rather than failing the whole search.
pub struct HttpClipSearch {
    client: reqwest::Client,
    config: HttpClipSearchConfig,
}

impl HttpClipSearch {
    pub fn new(config: HttpClipSearchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Internal(format!("building clip search http client: {e}")))?;
        Ok(Self { client, config })
    }

    async fn search_once(&self, query: &str, top_k: u32) -> Result<Vec<ClipCandidate>> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&SearchRequest { query, top_k })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::SearchTimeout
                } else {
                    Error::SearchUnavailable(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(Error::SearchUnavailable(format!("backend returned {}", response.status())));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::SearchUnavailable(e.to_string()))?;

        let results = body
            .results
            .into_iter()
            .filter(|c| {
                if !c.is_well_formed() {
                    tracing::warn!(clip_id = %c.clip_id, "dropping malformed clip candidate");
                    false
                } else {
                    true
                }
            })
            .take(top_k as usize)
            .collect();

        Ok(results)
    }
}

#[async_trait]
impl ClipSearch for HttpClipSearch {
    /// Retries `SearchUnavailable` up to `max_retries` attempts with a fixed
    /// backoff (spec §4.3: "retried up to 2x with 200ms backoff");
    /// `SearchTimeout` is surfaced immediately.
    async fn search(&self, query: &str, top_k: u32) -> Result<Vec<ClipCandidate>> {
        let mut last_err = None;

        for attempt in 1..=self.config.max_retries {
            match self.search_once(query, top_k).await {
                Ok(results) => return Ok(results),
                Err(Error::SearchTimeout) => return Err(Error::SearchTimeout),
                Err(e) => {
                    tracing::warn!(attempt, max = self.config.max_retries, error = %e, "clip search failed, retrying");
                    last_err = Some(e);
                    if attempt < self.config.max_retries {
                        tokio::time::sleep(self.config.backoff).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| Error::SearchUnavailable("exhausted retries".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_match_spec_timeout() {
        let config = HttpClipSearchConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.backoff, Duration::from_millis(200));
    }

    #[tokio::test]
    async fn search_unavailable_against_an_unreachable_endpoint_exhausts_all_retries() {
        let config = HttpClipSearchConfig {
            endpoint: "http://127.0.0.1:1/search".to_string(),
            timeout: Duration::from_millis(200),
            max_retries: 2,
            backoff: Duration::from_millis(10),
        };
        let client = HttpClipSearch::new(config).unwrap();

        let started = std::time::Instant::now();
        let err = client.search("greeting", 3).await.unwrap_err();
        assert!(matches!(err, Error::SearchUnavailable(_)));
        assert!(started.elapsed() >= Duration::from_millis(10));
    }
}
