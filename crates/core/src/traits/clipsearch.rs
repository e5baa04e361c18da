//! Clip Search capability (C3, spec §4.3).

use async_trait::async_trait;

use crate::clip::ClipCandidate;
use crate::error::Result;

/// Abstracts the external clip retrieval service. Implementations own their
/// own ranking; the orchestrator treats results as already ordered
/// best-first and takes the top `top_k` as-is (spec §4.3).
#[async_trait]
pub trait ClipSearch: Send + Sync {
    /// Returns up to `top_k` candidates for `query`, best match first. An
    /// empty result is a valid answer ("no results found", spec §4.4 step
    /// 4); only an unreachable backend or a timeout surfaces an error.
    async fn search(&self, query: &str, top_k: u32) -> Result<Vec<ClipCandidate>>;
}
