//! # LLM Client Module
//!
//! A unified client for the completion and embedding services used by the
//! summarizer and the knowledge store, each behind a rate limiter so a long
//! crawl cannot exhaust the API quota.
//!
//! ## Key Components
//!
//! - `Client`: wraps a completion model and an embedding model
//! - `ModelQuota`: requests-per-minute budgets for both models
//! - `RateLimitedCompletionModel` / `RateLimitedEmbeddingModel`: rate limiting wrappers
//! - `EmbeddingConversion`: conversion between rig embeddings and stored blobs

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use ratelimited_completion::RateLimitedCompletionModel;
use ratelimited_embedding::RateLimitedEmbeddingModel;
use rig::{completion::CompletionModel, embeddings::EmbeddingModel, providers::gemini};
use tracing::{Instrument, debug, debug_span, warn};

pub mod embedding;
#[cfg(test)]
pub mod mock;
pub mod ratelimited_completion;
pub mod ratelimited_embedding;

pub use embedding::{EmbeddingConversion, cosine_similarity};

/// Default Gemini completion model used for summaries
pub const DEFAULT_COMPLETION_MODEL: &str = "gemini-2.0-flash";

/// Requests-per-minute budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelQuota {
    pub completions_per_minute: u32,
    pub embeddings_per_minute: u32,
}

impl ModelQuota {
    /// Paid tier
    pub const STANDARD: ModelQuota = ModelQuota {
        completions_per_minute: 2000,
        embeddings_per_minute: 1000,
    };

    /// Free tier
    pub const FREE: ModelQuota = ModelQuota {
        completions_per_minute: 30,
        embeddings_per_minute: 1000,
    };
}

impl Default for ModelQuota {
    fn default() -> Self {
        Self::STANDARD
    }
}

fn per_minute(n: u32) -> Quota {
    Quota::per_minute(NonZeroU32::new(n).unwrap_or(NonZeroU32::MIN))
}

/// Take a cell from `limiter`, waiting when the quota is used up.
///
/// Waits are counted in `throttled` and logged with their duration.
pub(crate) async fn wait_for_quota(
    limiter: &DefaultDirectRateLimiter,
    throttled: &AtomicU64,
    service: &'static str,
) {
    if limiter.check().is_ok() {
        return;
    }
    let started = Instant::now();
    limiter
        .until_ready()
        .instrument(debug_span!("quota_wait", service))
        .await;
    let total = throttled.fetch_add(1, Ordering::Relaxed) + 1;
    debug!(
        service,
        waited_ms = started.elapsed().as_millis() as u64,
        throttled = total,
        "Request quota exhausted, waited for the limiter"
    );
}

#[derive(Debug, Clone)]
pub struct Client<C, E>
where
    C: CompletionModel,
    E: EmbeddingModel,
{
    completion_model: C,
    embedding_model: E,
}

pub struct RateLimitResponse<T> {
    #[allow(dead_code)]
    response: T,
}

/// Rate-limited Gemini completion model
pub type GeminiCompletionModel = RateLimitedCompletionModel<gemini::completion::CompletionModel>;

/// Rate-limited Gemini embedding model
pub type GeminiEmbeddingModel = RateLimitedEmbeddingModel<gemini::embedding::EmbeddingModel>;

pub type GeminiClient = Client<GeminiCompletionModel, GeminiEmbeddingModel>;

impl GeminiClient {
    /// Build a Gemini client from `GEMINI_API_KEY`, if it is set
    pub fn gemini_from_env(model: &str, quota: ModelQuota) -> Option<Self> {
        match std::env::var("GEMINI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Some(Self::gemini(&key, model, quota)),
            _ => {
                warn!("GEMINI_API_KEY is not set, summaries fall back to truncation");
                None
            }
        }
    }

    /// Build a Gemini client for an API key
    pub fn gemini(api_key: &str, model: &str, quota: ModelQuota) -> Self {
        debug!(model, ?quota, "Creating Gemini client");
        let gemini_client = gemini::Client::new(api_key);
        Self::new(
            RateLimitedCompletionModel::new(
                gemini_client.completion_model(model),
                RateLimiter::direct(per_minute(quota.completions_per_minute)),
            ),
            RateLimitedEmbeddingModel::new(
                gemini_client.embedding_model(gemini::embedding::EMBEDDING_004),
                RateLimiter::direct(per_minute(quota.embeddings_per_minute)),
            ),
        )
    }
}

impl<C, E> Client<C, E>
where
    C: CompletionModel,
    E: EmbeddingModel,
{
    pub fn new(completion_model: C, embedding_model: E) -> Self {
        Self {
            completion_model,
            embedding_model,
        }
    }

    pub fn completion(&self) -> &C {
        &self.completion_model
    }

    pub fn embedding(&self) -> &E {
        &self.embedding_model
    }

    /// Split into the completion and embedding models
    pub fn into_parts(self) -> (C, E) {
        (self.completion_model, self.embedding_model)
    }
}
