use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use governor::DefaultDirectRateLimiter;
use rig::embeddings::{Embedding, EmbeddingError, EmbeddingModel};
use tracing::{Instrument, info_span};

use super::wait_for_quota;

/// Knowledge embeddings under a shared request quota; one cell per batch
#[derive(Clone)]
pub struct RateLimitedEmbeddingModel<M: EmbeddingModel> {
    model: M,
    limiter: Arc<DefaultDirectRateLimiter>,
    throttled: Arc<AtomicU64>,
}

impl<M> RateLimitedEmbeddingModel<M>
where
    M: EmbeddingModel,
{
    pub fn new(model: M, limiter: DefaultDirectRateLimiter) -> Self {
        Self {
            model,
            limiter: Arc::new(limiter),
            throttled: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Batches that had to wait for quota, across all clones
    pub fn throttled_requests(&self) -> u64 {
        self.throttled.load(Ordering::Relaxed)
    }
}

impl<M: EmbeddingModel> EmbeddingModel for RateLimitedEmbeddingModel<M> {
    const MAX_DOCUMENTS: usize = M::MAX_DOCUMENTS;

    fn ndims(&self) -> usize {
        self.model.ndims()
    }

    async fn embed_texts(
        &self,
        texts: impl IntoIterator<Item = String> + Send,
    ) -> Result<Vec<Embedding>, EmbeddingError> {
        let texts: Vec<String> = texts.into_iter().collect();
        let documents = texts.len();
        let chars: usize = texts.iter().map(|t| t.chars().count()).sum();
        wait_for_quota(&self.limiter, &self.throttled, "embedding").await;
        self.model
            .embed_texts(texts)
            .instrument(info_span!(
                "knowledge_embedding",
                documents,
                chars,
                ndims = self.model.ndims()
            ))
            .await
    }
}
