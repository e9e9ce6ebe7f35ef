//! # Mock Models for Testing
//!
//! `MockCompletionModel` answers with a fixed text, an error, or a text after a
//! delay. `MockEmbeddingModel` hashes words into a fixed number of buckets so
//! texts sharing words get similar vectors.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rig::{
    completion::{
        AssistantContent, CompletionError, CompletionModel, CompletionRequest, CompletionResponse,
    },
    embeddings::{Embedding, EmbeddingError, EmbeddingModel},
    one_or_many::OneOrMany,
};

#[derive(Debug, Clone)]
enum Behavior {
    Text(String),
    Fail(String),
    Delayed(Duration, String),
}

/// A completion model returning a predefined answer
#[derive(Debug, Clone)]
pub struct MockCompletionModel {
    behavior: Behavior,
    calls: Arc<AtomicUsize>,
}

impl MockCompletionModel {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::from_behavior(Behavior::Text(text.into()))
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::from_behavior(Behavior::Fail(message.into()))
    }

    pub fn delayed(delay: Duration, text: impl Into<String>) -> Self {
        Self::from_behavior(Behavior::Delayed(delay, text.into()))
    }

    fn from_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of completion requests received so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn text_response(text: &str) -> CompletionResponse<String> {
    CompletionResponse {
        choice: OneOrMany::one(AssistantContent::text(text)),
        raw_response: text.to_string(),
    }
}

impl CompletionModel for MockCompletionModel {
    type Response = String;

    async fn completion(
        &self,
        _completion_request: CompletionRequest,
    ) -> Result<CompletionResponse<Self::Response>, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Text(text) => Ok(text_response(text)),
            Behavior::Fail(message) => Err(CompletionError::ProviderError(message.clone())),
            Behavior::Delayed(delay, text) => {
                tokio::time::sleep(*delay).await;
                Ok(text_response(text))
            }
        }
    }
}

/// A deterministic bag-of-words embedding model
#[derive(Debug, Clone)]
pub struct MockEmbeddingModel {
    ndims: usize,
    fail: bool,
}

impl MockEmbeddingModel {
    pub fn new(ndims: usize) -> Self {
        Self { ndims, fail: false }
    }

    pub fn failing() -> Self {
        Self {
            ndims: 8,
            fail: true,
        }
    }

    fn vectorize(&self, text: &str) -> Vec<f64> {
        let mut vec = vec![0.0; self.ndims.max(1)];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            // FNV-1a
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0xcbf29ce484222325u64, |h, b| (h ^ b as u64).wrapping_mul(0x100000001b3));
            let len = vec.len() as u64;
            vec[(hash % len) as usize] += 1.0;
        }
        vec
    }
}

impl EmbeddingModel for MockEmbeddingModel {
    const MAX_DOCUMENTS: usize = 16;

    fn ndims(&self) -> usize {
        self.ndims
    }

    async fn embed_texts(
        &self,
        texts: impl IntoIterator<Item = String> + Send,
    ) -> Result<Vec<Embedding>, EmbeddingError> {
        if self.fail {
            return Err(EmbeddingError::ProviderError("embedding service unavailable".to_string()));
        }
        Ok(texts
            .into_iter()
            .map(|document| Embedding {
                vec: self.vectorize(&document),
                document,
            })
            .collect())
    }
}
