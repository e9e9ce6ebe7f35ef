//! # Knowledge Store Module
//!
//! Persistent knowledge records consumed by the downstream assistant. Each
//! record is created on the first successful ingestion of its key and updated
//! in place on every later one; the pipeline never deletes records.
//!
//! ## Key Components
//!
//! - `Database`: libsql storage with an atomic create-or-update
//! - `KnowledgeGateway`: adds quality tiers and embeddings on top of `Database`
//! - `KnowledgeRecord` / `NewKnowledge`: stored rows and upsert input
//! - `search`: cosine and keyword ranking for `search_relevant`

mod database;
pub mod error;
mod gateway;
mod schema;
pub mod search;

pub use database::Database;
pub use error::StoreError;
pub use gateway::KnowledgeGateway;
pub use search::ScoredRecord;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Maximum stored title length, in characters
pub const MAX_TITLE_CHARS: usize = 512;

/// Metadata key counting in-place updates
pub const UPDATE_COUNT_KEY: &str = "update_count";

/// A stored knowledge entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub source: String,
    pub source_url: Option<String>,
    pub category: String,
    pub author: Option<String>,
    pub language: String,
    pub metadata: Map<String, Value>,
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl KnowledgeRecord {
    /// How many times the record was updated after creation
    pub fn update_count(&self) -> u64 {
        self.metadata
            .get(UPDATE_COUNT_KEY)
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    /// The `[category - source] title: content` block handed to the assistant
    pub fn prompt_block(&self) -> String {
        format!(
            "[{} - {}] {}: {}",
            self.category, self.source, self.title, self.content
        )
    }
}

/// Input to an upsert
#[derive(Debug, Clone, PartialEq)]
pub struct NewKnowledge {
    pub title: String,
    pub content: String,
    pub source: String,
    /// Dedup key when present; otherwise the title is
    pub source_url: Option<String>,
    pub category: String,
    pub author: Option<String>,
    pub language: String,
    pub metadata: Map<String, Value>,
}

impl NewKnowledge {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        source: impl Into<String>,
        category: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            source: source.into(),
            source_url: None,
            category: category.into(),
            author: None,
            language: language.into(),
            metadata: Map::new(),
        }
    }

    pub fn with_source_url(mut self, source_url: impl Into<String>) -> Self {
        self.source_url = Some(source_url.into());
        self
    }

    pub fn with_author(mut self, author: Option<String>) -> Self {
        self.author = author;
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Content-length bucket stored in record metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Low,
    Medium,
    High,
    Excellent,
}

impl QualityTier {
    /// Bucket for a content length in characters
    pub fn from_length(chars: usize) -> Self {
        match chars {
            0..500 => QualityTier::Low,
            500..2000 => QualityTier::Medium,
            2000..5000 => QualityTier::High,
            _ => QualityTier::Excellent,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Low => "low",
            QualityTier::Medium => "medium",
            QualityTier::High => "high",
            QualityTier::Excellent => "excellent",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_tiers() {
        assert_eq!(QualityTier::from_length(0), QualityTier::Low);
        assert_eq!(QualityTier::from_length(499), QualityTier::Low);
        assert_eq!(QualityTier::from_length(500), QualityTier::Medium);
        assert_eq!(QualityTier::from_length(1999), QualityTier::Medium);
        assert_eq!(QualityTier::from_length(2000), QualityTier::High);
        assert_eq!(QualityTier::from_length(5000), QualityTier::Excellent);
        assert_eq!(QualityTier::Excellent.as_str(), "excellent");
    }

    #[test]
    fn test_prompt_block() {
        let record = KnowledgeRecord {
            id: 1,
            title: "Kayıt Tarihleri".to_string(),
            content: "Kayıtlar 1 Eylül'de başlar.".to_string(),
            source: "website".to_string(),
            source_url: None,
            category: "akademik".to_string(),
            author: None,
            language: "tr".to_string(),
            metadata: Map::new(),
            embedding: None,
            is_active: true,
            created_at: 0,
            updated_at: 0,
        };
        assert_eq!(
            record.prompt_block(),
            "[akademik - website] Kayıt Tarihleri: Kayıtlar 1 Eylül'de başlar."
        );
        assert_eq!(record.update_count(), 0);
    }
}
