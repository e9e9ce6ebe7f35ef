//! Upsert gateway owning embedding generation

use rig::embeddings::EmbeddingModel;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::search::{self, ScoredRecord};
use super::{Database, KnowledgeRecord, MAX_TITLE_CHARS, NewKnowledge, QualityTier, StoreError};
use crate::model::EmbeddingConversion;

/// Knowledge store front door for the pipeline and for consumers
#[derive(Clone)]
pub struct KnowledgeGateway<E: EmbeddingModel> {
    db: Database,
    embedder: Option<E>,
}

impl<E: EmbeddingModel> KnowledgeGateway<E> {
    pub fn new(db: Database, embedder: Option<E>) -> Self {
        Self { db, embedder }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Create or update the record for `entry`.
    ///
    /// The quality tier is recomputed and an embedding generated when an
    /// embedder is configured. An embedding failure is recorded under
    /// `embedding_error` in the metadata and the record is saved without one.
    #[instrument(skip(self, entry), fields(title = %entry.title, url = ?entry.source_url))]
    pub async fn upsert(&self, mut entry: NewKnowledge) -> Result<KnowledgeRecord, StoreError> {
        if entry.title.chars().count() > MAX_TITLE_CHARS {
            entry.title = entry.title.chars().take(MAX_TITLE_CHARS).collect();
        }

        let content_chars = entry.content.chars().count();
        let quality = QualityTier::from_length(content_chars);
        entry
            .metadata
            .insert("quality".to_string(), quality.as_str().into());
        entry
            .metadata
            .insert("content_length".to_string(), content_chars.into());

        let embedding = match &self.embedder {
            Some(embedder) => match embed(embedder, &entry).await {
                Ok(blob) => Some(blob),
                Err(e) => {
                    warn!(error = %e, "Embedding failed, saving record without one");
                    entry
                        .metadata
                        .insert("embedding_error".to_string(), Value::String(e));
                    None
                }
            },
            None => None,
        };

        let record = self.db.upsert(&entry, embedding).await?;
        info!(
            id = record.id,
            quality = quality.as_str(),
            update_count = record.update_count(),
            "Saved knowledge record"
        );
        Ok(record)
    }

    pub async fn get_by_url(&self, url: &str) -> Result<Option<KnowledgeRecord>, StoreError> {
        self.db.get_by_url(url).await
    }

    pub async fn count(&self) -> Result<u64, StoreError> {
        self.db.count().await
    }

    /// Active records as `[category - source] title: content` blocks separated by blank lines
    pub async fn list_active(&self) -> Result<String, StoreError> {
        let records = self.db.list_active().await?;
        Ok(records
            .iter()
            .map(KnowledgeRecord::prompt_block)
            .collect::<Vec<_>>()
            .join("\n\n"))
    }

    /// Active records most relevant to `query`, best first
    #[instrument(skip(self))]
    pub async fn search_relevant(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredRecord>, StoreError> {
        let records = self.db.list_active().await?;

        if let Some(embedder) = &self.embedder {
            if records.iter().any(|r| r.embedding.is_some()) {
                match embedder.embed_texts(vec![query.to_string()]).await {
                    Ok(embeddings) => {
                        if let Some(query_embedding) = embeddings.first() {
                            debug!("Ranking by embedding similarity");
                            return Ok(search::rank_by_similarity(
                                records,
                                &query_embedding.to_vec(),
                                limit,
                            ));
                        }
                    }
                    Err(e) => warn!(error = %e, "Query embedding failed, using keyword search"),
                }
            }
        }

        debug!("Ranking by keywords");
        Ok(search::rank_by_keywords(records, query, limit))
    }
}

async fn embed<E: EmbeddingModel>(embedder: &E, entry: &NewKnowledge) -> Result<Vec<u8>, String> {
    let text = format!("{}\n{}", entry.title, entry.content);
    let embeddings = embedder
        .embed_texts(vec![text])
        .await
        .map_err(|e| e.to_string())?;
    embeddings
        .first()
        .map(|embedding| embedding.to_blob())
        .ok_or_else(|| "embedding service returned no vectors".to_string())
}
