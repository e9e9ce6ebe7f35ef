//! Ranking of active records for `search_relevant`
//!
//! With a query embedding, records are ranked by cosine similarity of their
//! stored embeddings. Without one (no embedder, the call failed, or no record
//! has an embedding yet) a keyword score over title and content is used.

use std::cmp::Ordering;

use serde::Serialize;

use super::KnowledgeRecord;
use crate::model::cosine_similarity;

/// Title matches count this many times a content match
const TITLE_WEIGHT: f32 = 3.0;

/// A record and its relevance to a query
#[derive(Debug, Clone, Serialize)]
pub struct ScoredRecord {
    pub record: KnowledgeRecord,
    pub score: f32,
}

fn query_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|term| term.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect();
    terms.sort();
    terms.dedup();
    terms
}

/// Keyword relevance: weighted occurrences of the query terms
pub fn keyword_score(record: &KnowledgeRecord, terms: &[String]) -> f32 {
    let title = record.title.to_lowercase();
    let content = record.content.to_lowercase();
    terms
        .iter()
        .map(|term| {
            TITLE_WEIGHT * title.matches(term.as_str()).count() as f32
                + content.matches(term.as_str()).count() as f32
        })
        .sum()
}

fn top(mut scored: Vec<ScoredRecord>, limit: usize) -> Vec<ScoredRecord> {
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.record.updated_at.cmp(&a.record.updated_at))
    });
    scored.truncate(limit);
    scored
}

/// Rank by keyword score, dropping records that match no term
pub fn rank_by_keywords(records: Vec<KnowledgeRecord>, query: &str, limit: usize) -> Vec<ScoredRecord> {
    let terms = query_terms(query);
    let scored = records
        .into_iter()
        .map(|record| ScoredRecord {
            score: keyword_score(&record, &terms),
            record,
        })
        .filter(|scored| scored.score > 0.0)
        .collect();
    top(scored, limit)
}

/// Rank records that carry an embedding by cosine similarity to `query`
pub fn rank_by_similarity(
    records: Vec<KnowledgeRecord>,
    query: &[f32],
    limit: usize,
) -> Vec<ScoredRecord> {
    let scored = records
        .into_iter()
        .filter_map(|record| {
            let score = cosine_similarity(record.embedding.as_deref()?, query);
            Some(ScoredRecord { record, score })
        })
        .collect();
    top(scored, limit)
}
