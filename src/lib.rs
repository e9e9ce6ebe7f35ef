//! # Scribe - Knowledge Ingestion for Rust
//!
//! Scribe teaches a knowledge base from web pages and hand-written entries.
//! Each page goes through the same sequence:
//!
//! - fetched through a chain of strategies (browser-like, minimal, hosted reader)
//! - decoded to clean Unicode, repairing mojibake and legacy Turkish code pages
//! - stripped of navigation and boilerplate, leaving the main text
//! - condensed by a language model at a requested detail level
//! - upserted into a libsql knowledge store keyed by URL, with an embedding
//!
//! Whole sites are crawled breadth-first within one host, with polled progress
//! and cooperative cancellation.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use scribe::knowledge::{Database, KnowledgeGateway};
//! use scribe::model::{GeminiClient, ModelQuota, DEFAULT_COMPLETION_MODEL};
//! use scribe::pipeline::{Pipeline, PipelineConfig, TrainRequest};
//! use scribe::progress::MemoryRunState;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = GeminiClient::gemini("your-api-key", DEFAULT_COMPLETION_MODEL, ModelQuota::FREE);
//!     let (completion, embedder) = client.into_parts();
//!
//!     let db = Database::new_from_path("knowledge.db").await?;
//!     let knowledge = KnowledgeGateway::new(db, Some(embedder));
//!     let pipeline = Pipeline::new(
//!         PipelineConfig::default(),
//!         Some(completion),
//!         knowledge,
//!         Arc::new(MemoryRunState::new()),
//!     )?;
//!
//!     let response = pipeline.train(&TrainRequest::site("https://example.org/", 2)).await?;
//!     println!("Trained {} pages", response.trained_pages);
//!     Ok(())
//! }
//! ```

mod error;
pub mod model;

pub mod crawler;
pub mod encoding;
pub mod extractor;
pub mod fetcher;
pub mod knowledge;
pub mod pipeline;
pub mod processor;
pub mod progress;
pub mod telemetry;

pub use error::{Error, Result};

/// Re-export of types module for public use
pub mod prelude {
    pub use crate::error::Error;
    pub use crate::error::Result;
    pub use crate::knowledge::{KnowledgeGateway, KnowledgeRecord};
    pub use crate::pipeline::{EntryOptions, Pipeline, PipelineConfig, TrainRequest, TrainResponse};
    pub use crate::processor::DetailLevel;
    pub use crate::progress::RunToken;
}
