//! # Ingestion Pipeline
//!
//! Composes the stages into the training operations:
//!
//! - single page: fetch, normalize, extract, summarize, upsert
//! - site: the same sequence for every page of a breadth-first crawl
//! - manual text and question/answer pairs, straight to the knowledge store
//!
//! Every run gets a `RunToken` whose progress and stop flag can be polled and
//! set while it runs. A failing page aborts a single-page run but is only
//! logged during a site crawl.

mod config;
mod error;
mod request;

pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use error::IngestError;
pub use request::{
    DEEP_CRAWL_MAX_PAGES, DEFAULT_MAX_PAGES, EntryOptions, MAX_CRAWL_DEPTH, TrainRequest,
    TrainResponse, default_max_pages,
};

use std::sync::Arc;

use async_trait::async_trait;
use rig::completion::CompletionModel;
use rig::embeddings::EmbeddingModel;
use serde_json::Value;
use tracing::{info, instrument, warn};
use url::Url;

use crate::crawler::{self, CrawlTask, CrawlerConfig, PageVisitor, Visit};
use crate::encoding::{self, DecodePath};
use crate::extractor::{self, Extracted};
use crate::fetcher::{FetchError, Fetcher};
use crate::knowledge::{KnowledgeGateway, KnowledgeRecord, NewKnowledge};
use crate::processor::{DetailLevel, Summarizer};
use crate::progress::{self, ProgressReport, RunHandle, RunStateStore, RunToken, StopAck};

/// Labels and summarization level resolved for one run
#[derive(Debug, Clone)]
struct RunOptions {
    category: String,
    source: String,
    detail_level: DetailLevel,
}

/// A fetched, decoded and extracted page
struct PreparedPage {
    url: Url,
    html: String,
    extracted: Extracted,
    decode_path: DecodePath,
    strategy: &'static str,
}

/// The ingestion pipeline
pub struct Pipeline<C: CompletionModel, E: EmbeddingModel> {
    config: PipelineConfig,
    fetcher: Fetcher,
    summarizer: Summarizer<C>,
    knowledge: KnowledgeGateway<E>,
    run_state: Arc<dyn RunStateStore>,
}

impl<C: CompletionModel, E: EmbeddingModel> Pipeline<C, E> {
    /// Build a pipeline with the default fetch chain for `config`
    pub fn new(
        config: PipelineConfig,
        completion: Option<C>,
        knowledge: KnowledgeGateway<E>,
        run_state: Arc<dyn RunStateStore>,
    ) -> Result<Self, FetchError> {
        let fetcher = Fetcher::from_config(&config.fetch)?;
        Ok(Self::with_fetcher(config, fetcher, completion, knowledge, run_state))
    }

    /// Build a pipeline around an explicit fetch chain
    pub fn with_fetcher(
        config: PipelineConfig,
        fetcher: Fetcher,
        completion: Option<C>,
        knowledge: KnowledgeGateway<E>,
        run_state: Arc<dyn RunStateStore>,
    ) -> Self {
        let summarizer = Summarizer::new(completion, config.processor.clone());
        Self {
            config,
            fetcher,
            summarizer,
            knowledge,
            run_state,
        }
    }

    pub fn knowledge(&self) -> &KnowledgeGateway<E> {
        &self.knowledge
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Allocate a run token with progress at 0, first evicting runs idle
    /// for longer than the configured TTL
    pub async fn start_run(&self) -> RunHandle {
        progress::evict_idle(self.run_state.as_ref(), self.config.run_state_ttl).await;
        let handle = RunHandle::new(RunToken::generate(), self.run_state.clone());
        handle.set_progress(0).await;
        handle
    }

    /// Progress of a run; unknown tokens report 0
    pub async fn progress(&self, token: &RunToken) -> ProgressReport {
        progress::poll_progress(self.run_state.as_ref(), token).await
    }

    /// Ask a run to stop before its next page; idempotent
    pub async fn stop(&self, token: &RunToken) -> StopAck {
        progress::request_stop(self.run_state.as_ref(), token).await
    }

    /// Run a training request under a fresh run token
    pub async fn train(&self, request: &TrainRequest) -> Result<TrainResponse, IngestError> {
        let handle = self.start_run().await;
        self.train_with_run(request, &handle).await
    }

    /// Run a training request under an existing run handle
    #[instrument(skip(self, handle), fields(run = %handle.token()))]
    pub async fn train_with_run(
        &self,
        request: &TrainRequest,
        handle: &RunHandle,
    ) -> Result<TrainResponse, IngestError> {
        let url = Url::parse(request.url.trim()).map_err(|e| IngestError::InvalidUrl {
            url: request.url.clone(),
            reason: e.to_string(),
        })?;
        let options = self.run_options(request);

        let results = if request.single {
            let record = self.train_page(&url, &options).await?;
            handle.set_progress(100).await;
            vec![record]
        } else {
            let crawler_config = self.site_crawler_config(request)?;
            self.train_site(url, &crawler_config, &options, handle).await
        };

        Ok(TrainResponse {
            success: true,
            trained_pages: results.len(),
            results,
            run_token: handle.token().clone(),
        })
    }

    fn run_options(&self, request: &TrainRequest) -> RunOptions {
        RunOptions {
            category: non_empty(request.category.as_deref())
                .unwrap_or(&self.config.default_category)
                .to_string(),
            source: non_empty(request.source.as_deref())
                .unwrap_or(&self.config.default_source)
                .to_string(),
            detail_level: request
                .detail_level
                .unwrap_or(self.config.processor.default_detail_level),
        }
    }

    fn site_crawler_config(&self, request: &TrainRequest) -> Result<CrawlerConfig, IngestError> {
        let max_depth = request.max_depth.unwrap_or(self.config.crawler.max_depth);
        if !(1..=MAX_CRAWL_DEPTH).contains(&max_depth) {
            return Err(IngestError::InvalidRequest(format!(
                "maxDepth must be between 1 and {}, got {}",
                MAX_CRAWL_DEPTH, max_depth
            )));
        }
        let limit = default_max_pages(max_depth);
        let max_pages = request.max_pages.unwrap_or(limit);
        if max_pages == 0 {
            return Err(IngestError::InvalidRequest("maxPages must be positive".to_string()));
        }
        if max_pages > limit {
            warn!(requested = max_pages, limit, "Clamping maxPages to the depth limit");
        }
        let max_pages = max_pages.min(limit);
        Ok(CrawlerConfig {
            max_depth,
            max_pages,
            ..self.config.crawler.clone()
        })
    }

    /// Fetch, decode and extract one page
    async fn prepare(&self, url: &Url) -> Result<PreparedPage, IngestError> {
        let page = self.fetcher.fetch(url).await?;
        let normalized = encoding::normalize_with_hint(&page.body, page.declared_charset());
        let extracted = extractor::extract(&normalized.text, &page.url);
        Ok(PreparedPage {
            url: page.url,
            html: normalized.text,
            extracted,
            decode_path: normalized.path,
            strategy: page.strategy,
        })
    }

    /// Check length, summarize and upsert a prepared page
    async fn save(
        &self,
        page: &PreparedPage,
        requested_url: &Url,
        options: &RunOptions,
    ) -> Result<KnowledgeRecord, IngestError> {
        let extracted = &page.extracted;
        let chars = extracted.content.chars().count();
        if chars < self.config.min_content_chars {
            return Err(IngestError::ContentTooShort {
                url: requested_url.to_string(),
                chars,
                min: self.config.min_content_chars,
            });
        }

        let summary = self
            .summarizer
            .summarize(&extracted.content, options.detail_level)
            .await;

        let metadata = &extracted.metadata;
        let language = metadata
            .language_code()
            .unwrap_or_else(|| self.config.default_language.clone());

        let entry = NewKnowledge::new(
            extracted.title.clone(),
            summary.text,
            options.source.clone(),
            options.category.clone(),
            language,
        )
        .with_source_url(requested_url.as_str())
        .with_author(metadata.author.clone())
        .with_metadata("entry_type", "web")
        .with_metadata("final_url", page.url.as_str())
        .with_metadata("fetch_strategy", page.strategy)
        .with_metadata("encoding", page.decode_path.to_string())
        .with_metadata("extraction", extracted.method.to_string())
        .with_metadata("summary", summary.method.to_string())
        .with_metadata("detail_level", options.detail_level.get())
        .with_metadata("original_length", chars)
        .with_metadata("page", serde_json::to_value(metadata).unwrap_or(Value::Null));

        Ok(self.knowledge.upsert(entry).await?)
    }

    /// Train from a single page; every failure propagates
    #[instrument(skip(self, url, options), fields(url = %url))]
    async fn train_page(&self, url: &Url, options: &RunOptions) -> Result<KnowledgeRecord, IngestError> {
        let page = self.prepare(url).await?;
        let record = self.save(&page, url, options).await?;
        info!(id = record.id, title = %record.title, "Trained page");
        Ok(record)
    }

    async fn train_site(
        &self,
        seed: Url,
        crawler_config: &CrawlerConfig,
        options: &RunOptions,
        handle: &RunHandle,
    ) -> Vec<KnowledgeRecord> {
        let visitor = SiteVisitor {
            pipeline: self,
            options,
            max_depth: crawler_config.max_depth,
        };
        crawler::crawl(seed, crawler_config, &visitor, handle)
            .await
            .results
    }

    /// Store a manually written entry, keyed by its title
    #[instrument(skip(self, content, options))]
    pub async fn train_from_text(
        &self,
        title: &str,
        content: &str,
        options: &EntryOptions,
    ) -> Result<KnowledgeRecord, IngestError> {
        self.save_manual(title, content, "manual", "text", options).await
    }

    /// Store a question and its answer, keyed by the question
    #[instrument(skip(self, answer, options))]
    pub async fn train_qa(
        &self,
        question: &str,
        answer: &str,
        options: &EntryOptions,
    ) -> Result<KnowledgeRecord, IngestError> {
        self.save_manual(question, answer, "qa", "qa", options).await
    }

    async fn save_manual(
        &self,
        title: &str,
        content: &str,
        default_source: &str,
        entry_type: &str,
        options: &EntryOptions,
    ) -> Result<KnowledgeRecord, IngestError> {
        let (title, content) = (title.trim(), content.trim());
        if title.is_empty() || content.is_empty() {
            return Err(IngestError::InvalidRequest(format!(
                "{} entries need both a title and content",
                entry_type
            )));
        }

        let entry = NewKnowledge::new(
            title,
            content,
            non_empty(options.source.as_deref()).unwrap_or(default_source),
            non_empty(options.category.as_deref()).unwrap_or(&self.config.default_category),
            non_empty(options.language.as_deref()).unwrap_or(&self.config.default_language),
        )
        .with_author(options.author.clone())
        .with_metadata("entry_type", entry_type);

        Ok(self.knowledge.upsert(entry).await?)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Runs the single-page sequence for each crawl task
struct SiteVisitor<'a, C: CompletionModel, E: EmbeddingModel> {
    pipeline: &'a Pipeline<C, E>,
    options: &'a RunOptions,
    max_depth: u32,
}

#[async_trait]
impl<C: CompletionModel, E: EmbeddingModel> PageVisitor<KnowledgeRecord> for SiteVisitor<'_, C, E> {
    async fn visit(&self, task: &CrawlTask) -> crate::Result<Visit<KnowledgeRecord>> {
        let page = self.pipeline.prepare(&task.url).await?;

        let links = if task.depth < self.max_depth {
            extractor::extract_links(&page.html, &page.url)
        } else {
            Vec::new()
        };

        let output = match self.pipeline.save(&page, &task.url, self.options).await {
            Ok(record) => Some(record),
            Err(IngestError::ContentTooShort { url, chars, .. }) => {
                warn!(%url, chars, "Skipping page with too little content");
                None
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Visit {
            final_url: page.url,
            output,
            links,
        })
    }
}
