//! # Pipeline Configuration Module
//!
//! Bundles the per-stage configurations with the ingestion-wide settings:
//! the minimum content length and the labels used when a request omits them.

use std::time::Duration;

use crate::crawler::CrawlerConfig;
use crate::fetcher::FetchConfig;
use crate::processor::ProcessorConfig;

/// Configuration for the ingestion pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Fetch chain settings
    pub fetch: FetchConfig,

    /// Site crawl settings; depth and page limits may be overridden per request
    pub crawler: CrawlerConfig,

    /// Summarizer settings
    pub processor: ProcessorConfig,

    /// Extracted text shorter than this (in characters) is rejected
    pub min_content_chars: usize,

    /// Language code used when a page declares none
    pub default_language: String,

    /// Source label for fetched pages
    pub default_source: String,

    /// Category for records when the request has none
    pub default_category: String,

    /// How long a run's progress stays pollable after its last update
    pub run_state_ttl: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            crawler: CrawlerConfig::default(),
            processor: ProcessorConfig::default(),
            min_content_chars: 100,
            default_language: "tr".to_string(),
            default_source: "website".to_string(),
            default_category: "general".to_string(),
            run_state_ttl: Duration::from_secs(60 * 60),
        }
    }
}

/// Builder for PipelineConfig
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    pub fn fetch(mut self, fetch: FetchConfig) -> Self {
        self.config.fetch = fetch;
        self
    }

    pub fn crawler(mut self, crawler: CrawlerConfig) -> Self {
        self.config.crawler = crawler;
        self
    }

    pub fn processor(mut self, processor: ProcessorConfig) -> Self {
        self.config.processor = processor;
        self
    }

    pub fn min_content_chars(mut self, min_content_chars: usize) -> Self {
        self.config.min_content_chars = min_content_chars;
        self
    }

    pub fn default_language(mut self, language: impl Into<String>) -> Self {
        self.config.default_language = language.into();
        self
    }

    pub fn default_source(mut self, source: impl Into<String>) -> Self {
        self.config.default_source = source.into();
        self
    }

    pub fn default_category(mut self, category: impl Into<String>) -> Self {
        self.config.default_category = category.into();
        self
    }

    pub fn run_state_ttl(mut self, ttl: Duration) -> Self {
        self.config.run_state_ttl = ttl;
        self
    }

    /// Build the configuration
    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

impl PipelineConfig {
    /// Create a new builder
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }
}
