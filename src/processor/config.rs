//! # Processor Configuration Module
//!
//! Settings for the detail-level summarizer: which completion model to ask,
//! how long to wait for it, and the detail level used when a request does not
//! name one.

use std::time::Duration;

use super::DetailLevel;
use crate::model::DEFAULT_COMPLETION_MODEL;

/// Configuration for the summarizer
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// LLM model to use for condensation
    pub llm_model: String,

    /// Upper bound on a single completion call
    pub summary_timeout: Duration,

    /// Detail level applied when a request leaves it unset
    pub default_detail_level: DetailLevel,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            llm_model: DEFAULT_COMPLETION_MODEL.to_string(),
            summary_timeout: Duration::from_secs(30),
            default_detail_level: DetailLevel::FULL,
        }
    }
}

/// Builder for ProcessorConfig
#[derive(Debug, Default)]
pub struct ProcessorConfigBuilder {
    config: ProcessorConfig,
}

impl ProcessorConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ProcessorConfig::default(),
        }
    }

    /// Set the LLM model
    pub fn llm_model(mut self, llm_model: impl Into<String>) -> Self {
        self.config.llm_model = llm_model.into();
        self
    }

    /// Set the completion timeout
    pub fn summary_timeout(mut self, summary_timeout: Duration) -> Self {
        self.config.summary_timeout = summary_timeout;
        self
    }

    /// Set the default detail level
    pub fn default_detail_level(mut self, level: DetailLevel) -> Self {
        self.config.default_detail_level = level;
        self
    }

    /// Build the configuration
    pub fn build(self) -> ProcessorConfig {
        self.config
    }
}

impl ProcessorConfig {
    /// Create a new builder
    pub fn builder() -> ProcessorConfigBuilder {
        ProcessorConfigBuilder::new()
    }
}
