//! Request and response types of the training entry points

use serde::{Deserialize, Serialize};

use crate::knowledge::KnowledgeRecord;
use crate::processor::DetailLevel;
use crate::progress::RunToken;

/// Deepest crawl a request may ask for
pub const MAX_CRAWL_DEPTH: u32 = 5;

/// Page limit for crawls at the maximum depth
pub const DEEP_CRAWL_MAX_PAGES: usize = 2000;

/// Page limit for shallower crawls
pub const DEFAULT_MAX_PAGES: usize = 1000;

fn default_single() -> bool {
    true
}

/// Train from one URL, or from a whole site when `single` is false
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainRequest {
    pub url: String,

    #[serde(default = "default_single")]
    pub single: bool,

    /// Link depth for site mode, 1 to 5
    #[serde(default)]
    pub max_depth: Option<u32>,

    /// Record limit for site mode; derived from the depth when unset
    #[serde(default)]
    pub max_pages: Option<usize>,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub source: Option<String>,

    /// Summarization level; the configured default when unset
    #[serde(default)]
    pub detail_level: Option<DetailLevel>,
}

impl TrainRequest {
    /// A single-page request
    pub fn single(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            single: true,
            max_depth: None,
            max_pages: None,
            category: None,
            source: None,
            detail_level: None,
        }
    }

    /// A site-crawl request
    pub fn site(url: impl Into<String>, max_depth: u32) -> Self {
        Self {
            single: false,
            max_depth: Some(max_depth),
            ..Self::single(url)
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_detail_level(mut self, level: DetailLevel) -> Self {
        self.detail_level = Some(level);
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }
}

/// Page limit applied when a site request sets none
pub fn default_max_pages(max_depth: u32) -> usize {
    if max_depth == MAX_CRAWL_DEPTH {
        DEEP_CRAWL_MAX_PAGES
    } else {
        DEFAULT_MAX_PAGES
    }
}

/// Result of a training run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainResponse {
    pub success: bool,
    pub trained_pages: usize,
    pub results: Vec<KnowledgeRecord>,
    pub run_token: RunToken,
}

/// Labels for entries typed in by hand
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryOptions {
    pub category: Option<String>,
    pub source: Option<String>,
    pub author: Option<String>,
    pub language: Option<String>,
}
