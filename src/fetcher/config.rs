//! # Fetcher Configuration Module
//!
//! Configuration for the fetch chain: headers, timeouts, redirect bounds and the
//! optional hosted reader endpoint. Defaults mimic a desktop browser because
//! many target sites refuse obvious bots.

use std::time::Duration;

/// Browser-like user agent used by the primary strategy
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Configuration for the fetch chain
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent for the browser-like strategy
    pub user_agent: String,

    /// User agent for the minimal strategy
    pub minimal_user_agent: String,

    /// Total request timeout
    pub timeout: Duration,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Maximum redirects to follow
    pub max_redirects: usize,

    /// Accept-Language header sent by the browser-like strategy
    pub accept_language: String,

    /// Base URL of a hosted reader service, tried last when set
    pub reader_endpoint: Option<String>,

    /// Bearer token for the reader service
    pub reader_api_key: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: BROWSER_USER_AGENT.to_string(),
            minimal_user_agent: format!("scribe/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_redirects: 5,
            accept_language: "tr-TR,tr;q=0.9,en-US;q=0.8,en;q=0.7".to_string(),
            reader_endpoint: None,
            reader_api_key: None,
        }
    }
}

/// Builder for FetchConfig
#[derive(Debug, Default)]
pub struct FetchConfigBuilder {
    config: FetchConfig,
}

impl FetchConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: FetchConfig::default(),
        }
    }

    /// Set the browser-like user agent
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the total request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connection timeout
    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.config.connect_timeout = connect_timeout;
        self
    }

    /// Set the maximum number of redirects
    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.config.max_redirects = max_redirects;
        self
    }

    /// Set the Accept-Language header
    pub fn accept_language(mut self, accept_language: impl Into<String>) -> Self {
        self.config.accept_language = accept_language.into();
        self
    }

    /// Enable the hosted reader strategy
    pub fn reader(mut self, endpoint: Option<String>, api_key: Option<String>) -> Self {
        self.config.reader_endpoint = endpoint.filter(|e| !e.trim().is_empty());
        self.config.reader_api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    /// Build the configuration
    pub fn build(self) -> FetchConfig {
        self.config
    }
}

impl FetchConfig {
    /// Create a new builder
    pub fn builder() -> FetchConfigBuilder {
        FetchConfigBuilder::new()
    }
}
