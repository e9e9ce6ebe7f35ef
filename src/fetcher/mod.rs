//! # Content Fetcher Module
//!
//! Retrieves the raw bytes of a web page through an ordered chain of
//! interchangeable strategies. The first strategy returning a non-empty body
//! with a 2xx/3xx status wins; failures are logged and the next strategy is
//! tried. Only when every strategy has failed does the chain report
//! [`FetchError::Exhausted`].
//!
//! ## Strategies
//!
//! - `BrowserFetcher`: browser-like headers, relaxed TLS, bounded redirects
//! - `MinimalFetcher`: user agent only
//! - `ReaderFetcher`: optional hosted reader service

mod config;
mod error;
mod strategies;

pub use config::{FetchConfig, FetchConfigBuilder};
pub use error::FetchError;
pub use strategies::{BrowserFetcher, FetchStrategy, MinimalFetcher, ReaderFetcher};

use tracing::{info, instrument, warn};
use url::Url;

/// Raw result of a successful fetch
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: Url,

    /// HTTP status of the final response
    pub status: u16,

    /// Declared content type, if any
    pub content_type: Option<String>,

    /// Undecoded response body
    pub body: Vec<u8>,

    /// Name of the strategy that produced this page
    pub strategy: &'static str,
}

impl FetchedPage {
    /// Charset parameter of the declared content type
    pub fn declared_charset(&self) -> Option<&str> {
        let content_type = self.content_type.as_deref()?;
        content_type.split(';').skip(1).find_map(|param| {
            let (key, value) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches('"'))
        })
    }
}

/// Ordered chain of fetch strategies
pub struct Fetcher {
    strategies: Vec<Box<dyn FetchStrategy>>,
}

impl Fetcher {
    /// Build the default chain: browser, minimal, then the reader if configured
    pub fn from_config(config: &FetchConfig) -> Result<Self, FetchError> {
        let mut strategies: Vec<Box<dyn FetchStrategy>> = vec![
            Box::new(BrowserFetcher::new(config)?),
            Box::new(MinimalFetcher::new(config)?),
        ];
        if let Some(reader) = ReaderFetcher::from_config(config)? {
            strategies.push(Box::new(reader));
        }
        Ok(Self { strategies })
    }

    /// Build a chain from explicit strategies, tried in the given order
    pub fn with_strategies(strategies: Vec<Box<dyn FetchStrategy>>) -> Self {
        Self { strategies }
    }

    /// Names of the strategies in try order
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Fetch a URL, trying each strategy until one succeeds
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }

        let mut attempts = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            match strategy.fetch(url).await {
                Ok(page) => {
                    info!(
                        strategy = strategy.name(),
                        status = page.status,
                        content_type = page.content_type.as_deref().unwrap_or("-"),
                        length = page.body.len(),
                        "Fetched {}",
                        url
                    );
                    return Ok(page);
                }
                Err(e) => {
                    warn!(strategy = strategy.name(), "Fetch attempt failed for {}: {}", url, e);
                    attempts.push(format!("{}: {}", strategy.name(), e));
                }
            }
        }

        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockito::{Matcher, Server};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticStrategy {
        name: &'static str,
        body: Option<&'static str>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl FetchStrategy for StaticStrategy {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.body {
                Some(body) => Ok(FetchedPage {
                    url: url.clone(),
                    status: 200,
                    content_type: Some("text/html".to_string()),
                    body: body.as_bytes().to_vec(),
                    strategy: self.name,
                }),
                None => Err(FetchError::Status(503)),
            }
        }
    }

    fn strategy(
        name: &'static str,
        body: Option<&'static str>,
        calls: &Arc<AtomicUsize>,
    ) -> Box<dyn FetchStrategy> {
        Box::new(StaticStrategy {
            name,
            body,
            calls: calls.clone(),
        })
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let third = Arc::new(AtomicUsize::new(0));
        let fetcher = Fetcher::with_strategies(vec![
            strategy("first", None, &first),
            strategy("second", Some("<p>ok</p>"), &second),
            strategy("third", Some("<p>never</p>"), &third),
        ]);

        let url = Url::parse("https://example.com/").unwrap();
        let page = fetcher.fetch(&url).await.unwrap();

        assert_eq!(page.strategy, "second");
        assert_eq!(page.body, b"<p>ok</p>");
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(third.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_exhausted_lists_every_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = Fetcher::with_strategies(vec![
            strategy("a", None, &calls),
            strategy("b", None, &calls),
        ]);

        let url = Url::parse("https://example.com/missing").unwrap();
        match fetcher.fetch(&url).await {
            Err(FetchError::Exhausted { url, attempts }) => {
                assert_eq!(url, "https://example.com/missing");
                assert_eq!(attempts.len(), 2);
                assert!(attempts[0].starts_with("a:"));
                assert!(attempts[1].starts_with("b:"));
            }
            other => panic!("Expected Exhausted, got {:?}", other.map(|p| p.strategy)),
        }
    }

    #[tokio::test]
    async fn test_rejects_non_http_scheme() {
        let fetcher = Fetcher::with_strategies(vec![]);
        let url = Url::parse("ftp://example.com/file").unwrap();
        assert!(matches!(
            fetcher.fetch(&url).await,
            Err(FetchError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_minimal_strategy_recovers_from_browser_rejection() {
        let mut server = Server::new_async().await;
        let blocked = server
            .mock("GET", "/page")
            .match_header("upgrade-insecure-requests", "1")
            .with_status(403)
            .with_body("forbidden")
            .expect(1)
            .create_async()
            .await;
        let allowed = server
            .mock("GET", "/page")
            .match_header("upgrade-insecure-requests", Matcher::Missing)
            .with_status(200)
            .with_header("content-type", "text/html; charset=windows-1254")
            .with_body("<html><body>merhaba</body></html>")
            .expect(1)
            .create_async()
            .await;

        let fetcher = Fetcher::from_config(&FetchConfig::default()).unwrap();
        let url = Url::parse(&format!("{}/page", server.url())).unwrap();
        let page = fetcher.fetch(&url).await.unwrap();

        assert_eq!(page.strategy, "minimal");
        assert_eq!(page.status, 200);
        assert_eq!(page.declared_charset(), Some("windows-1254"));
        blocked.assert_async().await;
        allowed.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_body_is_a_failure() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/empty")
            .with_status(200)
            .with_body("")
            .create_async()
            .await;

        let fetcher = Fetcher::from_config(&FetchConfig::default()).unwrap();
        let url = Url::parse(&format!("{}/empty", server.url())).unwrap();
        assert!(matches!(
            fetcher.fetch(&url).await,
            Err(FetchError::Exhausted { .. })
        ));
    }

    #[test]
    fn test_default_chain_order() {
        let config = FetchConfig::builder()
            .reader(Some("https://reader.example".to_string()), None)
            .build();
        let fetcher = Fetcher::from_config(&config).unwrap();
        assert_eq!(fetcher.strategy_names(), vec!["browser", "minimal", "reader"]);

        let fetcher = Fetcher::from_config(&FetchConfig::default()).unwrap();
        assert_eq!(fetcher.strategy_names(), vec!["browser", "minimal"]);
    }
}
