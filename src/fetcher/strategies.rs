//! Concrete fetch strategies, tried in order by [`Fetcher`](super::Fetcher)

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, CACHE_CONTROL, HeaderMap, HeaderValue, UPGRADE_INSECURE_REQUESTS};
use reqwest::{Client as ReqwestClient, Response, redirect};
use tracing::debug;
use url::Url;

use super::config::FetchConfig;
use super::error::FetchError;
use super::FetchedPage;

/// One way of retrieving the raw bytes behind a URL
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// Short name used in logs and diagnostics
    fn name(&self) -> &'static str;

    /// Fetch the URL, returning the body only for a usable response
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError>;
}

/// Turn a response into a page, rejecting non-2xx/3xx statuses and empty bodies
async fn read_response(strategy: &'static str, response: Response) -> Result<FetchedPage, FetchError> {
    let status = response.status();
    let final_url = response.url().clone();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if !(status.is_success() || status.is_redirection()) {
        return Err(FetchError::Status(status.as_u16()));
    }

    let body = response.bytes().await?.to_vec();
    if body.is_empty() {
        return Err(FetchError::EmptyBody);
    }

    Ok(FetchedPage {
        url: final_url,
        status: status.as_u16(),
        content_type,
        body,
        strategy,
    })
}

/// Full client with browser-like headers and relaxed certificate checks
pub struct BrowserFetcher {
    client: ReqwestClient,
}

impl BrowserFetcher {
    /// Build the client from configuration
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            ),
        );
        if let Ok(value) = HeaderValue::from_str(&config.accept_language) {
            headers.insert(ACCEPT_LANGUAGE, value);
        }
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

        let client = ReqwestClient::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .danger_accept_invalid_certs(true)
            .redirect(redirect::Policy::limited(config.max_redirects))
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl FetchStrategy for BrowserFetcher {
    fn name(&self) -> &'static str {
        "browser"
    }

    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let response = self.client.get(url.as_str()).send().await?;
        read_response(self.name(), response).await
    }
}

/// Bare client that only sends a user agent
///
/// Some servers reject the browser header set (or its compression
/// negotiation) but happily answer a plain request.
pub struct MinimalFetcher {
    client: ReqwestClient,
}

impl MinimalFetcher {
    /// Build the client from configuration
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = ReqwestClient::builder()
            .user_agent(&config.minimal_user_agent)
            .danger_accept_invalid_certs(true)
            .redirect(redirect::Policy::limited(config.max_redirects))
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl FetchStrategy for MinimalFetcher {
    fn name(&self) -> &'static str {
        "minimal"
    }

    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let response = self.client.get(url.as_str()).send().await?;
        read_response(self.name(), response).await
    }
}

/// Hosted reader service that fetches the page on our behalf
///
/// The service is addressed as `{endpoint}/{url}` and answers with the page
/// content; the returned page keeps the original URL so link resolution and
/// storage keys are unaffected.
pub struct ReaderFetcher {
    client: ReqwestClient,
    endpoint: String,
    api_key: Option<String>,
}

impl ReaderFetcher {
    /// Build the reader client, or `None` when no endpoint is configured
    pub fn from_config(config: &FetchConfig) -> Result<Option<Self>, FetchError> {
        let Some(endpoint) = config.reader_endpoint.as_deref() else {
            return Ok(None);
        };

        let client = ReqwestClient::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .build()?;

        Ok(Some(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: config.reader_api_key.clone(),
        }))
    }
}

#[async_trait]
impl FetchStrategy for ReaderFetcher {
    fn name(&self) -> &'static str {
        "reader"
    }

    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let fetch_url = format!("{}/{}", self.endpoint, url);
        debug!("Fetching through reader: {}", fetch_url);

        let mut request = self.client.get(&fetch_url);
        if let Some(key) = &self.api_key {
            request = request.header(AUTHORIZATION, format!("Bearer {key}"));
        }

        let response = request.send().await?;
        let mut page = read_response(self.name(), response).await?;
        page.url = url.clone();
        Ok(page)
    }
}
