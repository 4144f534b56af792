//! Fetch strategies
//!
//! This module defines the polymorphic fetch interface the orchestrator drives
//! and its static (plain HTTP) implementation:
//! - Building HTTP clients with the configured user agent and timeout
//! - GET requests for listing pages
//! - Classifying failures into network and parse errors

use crate::config::FetchConfig;
use crate::crawler::CrawlTarget;
use crate::{ConfigError, CrawlError};
use async_trait::async_trait;
use reqwest::{header, Client};
use std::fmt;
use std::time::Duration;
use url::Url;

/// A fetched listing snapshot, consumed by the extractor and then dropped
#[derive(Debug, Clone)]
pub struct RawListingDocument {
    /// URL the document was read from (after redirects)
    pub url: Url,

    /// Markup
    pub html: String,
}

/// What a fetch strategy can do beyond a single fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// One request, one document
    FetchOnce,
    /// Block until an element appears, with a timeout
    FetchWithWait,
    /// Scroll to trigger lazy loading and measure the document
    FetchWithScroll,
    /// Read a product's own page by URL
    FetchDetail,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchOnce => write!(f, "fetch-once"),
            Self::FetchWithWait => write!(f, "fetch-with-wait"),
            Self::FetchWithScroll => write!(f, "fetch-with-scroll"),
            Self::FetchDetail => write!(f, "fetch-detail"),
        }
    }
}

/// A way of turning a `CrawlTarget` into listing documents
///
/// Fetchers hold no session data. A dynamic fetcher owns its live browser
/// session for the lifetime of one crawl session; only one operation is ever
/// in flight because every method takes `&mut self`.
#[async_trait]
pub trait FetchStrategy: Send {
    /// Returns true if the strategy offers a capability
    fn supports(&self, capability: Capability) -> bool;

    /// Fetches a target as a single document
    async fn fetch_once(&mut self, target: &CrawlTarget) -> Result<RawListingDocument, CrawlError>;

    /// Loads a target into the live session without reading it
    async fn navigate(&mut self, _target: &CrawlTarget) -> Result<(), CrawlError> {
        Err(CrawlError::Unsupported("navigate"))
    }

    /// Waits until `selector` matches in the live session
    async fn wait_for_element(
        &mut self,
        _selector: &str,
        _timeout: Duration,
    ) -> Result<(), CrawlError> {
        Err(CrawlError::Unsupported("wait_for_element"))
    }

    /// Scrolls to the bottom and returns the new document height
    async fn scroll_to_bottom(&mut self) -> Result<u64, CrawlError> {
        Err(CrawlError::Unsupported("scroll_to_bottom"))
    }

    /// Reads the live session's current document
    async fn snapshot(&mut self) -> Result<RawListingDocument, CrawlError> {
        Err(CrawlError::Unsupported("snapshot"))
    }

    /// Fetches a product detail page
    ///
    /// `ready` is waited for (up to `limit`) by fetchers that can wait; a
    /// page where it never appears is still returned.
    async fn fetch_detail(
        &mut self,
        _url: &Url,
        _ready: Option<&str>,
        _limit: Duration,
    ) -> Result<RawListingDocument, CrawlError> {
        Err(CrawlError::Unsupported("fetch_detail"))
    }

    /// Releases any held session
    async fn shutdown(&mut self) -> Result<(), CrawlError> {
        Ok(())
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The fetch configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Plain HTTP fetch: one GET per target
#[derive(Debug, Clone)]
pub struct StaticFetcher {
    client: Client,
}

impl StaticFetcher {
    /// Creates a fetcher around an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Creates a fetcher from fetch configuration
    pub fn from_config(config: &FetchConfig) -> Result<Self, CrawlError> {
        let client = build_http_client(config)
            .map_err(|e| CrawlError::Config(ConfigError::HttpClient(e.to_string())))?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl FetchStrategy for StaticFetcher {
    fn supports(&self, capability: Capability) -> bool {
        matches!(capability, Capability::FetchOnce | Capability::FetchDetail)
    }

    async fn fetch_once(&mut self, target: &CrawlTarget) -> Result<RawListingDocument, CrawlError> {
        fetch_document(&self.client, target.url()).await
    }

    async fn fetch_detail(
        &mut self,
        url: &Url,
        _ready: Option<&str>,
        _limit: Duration,
    ) -> Result<RawListingDocument, CrawlError> {
        fetch_document(&self.client, url).await
    }
}

/// Fetches one listing document over HTTP
///
/// # Error Classification
///
/// | Condition | Error |
/// |-----------|-------|
/// | Transport failure or timeout | `Network` |
/// | Non-2xx status | `Network` |
/// | Declared non-HTML content type | `Parse` |
/// | Empty body | `Parse` |
pub async fn fetch_document(client: &Client, url: &Url) -> Result<RawListingDocument, CrawlError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| network_error(url, &e))?;

    let status = response.status();
    let final_url = response.url().clone();

    if !status.is_success() {
        return Err(CrawlError::Network {
            url: url.to_string(),
            message: format!("HTTP {}", status.as_u16()),
        });
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase());

    if let Some(content_type) = &content_type {
        if !content_type.contains("html") {
            return Err(CrawlError::Parse {
                url: url.to_string(),
                message: format!("expected HTML, got {}", content_type),
            });
        }
    }

    let html = response.text().await.map_err(|e| network_error(url, &e))?;

    if html.trim().is_empty() {
        return Err(CrawlError::Parse {
            url: url.to_string(),
            message: "empty document".to_string(),
        });
    }

    Ok(RawListingDocument {
        url: final_url,
        html,
    })
}

fn network_error(url: &Url, error: &reqwest::Error) -> CrawlError {
    let message = if error.is_timeout() {
        "request timeout".to_string()
    } else if error.is_connect() {
        "connection refused".to_string()
    } else {
        error.to_string()
    };

    CrawlError::Network {
        url: url.to_string(),
        message,
    }
}
