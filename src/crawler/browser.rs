//! Browser-driven (dynamic) fetch strategy
//!
//! Listings that render products client-side, or that load more products as
//! the user scrolls, need a live browser session. `DynamicFetcher` adds the
//! crawl-level behaviour (bounded element waits, settle delay after scrolls)
//! on top of a minimal `BrowserSession` driver. A Chrome DevTools driver is
//! available with the `browser` feature.

use crate::crawler::fetcher::{Capability, FetchStrategy, RawListingDocument};
use crate::crawler::CrawlTarget;
use crate::CrawlError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use url::Url;

/// How often element presence is re-checked while waiting
const ELEMENT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Upper bound for any single driver call that has no timeout of its own
const DRIVER_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Low-level browser page operations
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigates the page and waits for the navigation to commit
    async fn goto(&mut self, url: &Url) -> Result<(), CrawlError>;

    /// Returns true if `selector` currently matches an element
    async fn has_element(&mut self, selector: &str) -> Result<bool, CrawlError>;

    /// Scrolls the viewport to the end of the document
    async fn scroll_to_end(&mut self) -> Result<(), CrawlError>;

    /// Returns the current document scroll height in pixels
    async fn document_height(&mut self) -> Result<u64, CrawlError>;

    /// Returns the current serialized DOM
    async fn content(&mut self) -> Result<String, CrawlError>;

    /// Returns the page's current URL
    async fn current_url(&mut self) -> Result<Url, CrawlError>;

    /// Closes the page and browser
    async fn close(&mut self) -> Result<(), CrawlError>;
}

/// Fetch strategy backed by a live browser session
pub struct DynamicFetcher<S: BrowserSession> {
    session: S,
    settle_delay: Duration,
    closed: bool,
}

impl<S: BrowserSession> DynamicFetcher<S> {
    /// Wraps a session
    ///
    /// # Arguments
    ///
    /// * `session` - The browser session, owned for one crawl session
    /// * `settle_delay` - Pause after each scroll before measuring the height
    pub fn new(session: S, settle_delay: Duration) -> Self {
        Self {
            session,
            settle_delay,
            closed: false,
        }
    }

    /// Returns the underlying session
    pub fn session(&self) -> &S {
        &self.session
    }

    /// Navigates to a URL; a driver failure here is a network failure
    async fn open(&mut self, url: &Url) -> Result<(), CrawlError> {
        tracing::debug!("Navigating to {}", url);
        bounded("navigation", self.session.goto(url))
            .await
            .map_err(|e| match e {
                CrawlError::Browser(message) => CrawlError::Network {
                    url: url.to_string(),
                    message,
                },
                other => other,
            })
    }
}

/// Runs a driver call under the global per-call bound
async fn bounded<T, F>(operation: &str, call: F) -> Result<T, CrawlError>
where
    F: std::future::Future<Output = Result<T, CrawlError>>,
{
    timeout(DRIVER_CALL_TIMEOUT, call)
        .await
        .map_err(|_| CrawlError::Browser(format!("{} timed out", operation)))?
}

#[async_trait]
impl<S: BrowserSession> FetchStrategy for DynamicFetcher<S> {
    fn supports(&self, _capability: Capability) -> bool {
        true
    }

    async fn fetch_once(&mut self, target: &CrawlTarget) -> Result<RawListingDocument, CrawlError> {
        self.navigate(target).await?;
        self.snapshot().await
    }

    async fn navigate(&mut self, target: &CrawlTarget) -> Result<(), CrawlError> {
        self.open(target.url()).await
    }

    async fn wait_for_element(&mut self, selector: &str, limit: Duration) -> Result<(), CrawlError> {
        let deadline = Instant::now() + limit;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let present = match timeout(remaining, self.session.has_element(selector)).await {
                Ok(result) => result?,
                Err(_) => false,
            };

            if present {
                return Ok(());
            }

            if Instant::now() >= deadline {
                return Err(CrawlError::ElementTimeout {
                    selector: selector.to_string(),
                    timeout: limit,
                });
            }

            sleep(ELEMENT_POLL_INTERVAL.min(deadline.saturating_duration_since(Instant::now())))
                .await;
        }
    }

    async fn scroll_to_bottom(&mut self) -> Result<u64, CrawlError> {
        bounded("scroll", self.session.scroll_to_end()).await?;

        if !self.settle_delay.is_zero() {
            sleep(self.settle_delay).await;
        }

        bounded("height measurement", self.session.document_height()).await
    }

    async fn snapshot(&mut self) -> Result<RawListingDocument, CrawlError> {
        let url = bounded("url read", self.session.current_url()).await?;
        let html = bounded("content read", self.session.content()).await?;

        if html.trim().is_empty() {
            return Err(CrawlError::Parse {
                url: url.to_string(),
                message: "empty document".to_string(),
            });
        }

        Ok(RawListingDocument { url, html })
    }

    async fn fetch_detail(
        &mut self,
        url: &Url,
        ready: Option<&str>,
        limit: Duration,
    ) -> Result<RawListingDocument, CrawlError> {
        self.open(url).await?;

        if let Some(selector) = ready {
            match self.wait_for_element(selector, limit).await {
                Ok(()) => {}
                Err(CrawlError::ElementTimeout { .. }) => {
                    tracing::debug!("'{}' never appeared on {}", selector, url);
                }
                Err(e) => return Err(e),
            }
        }

        self.snapshot().await
    }

    async fn shutdown(&mut self) -> Result<(), CrawlError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        bounded("close", self.session.close()).await
    }
}

#[cfg(feature = "browser")]
pub use chrome::ChromeSession;

#[cfg(feature = "browser")]
mod chrome {
    use super::BrowserSession;
    use crate::config::FetchConfig;
    use crate::CrawlError;
    use async_trait::async_trait;
    use chromiumoxide::{Browser, BrowserConfig, Page};
    use futures::StreamExt;
    use std::path::{Path, PathBuf};
    use tokio::task::JoinHandle;
    use url::Url;

    /// Common Chrome executable paths to check
    const CHROME_PATHS: &[&str] = &[
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ];

    const SCROLL_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight); true";
    const HEIGHT_SCRIPT: &str = "document.body.scrollHeight";

    /// Chrome DevTools Protocol session with a single page
    pub struct ChromeSession {
        browser: Browser,
        page: Page,
        handler: JoinHandle<()>,
    }

    fn browser_error(context: &str, error: impl std::fmt::Display) -> CrawlError {
        CrawlError::Browser(format!("{}: {}", context, error))
    }

    fn find_chrome(config: &FetchConfig) -> Result<PathBuf, CrawlError> {
        if let Some(path) = &config.chrome_path {
            return Ok(PathBuf::from(path));
        }

        CHROME_PATHS
            .iter()
            .map(Path::new)
            .find(|p| p.exists())
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                CrawlError::Browser(
                    "Chrome/Chromium not found; set fetch.chrome-path".to_string(),
                )
            })
    }

    impl ChromeSession {
        /// Launches a browser and opens a blank page
        pub async fn launch(config: &FetchConfig) -> Result<Self, CrawlError> {
            let chrome_path = find_chrome(config)?;
            tracing::info!(
                "Launching browser at {} (headless={})",
                chrome_path.display(),
                config.headless
            );

            let mut builder = BrowserConfig::builder()
                .chrome_executable(chrome_path)
                .arg("--disable-blink-features=AutomationControlled")
                .arg("--disable-dev-shm-usage")
                .arg("--no-first-run")
                .arg("--no-sandbox")
                .arg("--disable-gpu");

            if !config.headless {
                builder = builder.with_head();
            }

            let browser_config = builder
                .build()
                .map_err(|e| browser_error("invalid browser config", e))?;

            let (browser, mut handler) = Browser::launch(browser_config)
                .await
                .map_err(|e| browser_error("failed to launch browser", e))?;

            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| browser_error("failed to open page", e))?;

            Ok(Self {
                browser,
                page,
                handler,
            })
        }
    }

    #[async_trait]
    impl BrowserSession for ChromeSession {
        async fn goto(&mut self, url: &Url) -> Result<(), CrawlError> {
            self.page
                .goto(url.as_str())
                .await
                .map_err(|e| browser_error("navigation failed", e))?;
            Ok(())
        }

        async fn has_element(&mut self, selector: &str) -> Result<bool, CrawlError> {
            Ok(self.page.find_element(selector).await.is_ok())
        }

        async fn scroll_to_end(&mut self) -> Result<(), CrawlError> {
            self.page
                .evaluate(SCROLL_SCRIPT.to_string())
                .await
                .map_err(|e| browser_error("scroll failed", e))?;
            Ok(())
        }

        async fn document_height(&mut self) -> Result<u64, CrawlError> {
            let height: f64 = self
                .page
                .evaluate(HEIGHT_SCRIPT.to_string())
                .await
                .map_err(|e| browser_error("height read failed", e))?
                .into_value()
                .map_err(|e| browser_error("height is not a number", e))?;
            Ok(height.max(0.0) as u64)
        }

        async fn content(&mut self) -> Result<String, CrawlError> {
            self.page
                .content()
                .await
                .map_err(|e| browser_error("content read failed", e))
        }

        async fn current_url(&mut self) -> Result<Url, CrawlError> {
            let raw = self
                .page
                .url()
                .await
                .map_err(|e| browser_error("url read failed", e))?
                .unwrap_or_else(|| "about:blank".to_string());
            Url::parse(&raw).map_err(|e| browser_error("invalid page url", e))
        }

        async fn close(&mut self) -> Result<(), CrawlError> {
            let result = self
                .browser
                .close()
                .await
                .map(|_| ())
                .map_err(|e| browser_error("close failed", e));
            self.handler.abort();
            result
        }
    }
}
