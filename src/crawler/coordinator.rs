//! Crawl coordinator - drives one query to a terminated session
//!
//! This module contains the crawl loop for both listing modes:
//! - Paginated: fetch page after page until the detector says `NoMore`
//! - Scroll: load once, scroll until the height settles or time runs out,
//!   then extract the final document
//!
//! Per-step failures are counted and skipped; only invalid input and
//! unsupported mode/fetcher combinations abort a session, and they do so
//! before the first fetch.

use crate::config::{validate_detail_pages, Config, FetchEngine, PaginationConfig, ScrollConfig};
use crate::crawler::category::{resolve_category, CategoryPath};
use crate::crawler::parser::{
    extract_candidates, extract_detail_breadcrumbs, validate_candidate, ListingSelectors,
    ValidationContext,
};
use crate::crawler::{
    Capability, CrawlTarget, FetchStrategy, RawListingDocument, ScrollCursor, StaticFetcher,
    TargetBuilder, TargetPosition,
};
use crate::session::{AppendOutcome, CrawlSession, ProductRecord, SessionBuilder};
use crate::state::{PaginationDetector, PaginationState, ScrollDetector, ScrollState, TerminationReason};
use crate::{ConfigError, CrawlError};
use chrono::Utc;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Pause after a failed scroll so a broken session is not hammered
const FAILED_SCROLL_PAUSE: Duration = Duration::from_millis(500);

/// How a listing is walked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlMode {
    /// Explicit page indices `1..=max_pages`
    Paginated { max_pages: u32 },

    /// One infinite listing loaded by scrolling
    Scroll {
        stability_threshold: u32,
        time_ceiling: Duration,
    },
}

impl CrawlMode {
    pub fn paginated(config: &PaginationConfig) -> Self {
        Self::Paginated {
            max_pages: config.max_pages,
        }
    }

    pub fn scroll(config: &ScrollConfig) -> Self {
        Self::Scroll {
            stability_threshold: config.stability_threshold,
            time_ceiling: Duration::from_secs(config.time_ceiling_secs),
        }
    }

    /// Short name used in logs and persisted runs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Paginated { .. } => "paginated",
            Self::Scroll { .. } => "scroll",
        }
    }
}

impl fmt::Display for CrawlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paginated { max_pages } => write!(f, "paginated (max {} pages)", max_pages),
            Self::Scroll {
                stability_threshold,
                time_ceiling,
            } => write!(
                f,
                "scroll (stable after {} repeat(s), ceiling {:?})",
                stability_threshold, time_ceiling
            ),
        }
    }
}

/// Per-session crawl options
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub mode: CrawlMode,

    /// Category triple applied to every record instead of breadcrumbs
    pub category_override: Option<CategoryPath>,

    /// Element that marks a loaded listing (wait-capable fetchers only)
    pub ready_selector: Option<String>,

    /// Upper bound for each element wait
    pub element_timeout: Duration,

    /// Open each new product's page to read its breadcrumbs
    pub detail_pages: bool,
}

impl CrawlOptions {
    /// Builds options from configuration for a given mode
    ///
    /// The ready selector falls back to the first card selector.
    pub fn from_config(config: &Config, mode: CrawlMode) -> Self {
        let ready_selector = config
            .selectors
            .ready
            .clone()
            .or_else(|| config.selectors.card.first().cloned());

        Self {
            mode,
            category_override: None,
            ready_selector,
            element_timeout: Duration::from_secs(config.fetch.element_timeout_secs),
            detail_pages: config.crawler.detail_pages,
        }
    }

    pub fn with_category_override(mut self, category: Option<CategoryPath>) -> Self {
        self.category_override = category.filter(|c| !c.is_empty());
        self
    }
}

/// Runs one query against one fetch strategy
///
/// A coordinator owns its fetcher for the lifetime of one session and is
/// consumed by [`Coordinator::run`], so a dynamic fetcher's browser session
/// is never shared between queries.
pub struct Coordinator<F: FetchStrategy> {
    targets: TargetBuilder,
    selectors: ListingSelectors,
    origin: Url,
    fetcher: F,
    options: CrawlOptions,
    /// Element waited for on detail pages
    detail_ready: Option<String>,
    cancel: CancellationToken,
}

impl<F: FetchStrategy> Coordinator<F> {
    /// Creates a coordinator
    ///
    /// # Arguments
    ///
    /// * `config` - Site and selector configuration
    /// * `fetcher` - Fetch strategy owned by this session
    /// * `options` - Mode and per-session options
    /// * `cancel` - Checked at the top of every loop iteration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(CrawlError::Config)` - Selectors or origin are invalid, or detail
    ///   pages are enabled without a detail breadcrumb selector
    pub fn new(
        config: &Config,
        fetcher: F,
        options: CrawlOptions,
        cancel: CancellationToken,
    ) -> Result<Self, CrawlError> {
        let selectors = ListingSelectors::from_config(&config.selectors)?;
        let origin = Url::parse(&config.site.origin)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", config.site.origin, e)))?;

        let detail_ready = if options.detail_pages {
            validate_detail_pages(true, &config.selectors)?;
            config.selectors.detail_breadcrumb.first().cloned()
        } else {
            None
        };

        Ok(Self {
            targets: TargetBuilder::from_site(&config.site),
            selectors,
            origin,
            fetcher,
            options,
            detail_ready,
            cancel,
        })
    }

    /// Crawls one query to completion
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSession)` - A terminated, possibly partial session
    /// * `Err(CrawlError::InvalidQuery)` - Blank query; nothing was fetched
    /// * `Err(CrawlError::Unsupported)` - Scroll mode with a fetcher that cannot
    ///   scroll, or detail pages with a fetcher that cannot open them
    pub async fn run(mut self, query: &str) -> Result<CrawlSession, CrawlError> {
        let result = match self.options.mode {
            _ if self.options.detail_pages && !self.fetcher.supports(Capability::FetchDetail) => {
                Err(CrawlError::Unsupported("detail pages with a fetcher that cannot open them"))
            }
            CrawlMode::Paginated { max_pages } => self.run_paginated(query, max_pages).await,
            CrawlMode::Scroll {
                stability_threshold,
                time_ceiling,
            } => {
                self.run_scroll(query, stability_threshold, time_ceiling)
                    .await
            }
        };

        if let Err(e) = self.fetcher.shutdown().await {
            tracing::warn!("Failed to shut down fetcher: {}", e);
        }

        let session = result?;
        tracing::info!(
            "Session '{}' finished: {} records, {} steps, {} failed extractions, {} failed fetches ({})",
            session.query(),
            session.records().len(),
            session.pages_or_scrolls_visited(),
            session.failed_extractions(),
            session.failed_fetches(),
            session.termination_reason()
        );
        Ok(session)
    }

    async fn run_paginated(
        &mut self,
        query: &str,
        max_pages: u32,
    ) -> Result<CrawlSession, CrawlError> {
        let mut target = self.targets.build(query, TargetPosition::Page(1))?;

        let max_pages = if self.targets.supports_pages() {
            max_pages
        } else {
            tracing::warn!("No page URL template configured; only page 1 will be visited");
            1
        };

        let mut detector = PaginationDetector::new(max_pages);
        let mut session = SessionBuilder::new(target.query());

        tracing::info!(
            "Crawling '{}' in paginated mode (max {} pages)",
            target.query(),
            detector.max_pages()
        );

        let reason = loop {
            if self.cancel.is_cancelled() {
                tracing::info!("Crawl of '{}' cancelled", target.query());
                break TerminationReason::Cancelled;
            }

            let page = target.page_index().unwrap_or(1);
            tracing::debug!("Fetching {} ({})", target.url(), target.position());
            session.record_visit();

            let state = match self.fetch_page(&target).await {
                Ok(document) => {
                    let count = self.absorb(&document, &mut session).await?;
                    tracing::debug!("Page {} yielded {} candidates", page, count);
                    detector.observe_page(page, count)
                }
                Err(e) if e.is_parse() => {
                    tracing::warn!("Page {} unreadable, treating as empty: {}", page, e);
                    detector.observe_page(page, 0)
                }
                Err(e) if e.is_recoverable() => {
                    tracing::warn!("Page {} skipped: {}", page, e);
                    session.record_failed_fetch();
                    detector.observe_failed_page(page)
                }
                Err(e) => return Err(e),
            };

            if let PaginationState::NoMore(reason) = state {
                break reason;
            }

            target = self.targets.build(query, TargetPosition::Page(page + 1))?;
        };

        Ok(session.finish(reason))
    }

    /// Fetches one page, waiting for the listing when the fetcher can
    async fn fetch_page(&mut self, target: &CrawlTarget) -> Result<RawListingDocument, CrawlError> {
        let ready_selector = self.options.ready_selector.clone();
        match ready_selector.as_deref() {
            Some(ready) if self.fetcher.supports(Capability::FetchWithWait) => {
                self.fetcher.navigate(target).await?;
                self.wait_for_listing(ready).await?;
                self.fetcher.snapshot().await
            }
            _ => self.fetcher.fetch_once(target).await,
        }
    }

    async fn run_scroll(
        &mut self,
        query: &str,
        stability_threshold: u32,
        time_ceiling: Duration,
    ) -> Result<CrawlSession, CrawlError> {
        let target = self
            .targets
            .build(query, TargetPosition::Scroll(ScrollCursor::origin()))?;

        if !self.fetcher.supports(Capability::FetchWithScroll) {
            return Err(CrawlError::Unsupported("scroll mode with a non-scrolling fetcher"));
        }

        let mut session = SessionBuilder::new(target.query());
        let mut detector = ScrollDetector::new(stability_threshold, time_ceiling);

        tracing::info!(
            "Crawling '{}' in scroll mode (threshold {}, ceiling {:?})",
            target.query(),
            stability_threshold,
            time_ceiling
        );

        if let Err(e) = self.load_listing(&target).await {
            if !e.is_recoverable() {
                return Err(e);
            }
            tracing::warn!("Initial load of {} failed: {}", target.url(), e);
            session.record_failed_fetch();
        }

        let reason = loop {
            if self.cancel.is_cancelled() {
                tracing::info!("Crawl of '{}' cancelled", target.query());
                break TerminationReason::Cancelled;
            }

            if detector.check_deadline() == ScrollState::TimedOut {
                break TerminationReason::TimedOut;
            }

            session.record_visit();
            match self.fetcher.scroll_to_bottom().await {
                Ok(height) => {
                    let cursor = ScrollCursor::at_height(height);
                    tracing::debug!(
                        "Scroll {} measured {}px",
                        session.pages_or_scrolls_visited(),
                        cursor.height()
                    );
                    match detector.observe(cursor.height()) {
                        ScrollState::Loading => {}
                        ScrollState::Stable => break TerminationReason::HeightStable,
                        ScrollState::TimedOut => break TerminationReason::TimedOut,
                    }
                }
                Err(e) if e.is_recoverable() => {
                    tracing::warn!("Scroll {} failed: {}", session.pages_or_scrolls_visited(), e);
                    session.record_failed_fetch();
                    tokio::time::sleep(FAILED_SCROLL_PAUSE).await;
                }
                Err(e) => return Err(e),
            }
        };

        match self.fetcher.snapshot().await {
            Ok(document) => {
                let count = self.absorb(&document, &mut session).await?;
                tracing::debug!("Scrolled listing yielded {} candidates", count);
            }
            Err(e) if e.is_parse() => {
                tracing::warn!("Scrolled listing unreadable: {}", e);
            }
            Err(e) if e.is_recoverable() => {
                tracing::warn!("Failed to read scrolled listing: {}", e);
                session.record_failed_fetch();
            }
            Err(e) => return Err(e),
        }

        Ok(session.finish(reason))
    }

    async fn load_listing(&mut self, target: &CrawlTarget) -> Result<(), CrawlError> {
        self.fetcher.navigate(target).await?;
        let ready_selector = self.options.ready_selector.clone();
        if let Some(ready) = ready_selector.as_deref() {
            if self.fetcher.supports(Capability::FetchWithWait) {
                self.wait_for_listing(ready).await?;
            }
        }
        Ok(())
    }

    /// Waits for the ready element on a page that has already loaded
    ///
    /// A listing with no results never shows a card, so a timeout here is
    /// not a failure: the page is read as is and the extractor decides.
    async fn wait_for_listing(&mut self, ready: &str) -> Result<(), CrawlError> {
        match self
            .fetcher
            .wait_for_element(ready, self.options.element_timeout)
            .await
        {
            Err(CrawlError::ElementTimeout { selector, timeout }) => {
                tracing::debug!(
                    "'{}' not found within {:?}; reading page as is",
                    selector,
                    timeout
                );
                Ok(())
            }
            other => other,
        }
    }

    /// Extracts, validates and appends one document's products
    ///
    /// Returns the number of candidates found, valid or not.
    async fn absorb(
        &mut self,
        document: &RawListingDocument,
        session: &mut SessionBuilder,
    ) -> Result<usize, CrawlError> {
        let (count, mut records) = self.extract_records(document, session);
        self.enrich_categories(&mut records, session).await?;

        for record in records {
            let link = record.link.clone();
            if session.push(record) == AppendOutcome::Duplicate {
                tracing::debug!("Dropped duplicate {}", link);
            }
        }

        Ok(count)
    }

    fn extract_records(
        &self,
        document: &RawListingDocument,
        session: &mut SessionBuilder,
    ) -> (usize, Vec<ProductRecord>) {
        let candidates = extract_candidates(&document.html, &self.selectors);
        let count = candidates.len();

        let context = ValidationContext {
            origin: &self.origin,
            category_override: self.options.category_override.as_ref(),
            captured_at: Utc::now(),
        };

        let mut records = Vec::with_capacity(count);
        for candidate in candidates {
            match validate_candidate(candidate, &context) {
                Some(record) => records.push(record),
                None => session.record_failed_extraction(),
            }
        }

        (count, records)
    }

    /// Replaces listing categories with the breadcrumbs of each product page
    ///
    /// Only links not yet in the session are opened. A page that fails to
    /// load counts as a failed fetch and its record keeps the listing
    /// category.
    async fn enrich_categories(
        &mut self,
        records: &mut [ProductRecord],
        session: &mut SessionBuilder,
    ) -> Result<(), CrawlError> {
        if !self.options.detail_pages || self.options.category_override.is_some() {
            return Ok(());
        }

        let mut opened = HashSet::new();
        for record in records.iter_mut() {
            if self.cancel.is_cancelled() {
                break;
            }
            if session.contains(&record.link) || !opened.insert(record.link.clone()) {
                continue;
            }

            let url = match Url::parse(&record.link) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("Skipping detail page {}: {}", record.link, e);
                    continue;
                }
            };

            match self
                .fetcher
                .fetch_detail(&url, self.detail_ready.as_deref(), self.options.element_timeout)
                .await
            {
                Ok(document) => {
                    let crumbs = extract_detail_breadcrumbs(&document.html, &self.selectors);
                    if crumbs.iter().any(|crumb| !crumb.trim().is_empty()) {
                        let path = resolve_category(&crumbs, None);
                        tracing::debug!("{} is in {}", record.link, path);
                        record.category = path.category;
                        record.subcategory = path.subcategory;
                        record.sub_subcategory = path.sub_subcategory;
                    }
                }
                Err(e) if e.is_parse() => {
                    tracing::warn!("Detail page {} unreadable: {}", record.link, e);
                }
                Err(e) if e.is_recoverable() => {
                    tracing::warn!("Detail page {} skipped: {}", record.link, e);
                    session.record_failed_fetch();
                }
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }
}

/// Runs one query with the fetch engine selected in configuration
///
/// # Example
///
/// ```no_run
/// use catalog_crawler::config::load_config;
/// use catalog_crawler::crawler::{run_crawl, CrawlMode, CrawlOptions};
/// use std::path::Path;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let options = CrawlOptions::from_config(&config, CrawlMode::paginated(&config.pagination));
/// let session = run_crawl(&config, options, "air max", CancellationToken::new()).await?;
/// println!("{} products", session.records().len());
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: &Config,
    options: CrawlOptions,
    query: &str,
    cancel: CancellationToken,
) -> Result<CrawlSession, CrawlError> {
    match config.fetch.engine {
        FetchEngine::Static => {
            let fetcher = StaticFetcher::from_config(&config.fetch)?;
            Coordinator::new(config, fetcher, options, cancel)?
                .run(query)
                .await
        }
        FetchEngine::Browser => run_browser_crawl(config, options, query, cancel).await,
    }
}

#[cfg(feature = "browser")]
async fn run_browser_crawl(
    config: &Config,
    options: CrawlOptions,
    query: &str,
    cancel: CancellationToken,
) -> Result<CrawlSession, CrawlError> {
    use crate::crawler::{ChromeSession, DynamicFetcher};

    // Fail on bad input before a browser is launched
    TargetBuilder::from_site(&config.site).build(query, TargetPosition::Page(1))?;

    let session = ChromeSession::launch(&config.fetch).await?;
    let fetcher = DynamicFetcher::new(
        session,
        Duration::from_millis(config.scroll.settle_delay_ms),
    );
    Coordinator::new(config, fetcher, options, cancel)?
        .run(query)
        .await
}

#[cfg(not(feature = "browser"))]
async fn run_browser_crawl(
    _config: &Config,
    _options: CrawlOptions,
    _query: &str,
    _cancel: CancellationToken,
) -> Result<CrawlSession, CrawlError> {
    Err(CrawlError::Unsupported(
        "browser engine (rebuild with `--features browser`)",
    ))
}
