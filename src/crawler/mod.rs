//! Crawler module for listing fetching and product extraction
//!
//! This module contains the core crawl-and-extract logic, including:
//! - Building search targets from a query and a page or scroll position
//! - Static (HTTP) and dynamic (browser) fetch strategies
//! - Product card extraction, price normalization and category resolution
//! - The per-query crawl loop and the multi-query scheduler

mod browser;
mod category;
mod coordinator;
mod fetcher;
mod parser;
mod scheduler;
mod target;

pub use browser::{BrowserSession, DynamicFetcher};
#[cfg(feature = "browser")]
pub use browser::ChromeSession;
pub use category::{resolve_category, CategoryPath};
pub use coordinator::{run_crawl, Coordinator, CrawlMode, CrawlOptions};
pub use fetcher::{
    build_http_client, fetch_document, Capability, FetchStrategy, RawListingDocument, StaticFetcher,
};
pub use parser::{
    extract_candidates, extract_detail_breadcrumbs, normalize_price, parse_price, validate_candidate,
    ListingSelectors, ValidationContext,
};
pub use scheduler::{QueryOutcome, Scheduler};
pub use target::{CrawlTarget, ScrollCursor, TargetBuilder, TargetPosition};

use crate::config::Config;
use crate::CrawlError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Crawls every query with the configured engine and concurrency cap
///
/// This is the main entry point for a crawl. It will:
/// 1. Start one session per query, at most `max-concurrent-sessions` at once
/// 2. Walk each listing in the requested mode until it terminates
/// 3. Return one outcome per query, in the order given
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `options` - Mode and per-session options shared by every query
/// * `queries` - Search terms
/// * `cancel` - Stops every session at its next loop iteration
pub async fn crawl(
    config: Arc<Config>,
    options: CrawlOptions,
    queries: Vec<String>,
    cancel: CancellationToken,
) -> Result<Vec<QueryOutcome>, CrawlError> {
    if queries.is_empty() {
        return Err(CrawlError::InvalidQuery("no queries given".to_string()));
    }

    let scheduler = Scheduler::from_config(&config, cancel);
    Ok(scheduler.run_all(config, options, queries).await)
}
