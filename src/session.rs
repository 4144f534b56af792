//! Crawl data model
//!
//! Candidates are what the extractor finds on a listing; records are what
//! survives validation. A `CrawlSession` is assembled by a `SessionBuilder`
//! owned by the orchestrator and is read-only once finished.

use crate::crawler::CategoryPath;
use crate::state::TerminationReason;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

/// An unvalidated product card pulled from one listing document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductCardCandidate {
    /// Product name text
    pub name: Option<String>,

    /// Price text as displayed
    pub price_raw: Option<String>,

    /// Link href as written in the markup
    pub link: Option<String>,

    /// Breadcrumb texts that apply to this card, outermost first
    pub breadcrumbs: Vec<String>,
}

/// A validated product row
///
/// Serializes to the persisted column set: name, priceRaw, priceValue, link,
/// category, subcategory, subSubcategory, capturedAt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub name: String,
    pub price_raw: String,
    pub price_value: f64,
    /// False when `price_value` is the 0.0 stand-in for unparsable text
    #[serde(skip)]
    pub price_parsed: bool,
    pub link: String,
    pub category: String,
    pub subcategory: String,
    pub sub_subcategory: String,
    pub captured_at: DateTime<Utc>,
}

impl ProductRecord {
    /// Returns the resolved category triple
    pub fn category_path(&self) -> CategoryPath {
        CategoryPath {
            category: self.category.clone(),
            subcategory: self.subcategory.clone(),
            sub_subcategory: self.sub_subcategory.clone(),
        }
    }
}

/// A finished crawl for one query
#[derive(Debug, Clone)]
pub struct CrawlSession {
    query: String,
    records: Vec<ProductRecord>,
    pages_or_scrolls_visited: u32,
    termination_reason: TerminationReason,
    failed_extractions: u32,
    failed_fetches: u32,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

impl CrawlSession {
    /// The query this session searched for
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Records in first-seen fetch order, unique by link
    pub fn records(&self) -> &[ProductRecord] {
        &self.records
    }

    /// Number of pages (paginated mode) or scrolls (scroll mode) issued
    pub fn pages_or_scrolls_visited(&self) -> u32 {
        self.pages_or_scrolls_visited
    }

    /// Why the session stopped
    pub fn termination_reason(&self) -> TerminationReason {
        self.termination_reason
    }

    /// Candidates skipped for missing name, price, or link
    pub fn failed_extractions(&self) -> u32 {
        self.failed_extractions
    }

    /// Page or scroll steps whose fetch failed and was skipped
    pub fn failed_fetches(&self) -> u32 {
        self.failed_fetches
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }
}

/// Outcome of appending a record to a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Added,
    Duplicate,
}

/// Mutable accumulator behind a `CrawlSession`
///
/// Link uniqueness is enforced here: the first record for a link is kept and
/// later ones are dropped.
#[derive(Debug)]
pub struct SessionBuilder {
    query: String,
    records: Vec<ProductRecord>,
    seen_links: HashSet<String>,
    pages_or_scrolls_visited: u32,
    failed_extractions: u32,
    failed_fetches: u32,
    started_at: DateTime<Utc>,
}

impl SessionBuilder {
    /// Starts an empty session for a query
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            records: Vec::new(),
            seen_links: HashSet::new(),
            pages_or_scrolls_visited: 0,
            failed_extractions: 0,
            failed_fetches: 0,
            started_at: Utc::now(),
        }
    }

    /// Appends a record unless its link was already seen
    pub fn push(&mut self, record: ProductRecord) -> AppendOutcome {
        if !self.seen_links.insert(record.link.clone()) {
            return AppendOutcome::Duplicate;
        }
        self.records.push(record);
        AppendOutcome::Added
    }

    pub fn record_visit(&mut self) {
        self.pages_or_scrolls_visited += 1;
    }

    pub fn record_failed_extraction(&mut self) {
        self.failed_extractions += 1;
    }

    pub fn record_failed_fetch(&mut self) {
        self.failed_fetches += 1;
    }

    /// Returns true if a record with this link was already appended
    pub fn contains(&self, link: &str) -> bool {
        self.seen_links.contains(link)
    }

    pub fn pages_or_scrolls_visited(&self) -> u32 {
        self.pages_or_scrolls_visited
    }

    /// Seals the session with its termination reason
    pub fn finish(self, termination_reason: TerminationReason) -> CrawlSession {
        CrawlSession {
            query: self.query,
            records: self.records,
            pages_or_scrolls_visited: self.pages_or_scrolls_visited,
            termination_reason,
            failed_extractions: self.failed_extractions,
            failed_fetches: self.failed_fetches,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}
