//! Output handler traits and types
//!
//! This module defines the trait interface for output handlers and
//! associated data structures for crawl summaries.

use crate::session::CrawlSession;
use crate::storage::{CategoryPriceStats, RunRecord, StorageError};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// One persisted session with its price breakdown
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run: RunRecord,

    /// Product rows stored for the run
    pub record_count: u64,

    /// Price statistics grouped by category
    pub categories: Vec<CategoryPriceStats>,
}

impl RunSummary {
    /// Products whose price text could not be parsed
    pub fn unparsed_prices(&self) -> u64 {
        self.categories.iter().map(|c| c.unparsed_count()).sum()
    }

    /// Session duration in seconds, if the run finished
    pub fn duration_seconds(&self) -> Option<i64> {
        self.run
            .finished_at
            .map(|finished| (finished - self.run.started_at).num_seconds())
    }
}

/// Summary of the sessions recorded in one invocation
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub generated_at: DateTime<Utc>,
    pub runs: Vec<RunSummary>,
}

impl CrawlSummary {
    /// Creates an empty summary
    pub fn new() -> Self {
        Self {
            generated_at: Utc::now(),
            runs: Vec::new(),
        }
    }

    /// Returns the total number of product rows across runs
    pub fn total_records(&self) -> u64 {
        self.runs.iter().map(|r| r.record_count).sum()
    }

    /// Returns the total number of pages or scrolls visited across runs
    pub fn total_steps(&self) -> u64 {
        self.runs.iter().map(|r| r.run.pages_visited as u64).sum()
    }

    /// Returns the number of runs cut short by a ceiling or cancellation
    pub fn truncated_runs(&self) -> usize {
        self.runs
            .iter()
            .filter(|r| r.run.termination_reason.map_or(true, |t| t.is_truncated()))
            .count()
    }
}

impl Default for CrawlSummary {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for output handlers
///
/// Output handlers receive each finished session and produce the final
/// summary for the invocation.
pub trait OutputHandler {
    /// Records a finished session
    ///
    /// # Arguments
    ///
    /// * `session` - The finished session
    /// * `mode` - Crawl mode name the session ran in
    ///
    /// # Returns
    ///
    /// The persisted run ID
    fn record_session(&self, session: &CrawlSession, mode: &str) -> OutputResult<i64>;

    /// Generates a summary of every session recorded so far
    fn generate_summary(&self) -> OutputResult<CrawlSummary>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TerminationReason;
    use chrono::Duration;

    fn run(pages: u32, reason: Option<TerminationReason>) -> RunSummary {
        let started_at = Utc::now();
        RunSummary {
            run: RunRecord {
                id: 1,
                query: "air max".into(),
                mode: "paginated".into(),
                started_at,
                finished_at: Some(started_at + Duration::seconds(42)),
                termination_reason: reason,
                pages_visited: pages,
                failed_extractions: 0,
                failed_fetches: 0,
                config_hash: "h".into(),
            },
            record_count: 10,
            categories: vec![CategoryPriceStats {
                category: "Men".into(),
                count: 10,
                parsed_count: 8,
                min_price: Some(1.0),
                max_price: Some(2.0),
                mean_price: Some(1.5),
            }],
        }
    }

    #[test]
    fn test_crawl_summary_new() {
        let summary = CrawlSummary::new();
        assert_eq!(summary.total_records(), 0);
        assert_eq!(summary.truncated_runs(), 0);
    }

    #[test]
    fn test_totals() {
        let summary = CrawlSummary {
            generated_at: Utc::now(),
            runs: vec![
                run(2, Some(TerminationReason::Exhausted)),
                run(3, Some(TerminationReason::MaxPagesReached)),
                run(1, None),
            ],
        };

        assert_eq!(summary.total_records(), 30);
        assert_eq!(summary.total_steps(), 6);
        assert_eq!(summary.truncated_runs(), 2);
    }

    #[test]
    fn test_run_summary_helpers() {
        let run = run(1, Some(TerminationReason::HeightStable));
        assert_eq!(run.unparsed_prices(), 2);
        assert_eq!(run.duration_seconds(), Some(42));
    }
}
