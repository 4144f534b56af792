//! Output module for recording sessions and reporting prices
//!
//! This module handles:
//! - Recording finished sessions through an output handler
//! - Generating markdown price summaries grouped by category
//! - Printing database-wide statistics

mod markdown;
mod sqlite_output;
pub mod stats;
mod traits;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use sqlite_output::SqliteOutputHandler;
pub use stats::{load_statistics, print_statistics, CrawlStatistics};
pub use traits::{CrawlSummary, OutputError, OutputHandler, OutputResult, RunSummary};

use crate::storage::Storage;

/// Generates a crawl summary for the given runs
///
/// # Arguments
///
/// * `storage` - The storage backend containing crawl data
/// * `run_ids` - Runs to include, in report order
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Successfully generated summary
/// * `Err(OutputError)` - A run was missing or a query failed
pub fn summarize_runs(storage: &dyn Storage, run_ids: &[i64]) -> OutputResult<CrawlSummary> {
    let mut summary = CrawlSummary::new();

    for &run_id in run_ids {
        let run = storage.get_run(run_id)?;
        let record_count = storage.count_products(Some(run_id))?;
        let categories = storage.category_price_stats(Some(run_id))?;

        summary.runs.push(RunSummary {
            run,
            record_count,
            categories,
        });
    }

    Ok(summary)
}
