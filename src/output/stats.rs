//! Statistics generation from the catalog database
//!
//! This module provides functionality for extracting and displaying
//! database-wide statistics across every recorded session.

use crate::output::OutputResult;
use crate::state::TerminationReason;
use crate::storage::{CategoryPriceStats, Storage};
use std::collections::HashMap;

/// Catalog statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Number of recorded sessions
    pub total_runs: u64,

    /// Count of sessions by termination reason
    pub runs_by_reason: HashMap<TerminationReason, u64>,

    /// Number of product rows
    pub total_products: u64,

    /// Pages or scrolls visited across sessions
    pub total_steps: u64,

    /// Candidates skipped for missing fields
    pub failed_extractions: u64,

    /// Page or scroll steps whose fetch failed
    pub failed_fetches: u64,

    /// Price statistics grouped by category, across sessions
    pub categories: Vec<CategoryPriceStats>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(OutputError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> OutputResult<CrawlStatistics> {
    let runs = storage.list_runs()?;

    let mut runs_by_reason = HashMap::new();
    for reason in runs.iter().filter_map(|r| r.termination_reason) {
        *runs_by_reason.entry(reason).or_insert(0) += 1;
    }

    Ok(CrawlStatistics {
        total_runs: runs.len() as u64,
        runs_by_reason,
        total_products: storage.count_products(None)?,
        total_steps: runs.iter().map(|r| r.pages_visited as u64).sum(),
        failed_extractions: runs.iter().map(|r| r.failed_extractions as u64).sum(),
        failed_fetches: runs.iter().map(|r| r.failed_fetches as u64).sum(),
        categories: storage.category_price_stats(None)?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Catalog Statistics ===\n");

    println!("Overview:");
    println!("  Sessions recorded: {}", stats.total_runs);
    println!("  Products stored: {}", stats.total_products);
    println!("  Pages/scrolls visited: {}", stats.total_steps);
    println!("  Failed extractions: {}", stats.failed_extractions);
    println!("  Failed fetches: {}", stats.failed_fetches);
    println!();

    if !stats.runs_by_reason.is_empty() {
        println!("Sessions by Termination Reason:");
        for reason in TerminationReason::all() {
            if let Some(count) = stats.runs_by_reason.get(&reason) {
                let percentage = if stats.total_runs > 0 {
                    (*count as f64 / stats.total_runs as f64) * 100.0
                } else {
                    0.0
                };
                println!("  {}: {} ({:.1}%)", reason, count, percentage);
            }
        }
        println!();
    }

    if !stats.categories.is_empty() {
        println!("Prices by Category:");
        for category in &stats.categories {
            let label = if category.category.is_empty() {
                "(uncategorized)"
            } else {
                category.category.as_str()
            };
            match (category.min_price, category.max_price, category.mean_price) {
                (Some(min), Some(max), Some(mean)) => println!(
                    "  {}: {} products, {:.2} - {:.2} (mean {:.2}, {} unpriced)",
                    label,
                    category.count,
                    min,
                    max,
                    mean,
                    category.unparsed_count()
                ),
                _ => println!("  {}: {} products, no parsed prices", label, category.count),
            }
        }
    }
}
