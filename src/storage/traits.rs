//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::session::{CrawlSession, ProductRecord};
use crate::storage::{CategoryPriceStats, RunRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Persists finished crawl sessions: one run row per session and one product
/// row per record, keeping each session's record order.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a run row for a session that has started
    ///
    /// # Arguments
    ///
    /// * `query` - The session's query
    /// * `mode` - Crawl mode name (`paginated` or `scroll`)
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, query: &str, mode: &str, config_hash: &str) -> StorageResult<i64>;

    /// Records a session's counters and termination reason on its run
    fn finish_run(&mut self, run_id: i64, session: &CrawlSession) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets every run, oldest first
    fn list_runs(&self) -> StorageResult<Vec<RunRecord>>;

    // ===== Products =====

    /// Inserts records for a run in order
    ///
    /// A link already stored for the run is ignored. Returns the number of
    /// rows inserted.
    fn insert_products(&mut self, run_id: i64, records: &[ProductRecord]) -> StorageResult<usize>;

    /// Gets a run's records in their original order
    fn get_products(&self, run_id: i64) -> StorageResult<Vec<ProductRecord>>;

    /// Counts product rows, for one run or across all runs
    fn count_products(&self, run_id: Option<i64>) -> StorageResult<u64>;

    // ===== Statistics =====

    /// Price statistics grouped by category
    ///
    /// Only parsed prices contribute to min/max/mean; unparsed ones are
    /// counted separately.
    fn category_price_stats(&self, run_id: Option<i64>) -> StorageResult<Vec<CategoryPriceStats>>;

    // ===== Sessions =====

    /// Persists a finished session as one run with its records
    ///
    /// Returns the new run ID.
    fn save_session(
        &mut self,
        session: &CrawlSession,
        mode: &str,
        config_hash: &str,
    ) -> StorageResult<i64> {
        let run_id = self.create_run(session.query(), mode, config_hash)?;
        let inserted = self.insert_products(run_id, session.records())?;
        self.finish_run(run_id, session)?;
        tracing::debug!(
            "Saved session '{}' as run {} ({} rows)",
            session.query(),
            run_id,
            inserted
        );
        Ok(run_id)
    }
}
