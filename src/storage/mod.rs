//! Storage module for persisting crawl sessions
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - One run row per finished session, tied to its configuration hash
//! - One product row per record
//! - Price aggregates grouped by category

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::TerminationReason;
use chrono::{DateTime, Utc};
use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Represents a persisted crawl session
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub query: String,
    pub mode: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Unset while the session's rows are still being written
    pub termination_reason: Option<TerminationReason>,
    pub pages_visited: u32,
    pub failed_extractions: u32,
    pub failed_fetches: u32,
    pub config_hash: String,
}

/// Price aggregates for one category
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryPriceStats {
    /// Category label; empty when unknown
    pub category: String,

    /// All products in the category
    pub count: u64,

    /// Products whose price text could be parsed
    pub parsed_count: u64,

    /// Aggregates over parsed prices; `None` when `parsed_count` is 0
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub mean_price: Option<f64>,
}

impl CategoryPriceStats {
    /// Products whose price fell back to 0.0
    pub fn unparsed_count(&self) -> u64 {
        self.count.saturating_sub(self.parsed_count)
    }
}
