//! SQLite-based output handler implementation
//!
//! This module provides an output handler that records finished sessions
//! directly to the SQLite storage backend.

use crate::output::summarize_runs;
use crate::output::traits::{CrawlSummary, OutputError, OutputHandler, OutputResult};
use crate::session::CrawlSession;
use crate::storage::Storage;
use std::sync::{Arc, Mutex, MutexGuard};

/// SQLite-based output handler
///
/// This handler writes each session to the storage backend, tagged with the
/// configuration hash, and summarizes the runs it wrote.
pub struct SqliteOutputHandler {
    storage: Arc<Mutex<dyn Storage + Send>>,
    config_hash: String,
    run_ids: Mutex<Vec<i64>>,
}

impl SqliteOutputHandler {
    /// Creates a new SQLite output handler
    ///
    /// # Arguments
    ///
    /// * `storage` - The storage backend to use
    /// * `config_hash` - Hash recorded with every run
    pub fn new(storage: Arc<Mutex<dyn Storage + Send>>, config_hash: impl Into<String>) -> Self {
        Self {
            storage,
            config_hash: config_hash.into(),
            run_ids: Mutex::new(Vec::new()),
        }
    }

    /// Returns the IDs of runs recorded by this handler
    pub fn run_ids(&self) -> Vec<i64> {
        self.run_ids
            .lock()
            .map(|ids| ids.clone())
            .unwrap_or_default()
    }

    fn storage(&self) -> OutputResult<MutexGuard<'_, dyn Storage + Send + 'static>> {
        self.storage
            .lock()
            .map_err(|e| OutputError::Write(format!("Failed to lock storage: {}", e)))
    }
}

impl OutputHandler for SqliteOutputHandler {
    fn record_session(&self, session: &CrawlSession, mode: &str) -> OutputResult<i64> {
        let run_id = self
            .storage()?
            .save_session(session, mode, &self.config_hash)?;

        self.run_ids
            .lock()
            .map_err(|e| OutputError::Write(format!("Failed to lock run list: {}", e)))?
            .push(run_id);

        tracing::info!(
            "Recorded '{}' as run {} ({} records)",
            session.query(),
            run_id,
            session.records().len()
        );
        Ok(run_id)
    }

    fn generate_summary(&self) -> OutputResult<CrawlSummary> {
        let run_ids = self.run_ids();
        let storage = self.storage()?;
        summarize_runs(&*storage, &run_ids)
    }
}
