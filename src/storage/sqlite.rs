//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::session::{CrawlSession, ProductRecord};
use crate::state::TerminationReason;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{CategoryPriceStats, RunRecord};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str = "id, query, mode, started_at, finished_at, termination_reason,
     pages_visited, failed_extractions, failed_fetches, config_hash";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn parse_timestamp(index: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    let started_at: String = row.get(3)?;
    let finished_at: Option<String> = row.get(4)?;
    let reason: Option<String> = row.get(5)?;

    Ok(RunRecord {
        id: row.get(0)?,
        query: row.get(1)?,
        mode: row.get(2)?,
        started_at: parse_timestamp(3, &started_at)?,
        finished_at: finished_at
            .as_deref()
            .map(|t| parse_timestamp(4, t))
            .transpose()?,
        termination_reason: reason.as_deref().and_then(TerminationReason::from_db_string),
        pages_visited: row.get(6)?,
        failed_extractions: row.get(7)?,
        failed_fetches: row.get(8)?,
        config_hash: row.get(9)?,
    })
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<ProductRecord> {
    let captured_at: String = row.get(8)?;

    Ok(ProductRecord {
        name: row.get(0)?,
        price_raw: row.get(1)?,
        price_value: row.get(2)?,
        price_parsed: row.get(3)?,
        link: row.get(4)?,
        category: row.get(5)?,
        subcategory: row.get(6)?,
        sub_subcategory: row.get(7)?,
        captured_at: parse_timestamp(8, &captured_at)?,
    })
}

fn insert_run(conn: &Connection, query: &str, mode: &str, config_hash: &str) -> StorageResult<i64> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO runs (query, mode, started_at, config_hash) VALUES (?1, ?2, ?3, ?4)",
        params![query, mode, now, config_hash],
    )?;
    Ok(conn.last_insert_rowid())
}

fn update_run(conn: &Connection, run_id: i64, session: &CrawlSession) -> StorageResult<()> {
    let updated = conn.execute(
        "UPDATE runs SET started_at = ?1, finished_at = ?2, termination_reason = ?3,
         pages_visited = ?4, failed_extractions = ?5, failed_fetches = ?6
         WHERE id = ?7",
        params![
            session.started_at().to_rfc3339(),
            session.finished_at().to_rfc3339(),
            session.termination_reason().to_db_string(),
            session.pages_or_scrolls_visited(),
            session.failed_extractions(),
            session.failed_fetches(),
            run_id
        ],
    )?;

    if updated == 0 {
        return Err(StorageError::RunNotFound(run_id));
    }
    Ok(())
}

fn insert_product_rows(
    conn: &Connection,
    run_id: i64,
    records: &[ProductRecord],
) -> StorageResult<usize> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO products (run_id, position, name, price_raw, price_value,
         price_parsed, link, category, subcategory, sub_subcategory, captured_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    )?;

    let mut inserted = 0;
    for (position, record) in records.iter().enumerate() {
        inserted += stmt.execute(params![
            run_id,
            position as i64,
            record.name,
            record.price_raw,
            record.price_value,
            record.price_parsed,
            record.link,
            record.category,
            record.subcategory,
            record.sub_subcategory,
            record.captured_at.to_rfc3339()
        ])?;
    }
    Ok(inserted)
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, query: &str, mode: &str, config_hash: &str) -> StorageResult<i64> {
        insert_run(&self.conn, query, mode, config_hash)
    }

    fn finish_run(&mut self, run_id: i64, session: &CrawlSession) -> StorageResult<()> {
        update_run(&self.conn, run_id, session)
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let sql = format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS);
        self.conn
            .query_row(&sql, params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn list_runs(&self) -> StorageResult<Vec<RunRecord>> {
        let sql = format!("SELECT {} FROM runs ORDER BY id ASC", RUN_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let runs = stmt
            .query_map([], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }

    // ===== Products =====

    fn insert_products(&mut self, run_id: i64, records: &[ProductRecord]) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        let inserted = insert_product_rows(&tx, run_id, records)?;
        tx.commit()?;
        Ok(inserted)
    }

    fn get_products(&self, run_id: i64) -> StorageResult<Vec<ProductRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, price_raw, price_value, price_parsed, link, category, subcategory,
             sub_subcategory, captured_at
             FROM products WHERE run_id = ?1 ORDER BY position ASC",
        )?;

        let products = stmt
            .query_map(params![run_id], product_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(products)
    }

    fn count_products(&self, run_id: Option<i64>) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM products WHERE ?1 IS NULL OR run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Statistics =====

    fn category_price_stats(&self, run_id: Option<i64>) -> StorageResult<Vec<CategoryPriceStats>> {
        let query = "
            SELECT category,
                   COUNT(*) AS count,
                   SUM(price_parsed) AS parsed_count,
                   MIN(CASE WHEN price_parsed = 1 THEN price_value END),
                   MAX(CASE WHEN price_parsed = 1 THEN price_value END),
                   AVG(CASE WHEN price_parsed = 1 THEN price_value END)
            FROM products
            WHERE ?1 IS NULL OR run_id = ?1
            GROUP BY category
            ORDER BY count DESC, category ASC
        ";

        let mut stmt = self.conn.prepare(query)?;
        let stats = stmt
            .query_map(params![run_id], |row| {
                Ok(CategoryPriceStats {
                    category: row.get(0)?,
                    count: row.get::<_, i64>(1)? as u64,
                    parsed_count: row.get::<_, Option<i64>>(2)?.unwrap_or(0) as u64,
                    min_price: row.get(3)?,
                    max_price: row.get(4)?,
                    mean_price: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(stats)
    }

    // ===== Sessions =====

    /// Persists run, products and outcome in one transaction
    fn save_session(
        &mut self,
        session: &CrawlSession,
        mode: &str,
        config_hash: &str,
    ) -> StorageResult<i64> {
        let tx = self.conn.transaction()?;
        let run_id = insert_run(&tx, session.query(), mode, config_hash)?;
        let inserted = insert_product_rows(&tx, run_id, session.records())?;
        update_run(&tx, run_id, session)?;
        tx.commit()?;

        tracing::debug!(
            "Saved session '{}' as run {} ({} rows)",
            session.query(),
            run_id,
            inserted
        );
        Ok(run_id)
    }
}
