//! Database schema definitions
//!
//! This module contains the SQL schema for the catalog database: one row per
//! crawl session and one row per product record.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per finished crawl session
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    query TEXT NOT NULL,
    mode TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    termination_reason TEXT,
    pages_visited INTEGER NOT NULL DEFAULT 0,
    failed_extractions INTEGER NOT NULL DEFAULT 0,
    failed_fetches INTEGER NOT NULL DEFAULT 0,
    config_hash TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_runs_query ON runs(query);

-- One row per product record, unique by link within a run
CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    price_raw TEXT NOT NULL,
    price_value REAL NOT NULL,
    price_parsed INTEGER NOT NULL,
    link TEXT NOT NULL,
    category TEXT NOT NULL DEFAULT '',
    subcategory TEXT NOT NULL DEFAULT '',
    sub_subcategory TEXT NOT NULL DEFAULT '',
    captured_at TEXT NOT NULL,
    UNIQUE(run_id, link)
);

CREATE INDEX IF NOT EXISTS idx_products_run ON products(run_id);
CREATE INDEX IF NOT EXISTS idx_products_category ON products(category);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
