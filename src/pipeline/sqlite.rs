//! SQLite pipeline implementation
//!
//! This module provides a pipeline that records every result as a row in a
//! SQLite database, with the extracted fields stored as JSON.

use crate::model::{CrawlContext, ResultItems};
use crate::pipeline::traits::{Pipeline, PipelineResult, ResultRecord};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;

/// SQL schema for the results database
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    identity TEXT NOT NULL,
    url TEXT NOT NULL,
    depth INTEGER NOT NULL,
    fields TEXT NOT NULL,
    crawled_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_results_url ON results(url);
CREATE INDEX IF NOT EXISTS idx_results_identity ON results(identity);
"#;

/// Records results in a SQLite database
pub struct SqlitePipeline {
    conn: Mutex<Connection>,
}

impl SqlitePipeline {
    /// Opens or creates the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqlitePipeline)` - Successfully opened/created database
    /// * `Err(PipelineError)` - Failed to open database
    pub fn new(path: &Path) -> PipelineResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        conn.execute_batch(SCHEMA_SQL)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> PipelineResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Number of stored results
    pub fn count(&self) -> PipelineResult<u64> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM results", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// URLs of the stored results in insertion order
    pub fn urls(&self) -> PipelineResult<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT url FROM results ORDER BY id")?;
        let urls = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(urls)
    }
}

impl Pipeline for SqlitePipeline {
    fn process(&self, items: &ResultItems, ctx: &CrawlContext) -> PipelineResult<()> {
        let record = ResultRecord::new(items);
        let fields = serde_json::to_string(record.fields)?;

        self.conn.lock().execute(
            "INSERT INTO results (identity, url, depth, fields, crawled_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                ctx.identity,
                record.url,
                record.depth,
                fields,
                record.crawled_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn close(&self) -> PipelineResult<()> {
        self.conn
            .lock()
            .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}
