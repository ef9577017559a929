//! Pipeline trait and error types
//!
//! This module defines the trait interface for output pipelines and the
//! record shape the bundled pipelines persist.

use crate::model::{CrawlContext, ResultItems};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for output operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Consumes the result items of completed pages
///
/// Pipelines are shared by all workers and are called concurrently; each
/// implementation serializes internally where it needs to.
pub trait Pipeline: Send + Sync {
    /// Handles the results of one page
    fn process(&self, items: &ResultItems, ctx: &CrawlContext) -> PipelineResult<()>;

    /// Flushes and releases resources at the end of a run
    fn close(&self) -> PipelineResult<()> {
        Ok(())
    }
}

/// One persisted result
#[derive(Debug, Clone, Serialize)]
pub struct ResultRecord<'a> {
    pub url: &'a str,
    pub depth: u32,
    pub fields: &'a BTreeMap<String, Value>,
    pub crawled_at: DateTime<Utc>,
}

impl<'a> ResultRecord<'a> {
    /// Builds a record for `items`, timestamped now
    pub fn new(items: &'a ResultItems) -> Self {
        Self {
            url: items.request.url.as_str(),
            depth: items.request.depth,
            fields: &items.fields,
            crawled_at: Utc::now(),
        }
    }
}
