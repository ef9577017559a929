//! Page processor trait and error types

use crate::model::Page;
use thiserror::Error;

/// Errors that can occur while extracting from a page
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Extraction failed for {url}: {message}")]
    Extraction { url: String, message: String },
}

/// Result type for page processing
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Turns a fetched page into follow-up requests and result records
///
/// `process` mutates the page in place: it fills `result_items`, adds target
/// requests, and may set `skip`, `need_cycle_retry` or `miss_target_urls`.
/// One processor is shared by all workers.
pub trait PageProcessor: Send + Sync {
    /// Extracts from `page`
    fn process(&self, page: &mut Page) -> ProcessResult<()>;

    /// Releases resources at the end of a run
    fn close(&self) -> ProcessResult<()> {
        Ok(())
    }
}
