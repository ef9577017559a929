//! Downloader trait and error types

use crate::model::{CrawlContext, Page, Request};
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while fetching a page
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Download failed for {url}: {message}")]
    Other { url: String, message: String },
}

impl DownloadError {
    /// Status code carried by the error, if the server answered
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type for download operations
pub type DownloadResult<T> = Result<T, DownloadError>;

/// Turns one request into one fetched page
///
/// Every worker owns its own instance obtained through `clone_box`, so an
/// implementation may keep connection or session state without locking.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Fetches `request`
    async fn download(&mut self, request: &Request, ctx: &CrawlContext) -> DownloadResult<Page>;

    /// Creates an independent instance for another worker
    fn clone_box(&self) -> Box<dyn Downloader>;

    /// Hint for the number of workers that will share the prototype
    fn set_thread_num(&mut self, _thread_num: usize) {}

    /// Releases resources at the end of a run
    fn close(&self) -> DownloadResult<()> {
        Ok(())
    }
}
