//! Frontier traits and error types
//!
//! This module defines the contract every frontier implementation offers the
//! orchestrator, and the duplicate-suppression strategy frontiers plug in.

use crate::model::{CrawlContext, Request};
use thiserror::Error;

/// Errors that can occur during frontier operations
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Frontier backend error: {0}")]
    Backend(String),

    #[error("Frontier is closed")]
    Closed,
}

/// Result type for frontier operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// A thread-safe queue of pending requests
///
/// `push` and `poll` may be called concurrently from any number of workers;
/// implementations synchronize internally. `poll` never blocks waiting for
/// work: an empty frontier yields `Ok(None)` and callers back off themselves.
pub trait Scheduler: Send + Sync {
    /// Prepares the frontier for a run
    fn init(&self, _ctx: &CrawlContext) -> SchedulerResult<()> {
        Ok(())
    }

    /// Adds a request
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The request was queued
    /// * `Ok(false)` - The request was suppressed as a duplicate
    fn push(&self, request: Request) -> SchedulerResult<bool>;

    /// Takes the next request, or `None` when the frontier is empty
    fn poll(&self) -> SchedulerResult<Option<Request>>;

    /// Adds many requests at once, returning how many were queued
    fn load(&self, requests: Vec<Request>) -> SchedulerResult<usize> {
        let mut queued = 0;
        for request in requests {
            if self.push(request)? {
                queued += 1;
            }
        }
        Ok(queued)
    }

    /// Returns true if `load` is a native bulk path rather than repeated `push`
    fn supports_bulk_load(&self) -> bool {
        false
    }

    /// Number of requests waiting to be polled
    fn left_count(&self) -> usize;

    /// Number of distinct requests ever accepted
    fn total_count(&self) -> usize;

    /// Forgets every fingerprint seen so far
    fn reset_duplicate_check(&self) -> SchedulerResult<()> {
        Ok(())
    }

    /// Releases resources at the end of a run
    fn close(&self) -> SchedulerResult<()> {
        Ok(())
    }
}

/// Duplicate-suppression strategy
pub trait DuplicateRemover: Send + Sync {
    /// Records the request's fingerprint and returns true if it was already seen
    fn is_duplicate(&self, request: &Request) -> bool;

    /// Forgets every fingerprint
    fn reset(&self);

    /// Number of fingerprints recorded
    fn total_count(&self) -> usize;
}
