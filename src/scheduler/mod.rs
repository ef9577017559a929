//! Frontier (scheduler) module
//!
//! The frontier holds pending requests. This module contains:
//! - The `Scheduler` contract the orchestrator depends on
//! - Duplicate-suppression strategies (`DuplicateRemover`)
//! - In-memory FIFO and priority implementations
//! - Start-up seeding with an optional bulk path

mod duplicate;
mod priority;
mod queue;
mod traits;

pub use duplicate::{HashSetDuplicateRemover, NoDuplicateRemover};
pub use priority::PriorityScheduler;
pub use queue::QueueScheduler;
pub use traits::{DuplicateRemover, Scheduler, SchedulerError, SchedulerResult};

use crate::model::Request;

/// Seeds `scheduler` with `requests`, honoring duplicate suppression
///
/// Frontiers with a native bulk path receive the whole batch in one `load`.
/// Others get the batch staged through a duplicate-removing buffer first, so
/// they are loaded once with an already de-duplicated set.
///
/// # Returns
///
/// The number of requests the frontier accepted
pub fn seed(scheduler: &dyn Scheduler, requests: Vec<Request>) -> SchedulerResult<usize> {
    if requests.is_empty() {
        return Ok(0);
    }

    if scheduler.supports_bulk_load() {
        return scheduler.load(requests);
    }

    let buffer = QueueScheduler::new();
    buffer.load(requests)?;
    scheduler.load(buffer.drain())
}
