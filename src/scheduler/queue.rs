//! FIFO frontier with pluggable duplicate suppression

use crate::model::Request;
use crate::scheduler::duplicate::{HashSetDuplicateRemover, NoDuplicateRemover};
use crate::scheduler::traits::{DuplicateRemover, Scheduler, SchedulerResult};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// First-in first-out frontier
///
/// Requests carrying a cycle-retry count skip the duplicate check: they were
/// accepted once already and are coming back for another attempt.
pub struct QueueScheduler {
    queue: Mutex<VecDeque<Request>>,
    remover: Box<dyn DuplicateRemover>,
}

impl QueueScheduler {
    /// Creates a FIFO frontier with hash-set duplicate suppression
    pub fn new() -> Self {
        Self::with_remover(Box::new(HashSetDuplicateRemover::new()))
    }

    /// Creates a FIFO frontier that accepts every request
    pub fn without_duplicate_removal() -> Self {
        Self::with_remover(Box::new(NoDuplicateRemover::new()))
    }

    /// Creates a FIFO frontier with a custom duplicate remover
    pub fn with_remover(remover: Box<dyn DuplicateRemover>) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            remover,
        }
    }

    /// Removes and returns every queued request in order
    pub fn drain(&self) -> Vec<Request> {
        self.queue.lock().drain(..).collect()
    }

    fn accepts(&self, request: &Request) -> bool {
        request.is_cycle_retry() || !self.remover.is_duplicate(request)
    }
}

impl Default for QueueScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for QueueScheduler {
    fn push(&self, request: Request) -> SchedulerResult<bool> {
        if !self.accepts(&request) {
            tracing::trace!("Duplicate request suppressed: {}", request.url);
            return Ok(false);
        }
        self.queue.lock().push_back(request);
        Ok(true)
    }

    fn poll(&self) -> SchedulerResult<Option<Request>> {
        Ok(self.queue.lock().pop_front())
    }

    fn load(&self, requests: Vec<Request>) -> SchedulerResult<usize> {
        let mut queue = self.queue.lock();
        let before = queue.len();
        queue.extend(requests.into_iter().filter(|r| self.accepts(r)));
        Ok(queue.len() - before)
    }

    fn supports_bulk_load(&self) -> bool {
        true
    }

    fn left_count(&self) -> usize {
        self.queue.lock().len()
    }

    fn total_count(&self) -> usize {
        self.remover.total_count()
    }

    fn reset_duplicate_check(&self) -> SchedulerResult<()> {
        self.remover.reset();
        Ok(())
    }
}
