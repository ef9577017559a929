//! Priority frontier
//!
//! Requests with lower priority values are polled first; equal priorities
//! poll in insertion order.

use crate::model::Request;
use crate::scheduler::duplicate::HashSetDuplicateRemover;
use crate::scheduler::traits::{DuplicateRemover, Scheduler, SchedulerResult};
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A request queued with its insertion sequence
#[derive(Debug)]
struct QueuedRequest {
    request: Request,
    sequence: u64,
}

// Lower priority values and earlier sequences are popped first from BinaryHeap
impl Ord for QueuedRequest {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .request
            .priority
            .cmp(&self.request.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for QueuedRequest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedRequest {
    fn eq(&self, other: &Self) -> bool {
        self.request.priority == other.request.priority && self.sequence == other.sequence
    }
}

impl Eq for QueuedRequest {}

#[derive(Default)]
struct Heap {
    entries: BinaryHeap<QueuedRequest>,
    next_sequence: u64,
}

impl Heap {
    fn push(&mut self, request: Request) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.entries.push(QueuedRequest { request, sequence });
    }
}

/// Frontier ordered by request priority
pub struct PriorityScheduler {
    heap: Mutex<Heap>,
    remover: Box<dyn DuplicateRemover>,
}

impl PriorityScheduler {
    /// Creates a priority frontier with hash-set duplicate suppression
    pub fn new() -> Self {
        Self::with_remover(Box::new(HashSetDuplicateRemover::new()))
    }

    /// Creates a priority frontier with a custom duplicate remover
    pub fn with_remover(remover: Box<dyn DuplicateRemover>) -> Self {
        Self {
            heap: Mutex::new(Heap::default()),
            remover,
        }
    }

    fn accepts(&self, request: &Request) -> bool {
        request.is_cycle_retry() || !self.remover.is_duplicate(request)
    }
}

impl Default for PriorityScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for PriorityScheduler {
    fn push(&self, request: Request) -> SchedulerResult<bool> {
        if !self.accepts(&request) {
            tracing::trace!("Duplicate request suppressed: {}", request.url);
            return Ok(false);
        }
        self.heap.lock().push(request);
        Ok(true)
    }

    fn poll(&self) -> SchedulerResult<Option<Request>> {
        Ok(self.heap.lock().entries.pop().map(|queued| queued.request))
    }

    fn load(&self, requests: Vec<Request>) -> SchedulerResult<usize> {
        let mut heap = self.heap.lock();
        let mut queued = 0;
        for request in requests {
            if self.accepts(&request) {
                heap.push(request);
                queued += 1;
            }
        }
        Ok(queued)
    }

    fn supports_bulk_load(&self) -> bool {
        true
    }

    fn left_count(&self) -> usize {
        self.heap.lock().entries.len()
    }

    fn total_count(&self) -> usize {
        self.remover.total_count()
    }

    fn reset_duplicate_check(&self) -> SchedulerResult<()> {
        self.remover.reset();
        Ok(())
    }
}
