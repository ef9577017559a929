//! Duplicate removers

use crate::model::Request;
use crate::scheduler::traits::DuplicateRemover;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Suppresses requests whose fingerprint has been seen before
#[derive(Default)]
pub struct HashSetDuplicateRemover {
    seen: Mutex<HashSet<String>>,
}

impl HashSetDuplicateRemover {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DuplicateRemover for HashSetDuplicateRemover {
    fn is_duplicate(&self, request: &Request) -> bool {
        !self.seen.lock().insert(request.fingerprint().to_string())
    }

    fn reset(&self) {
        self.seen.lock().clear();
    }

    fn total_count(&self) -> usize {
        self.seen.lock().len()
    }
}

/// Lets every request through; still counts them
#[derive(Default)]
pub struct NoDuplicateRemover {
    count: AtomicUsize,
}

impl NoDuplicateRemover {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DuplicateRemover for NoDuplicateRemover {
    fn is_duplicate(&self, _request: &Request) -> bool {
        self.count.fetch_add(1, Ordering::SeqCst);
        false
    }

    fn reset(&self) {
        self.count.store(0, Ordering::SeqCst);
    }

    fn total_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}
