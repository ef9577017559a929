//! In-memory collecting pipeline

use crate::model::{CrawlContext, ResultItems};
use crate::pipeline::traits::{Pipeline, PipelineResult};
use parking_lot::Mutex;

/// Keeps every result in memory, for embedding the spider in other programs
#[derive(Default)]
pub struct CollectorPipeline {
    collected: Mutex<Vec<ResultItems>>,
}

impl CollectorPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Results collected so far, in arrival order
    pub fn collected(&self) -> Vec<ResultItems> {
        self.collected.lock().clone()
    }

    /// Number of results collected so far
    pub fn len(&self) -> usize {
        self.collected.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.collected.lock().is_empty()
    }
}

impl Pipeline for CollectorPipeline {
    fn process(&self, items: &ResultItems, _ctx: &CrawlContext) -> PipelineResult<()> {
        self.collected.lock().push(items.clone());
        Ok(())
    }
}
