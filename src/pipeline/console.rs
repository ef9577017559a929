//! Console pipeline

use crate::model::{CrawlContext, ResultItems};
use crate::pipeline::traits::{Pipeline, PipelineResult};
use parking_lot::Mutex;
use std::io::Write;

/// Prints every result to stdout
///
/// Output of one page is written under a lock so concurrent pages don't interleave.
#[derive(Default)]
pub struct ConsolePipeline {
    lock: Mutex<()>,
}

impl ConsolePipeline {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Pipeline for ConsolePipeline {
    fn process(&self, items: &ResultItems, _ctx: &CrawlContext) -> PipelineResult<()> {
        let _guard = self.lock.lock();
        let stdout = std::io::stdout();
        let mut out = stdout.lock();

        writeln!(out, "get page: {}", items.request.url)?;
        for (key, value) in &items.fields {
            writeln!(out, "{}:\t{}", key, value)?;
        }
        Ok(())
    }
}
