//! JSON-lines file pipeline
//!
//! The default pipeline when none is registered: every result becomes one
//! JSON object on its own line in `<data_dir>/results.jsonl`.

use crate::model::{CrawlContext, ResultItems};
use crate::pipeline::traits::{Pipeline, PipelineResult, ResultRecord};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// File name used inside the run data directory
pub const RESULTS_FILE_NAME: &str = "results.jsonl";

/// Appends results to a JSON-lines file
pub struct JsonFilePipeline {
    path: PathBuf,
    writer: Mutex<Option<BufWriter<File>>>,
}

impl JsonFilePipeline {
    /// Creates a pipeline writing to `path`; the file is opened on first write
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(None),
        }
    }

    /// Creates a pipeline writing to `results.jsonl` inside `data_dir`
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(RESULTS_FILE_NAME))
    }

    /// Path of the output file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> PipelineResult<BufWriter<File>> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        Ok(BufWriter::new(file))
    }
}

impl Pipeline for JsonFilePipeline {
    fn process(&self, items: &ResultItems, _ctx: &CrawlContext) -> PipelineResult<()> {
        let line = serde_json::to_string(&ResultRecord::new(items))?;

        let mut writer = self.writer.lock();
        if writer.is_none() {
            *writer = Some(self.open()?);
        }
        if let Some(writer) = writer.as_mut() {
            writeln!(writer, "{}", line)?;
            writer.flush()?;
        }
        Ok(())
    }

    fn close(&self) -> PipelineResult<()> {
        if let Some(mut writer) = self.writer.lock().take() {
            writer.flush()?;
        }
        Ok(())
    }
}
