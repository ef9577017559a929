//! Failed request log
//!
//! An append-only UTF-8 file holding one JSON-serialized request per line.
//! It is meant for post-mortem inspection and manual replay; the engine never
//! reads it back on its own.

use crate::model::Request;
use crate::SpiderError;
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// File name used inside the run data directory
pub const FAILURE_LOG_FILE_NAME: &str = "errorRequests.txt";

/// Serialized writer for failed requests
pub struct FailureLog {
    path: PathBuf,
    lock: Mutex<u64>,
}

impl FailureLog {
    /// Prepares a failure log at `path`
    ///
    /// The file and its directory are created on the first failure.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(0),
        }
    }

    /// Prepares the failure log inside `data_dir`
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(FAILURE_LOG_FILE_NAME))
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of requests recorded by this instance
    pub fn recorded(&self) -> u64 {
        *self.lock.lock()
    }

    /// Appends `request` as one JSON line
    pub fn record(&self, request: &Request) -> Result<(), SpiderError> {
        let line = serde_json::to_string(request)?;

        let mut recorded = self.lock.lock();
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        *recorded += 1;
        Ok(())
    }

    /// Reads every request recorded in the log at `path`
    ///
    /// A missing file means no failures. Blank lines are ignored.
    pub fn read_requests(path: &Path) -> Result<Vec<Request>, SpiderError> {
        let file = match std::fs::File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut requests = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            requests.push(serde_json::from_str(&line)?);
        }
        Ok(requests)
    }
}
