//! Progress snapshots
//!
//! Counters are read from the frontier and the run state while workers keep
//! running, so a snapshot is only consistent per field.

use crate::state::Status;
use chrono::{DateTime, Utc};
use std::fmt;

/// Point-in-time view of a run
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    /// Requests waiting in the frontier
    pub left: usize,

    /// Distinct requests the frontier has accepted
    pub total: usize,

    /// Requests the workers have finished handling
    pub finished: u64,

    /// Requests written to the failure log
    pub failed: u64,

    /// Current status
    pub status: Status,

    /// When the run started
    pub started_at: Option<DateTime<Utc>>,

    /// When the run left `Running`
    pub finished_at: Option<DateTime<Utc>>,
}

impl Progress {
    /// Wall-clock duration of the run so far, in seconds
    pub fn elapsed_seconds(&self) -> Option<i64> {
        let started = self.started_at?;
        let end = self.finished_at.unwrap_or_else(Utc::now);
        Some((end - started).num_seconds())
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Status: {} Left: {} Total: {} Finished: {} Failed: {}",
            self.status, self.left, self.total, self.finished, self.failed
        )?;
        if let Some(seconds) = self.elapsed_seconds() {
            write!(f, " Elapsed: {}s", seconds)?;
        }
        Ok(())
    }
}
