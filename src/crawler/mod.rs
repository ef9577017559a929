//! Crawler module: the orchestrator and its worker pool
//!
//! This module composes the frontier, downloader, processor and pipelines
//! into one run, including:
//! - The `Spider` lifecycle (Init → Running → Stopped/Finished/Exited)
//! - The worker loop with in-flight-aware exhaustion detection
//! - The cycle-retry policy and the failed request log
//! - Run listeners, progress snapshots and the external `SpiderHandle`

mod events;
mod failure_log;
mod handle;
mod progress;
mod retry;
mod spider;
mod worker;

pub use events::SpiderListener;
pub use failure_log::{FailureLog, FAILURE_LOG_FILE_NAME};
pub use handle::SpiderHandle;
pub use progress::Progress;
pub use retry::{apply_cycle_retry, RetryDecision};
pub use spider::{Spider, DEFAULT_DATA_ROOT};
pub use worker::{Outcome, PageHandler, DEFAULT_IDLE_PATIENCE, WAIT_INTERVAL};
