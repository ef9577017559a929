//! External control over a spider
//!
//! A `SpiderHandle` stays valid while `Spider::run` borrows the spider, so it
//! is how other tasks (a Ctrl-C handler, a monitor) stop the run, feed it
//! requests or read its progress.

use crate::crawler::events::Listeners;
use crate::crawler::progress::Progress;
use crate::model::Request;
use crate::scheduler::Scheduler;
use crate::state::{RunState, Status};
use crate::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// State shared by a spider, its workers and its handles
pub(crate) struct Shared {
    pub(crate) state: RunState,
    pub(crate) scheduler: Arc<dyn Scheduler>,
    pub(crate) listeners: Mutex<Listeners>,
    pub(crate) failed: AtomicU64,
    pub(crate) started_at: Mutex<Option<DateTime<Utc>>>,
    pub(crate) finished_at: Mutex<Option<DateTime<Utc>>>,

    /// Counters frozen before teardown resets the frontier
    pub(crate) final_progress: Mutex<Option<Progress>>,
}

impl Shared {
    pub(crate) fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            state: RunState::new(),
            scheduler,
            listeners: Mutex::new(Listeners::default()),
            failed: AtomicU64::new(0),
            started_at: Mutex::new(None),
            finished_at: Mutex::new(None),
            final_progress: Mutex::new(None),
        }
    }

    /// Fires the closing notification unless it already fired this run
    pub(crate) fn notify_closing(&self) {
        if self.state.take_closing_notification() {
            // Clone so listener callbacks never run under the lock
            let listeners = self.listeners.lock().clone();
            listeners.closing();
        }
    }

    pub(crate) fn progress(&self) -> Progress {
        if let Some(progress) = self.final_progress.lock().clone() {
            return progress;
        }
        Progress {
            left: self.scheduler.left_count(),
            total: self.scheduler.total_count(),
            finished: self.state.finished_count(),
            failed: self.failed.load(Ordering::SeqCst),
            status: self.state.status(),
            started_at: *self.started_at.lock(),
            finished_at: *self.finished_at.lock(),
        }
    }

    /// Ends a run that never started, so waiters are released
    fn abort_before_start(&self, to: Status) -> bool {
        if self.state.transition(Status::Init, to) {
            self.state.exited_token().cancel();
            return true;
        }
        false
    }
}

/// Cloneable control handle for a spider
#[derive(Clone)]
pub struct SpiderHandle {
    shared: Arc<Shared>,
}

impl SpiderHandle {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Requests a graceful stop
    ///
    /// Workers finish the request they hold and exit at their next loop
    /// check. A spider that has not started yet will refuse to run.
    pub fn stop(&self) {
        if self.shared.state.transition(Status::Running, Status::Stopped) {
            tracing::info!("Stop requested");
        } else if self.shared.abort_before_start(Status::Stopped) {
            tracing::info!("Stop requested before the run started");
        }
    }

    /// Forces the run to exit and fires the closing notification immediately
    pub fn exit(&self) {
        if self.shared.state.transition(Status::Running, Status::Exited) {
            tracing::info!("Exit requested");
        } else if !self.shared.abort_before_start(Status::Exited) {
            return;
        }
        self.shared.notify_closing();
    }

    /// Current status
    pub fn status(&self) -> Status {
        self.shared.state.status()
    }

    /// Snapshot of the run's counters
    pub fn progress(&self) -> Progress {
        self.shared.progress()
    }

    /// Pushes a request straight into the frontier
    ///
    /// Returns false if the frontier dropped it as a duplicate.
    pub fn add_request(&self, request: Request) -> Result<bool> {
        Ok(self.shared.scheduler.push(request)?)
    }

    /// Waits until the run has torn everything down
    pub async fn wait_for_exit(&self) {
        self.shared.state.exited_token().cancelled().await;
    }

    /// Requests a stop and waits for every worker to exit
    pub async fn stop_and_wait(&self) {
        self.stop();
        self.wait_for_exit().await;
    }
}
