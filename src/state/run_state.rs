/// Run state shared between the orchestrator, its workers and external handles
///
/// The status lives in an atomic so every worker can check it at the top of
/// each loop iteration without locking.
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use tokio_util::sync::CancellationToken;

/// Lifecycle status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    // ===== Configuration phase =====
    /// Spider is being configured and has not started
    Init,

    // ===== Active =====
    /// Workers are polling the frontier
    Running,

    // ===== Terminal =====
    /// An explicit stop was requested
    Stopped,

    /// The frontier was exhausted and exit-on-completion is enabled
    Finished,

    /// An external interrupt forced the run to exit
    Exited,
}

impl Status {
    /// Returns true if the run has left `Running` for good
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Finished | Self::Exited)
    }

    fn to_u8(self) -> u8 {
        match self {
            Self::Init => 0,
            Self::Running => 1,
            Self::Stopped => 2,
            Self::Finished => 3,
            Self::Exited => 4,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Init,
            1 => Self::Running,
            2 => Self::Stopped,
            3 => Self::Finished,
            _ => Self::Exited,
        }
    }

    /// Converts the status to a lowercase string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Finished => "finished",
            Self::Exited => "exited",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Synchronized state of one run
pub struct RunState {
    status: AtomicU8,
    finished_count: AtomicU64,

    /// Requests currently held by workers. Claiming a polled request and the
    /// exhaustion check take this lock, so exhaustion is only declared when
    /// no worker can still push follow-ups.
    in_flight: Mutex<usize>,

    /// Cancelled by stop/exit; interrupts idle and delay sleeps
    shutdown: CancellationToken,

    /// Cancelled once teardown has completed
    exited: CancellationToken,

    closing_notified: AtomicBool,
}

impl RunState {
    /// Creates a state in `Init`
    pub fn new() -> Self {
        Self {
            status: AtomicU8::new(Status::Init.to_u8()),
            finished_count: AtomicU64::new(0),
            in_flight: Mutex::new(0),
            shutdown: CancellationToken::new(),
            exited: CancellationToken::new(),
            closing_notified: AtomicBool::new(false),
        }
    }

    /// Current status
    pub fn status(&self) -> Status {
        Status::from_u8(self.status.load(Ordering::SeqCst))
    }

    /// Returns true while workers should keep looping
    pub fn is_running(&self) -> bool {
        self.status() == Status::Running
    }

    /// Moves from `from` to `to`; returns false if the status was not `from`
    pub fn transition(&self, from: Status, to: Status) -> bool {
        let changed = self
            .status
            .compare_exchange(from.to_u8(), to.to_u8(), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();

        if changed && to.is_terminal() {
            self.shutdown.cancel();
        }
        changed
    }

    /// Number of requests the workers have finished handling
    pub fn finished_count(&self) -> u64 {
        self.finished_count.load(Ordering::SeqCst)
    }

    pub(crate) fn increment_finished(&self) -> u64 {
        self.finished_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Runs `poll` and, if it yields a request, counts it as in flight
    pub(crate) fn claim<T, E>(
        &self,
        poll: impl FnOnce() -> Result<Option<T>, E>,
    ) -> Result<Option<T>, E> {
        let mut in_flight = self.in_flight.lock();
        let claimed = poll()?;
        if claimed.is_some() {
            *in_flight += 1;
        }
        Ok(claimed)
    }

    /// Releases a request previously counted by `claim`
    pub(crate) fn release(&self) {
        let mut in_flight = self.in_flight.lock();
        *in_flight = in_flight.saturating_sub(1);
    }

    /// Moves `Running` to `Finished` if nothing is in flight and `frontier_empty` holds
    pub(crate) fn try_finish(&self, frontier_empty: impl FnOnce() -> bool) -> bool {
        let in_flight = self.in_flight.lock();
        *in_flight == 0 && frontier_empty() && self.transition(Status::Running, Status::Finished)
    }

    /// Number of requests currently held by workers
    pub fn in_flight(&self) -> usize {
        *self.in_flight.lock()
    }

    /// Token cancelled when the run leaves `Running`
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Token cancelled once teardown has completed
    pub fn exited_token(&self) -> &CancellationToken {
        &self.exited
    }

    /// Returns true exactly once per run; gates the closing notification
    pub(crate) fn take_closing_notification(&self) -> bool {
        !self.closing_notified.swap(true, Ordering::SeqCst)
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}
