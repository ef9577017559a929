//! Worker loop and per-request disposition
//!
//! Each worker owns its downloader and loops while the run is `Running`:
//! - claim a request from the frontier (counted as in flight)
//! - download, run page handlers and the processor
//! - requeue, abandon, or spawn follow-ups and feed the pipelines
//! - release the request and sleep the site delay

use crate::crawler::events::Listeners;
use crate::crawler::failure_log::FailureLog;
use crate::crawler::handle::Shared;
use crate::crawler::retry::{apply_cycle_retry, RetryDecision};
use crate::downloader::Downloader;
use crate::model::{CrawlContext, Page, Request};
use crate::pipeline::Pipeline;
use crate::processor::PageProcessor;
use crate::state::RunState;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

/// Backoff between polls of an empty frontier
pub const WAIT_INTERVAL: Duration = Duration::from_millis(10);

/// Empty polls tolerated before a worker may finish the run
pub const DEFAULT_IDLE_PATIENCE: u64 = 20;

/// Observer run on every fetched page before extraction
pub type PageHandler = Arc<dyn Fn(&mut Page) + Send + Sync>;

/// How one polled request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Processed and dispatched to the pipelines
    Completed,

    /// Fetched but marked skip
    Skipped,

    /// Pushed back into the frontier for another attempt
    Retried,

    /// Given up and written to the failure log
    Abandoned,
}

/// Loop settings fixed for the whole run
#[derive(Debug, Clone, Copy)]
pub(crate) struct WorkerSettings {
    pub(crate) thread_num: usize,
    pub(crate) max_depth: u32,
    pub(crate) spawn_urls: bool,
    pub(crate) exit_when_complete: bool,
    pub(crate) idle_patience: u64,
}

/// Everything the workers share for one run
pub(crate) struct Engine {
    pub(crate) shared: Arc<Shared>,
    pub(crate) ctx: CrawlContext,
    pub(crate) processor: Arc<dyn PageProcessor>,
    pub(crate) pipelines: Vec<Arc<dyn Pipeline>>,
    pub(crate) page_handlers: Vec<PageHandler>,
    pub(crate) listeners: Listeners,
    pub(crate) failure_log: Arc<FailureLog>,
    pub(crate) settings: WorkerSettings,
}

impl Engine {
    fn state(&self) -> &RunState {
        &self.shared.state
    }

    /// Handles one claimed request end to end
    pub(crate) async fn handle(&self, mut request: Request, downloader: &mut dyn Downloader) -> Outcome {
        let proxy = self.assign_proxy(&mut request);

        let (outcome, status_code) = match downloader.download(&request, &self.ctx).await {
            Ok(mut page) => {
                let status_code = page.status_code;
                page.request.extras.status_code = status_code;
                page.result_items.request.extras.status_code = status_code;
                (self.on_page(page), status_code)
            }
            Err(e) => {
                tracing::warn!("Failed to download {}: {}", request.url, e);
                let status_code = e.status_code();
                request.extras.status_code = status_code;
                (self.retry_or_abandon(request), status_code)
            }
        };

        if let (Some(proxy), Some(pool)) = (proxy, &self.ctx.proxy_pool) {
            pool.release(&proxy, status_code);
        }

        outcome
    }

    fn assign_proxy(&self, request: &mut Request) -> Option<String> {
        if !self.ctx.site.proxy_pool_enabled {
            return None;
        }
        let proxy = self.ctx.proxy_pool.as_ref()?.acquire()?;
        request.extras.proxy = Some(proxy.clone());
        Some(proxy)
    }

    fn on_page(&self, mut page: Page) -> Outcome {
        if page.skip {
            self.listeners.success(&page.request);
            return Outcome::Skipped;
        }

        for handler in &self.page_handlers {
            handler(&mut page);
        }

        if let Err(e) = self.processor.process(&mut page) {
            tracing::warn!("Failed to process {}: {}", page.request.url, e);
            return self.retry_or_abandon(page.request);
        }

        if page.skip {
            self.listeners.success(&page.request);
            return Outcome::Skipped;
        }

        if page.need_cycle_retry {
            return self.retry_or_abandon(page.request);
        }

        if !page.miss_target_urls {
            self.spawn_follow_ups(&mut page);
        }

        if page.result_items.is_skip() {
            tracing::warn!("Request {} produced no results", page.request.url);
        } else {
            self.dispatch(&page);
        }

        self.listeners.success(&page.request);
        Outcome::Completed
    }

    fn spawn_follow_ups(&self, page: &mut Page) {
        let settings = &self.settings;
        if !settings.spawn_urls || page.request.next_depth() > settings.max_depth {
            return;
        }

        for follow_up in page.take_target_requests() {
            if let Err(e) = self.shared.scheduler.push(follow_up) {
                tracing::warn!(
                    "Failed to push follow-up of {}: {}",
                    page.request.url,
                    e
                );
            }
        }
    }

    /// Feeds the page's results to every pipeline, in registration order
    fn dispatch(&self, page: &Page) {
        for pipeline in &self.pipelines {
            if let Err(e) = pipeline.process(&page.result_items, &self.ctx) {
                tracing::warn!("Pipeline failed for {}: {}", page.request.url, e);
            }
        }
        tracing::debug!("Request {} succeeded", page.request.url);
    }

    fn retry_or_abandon(&self, mut request: Request) -> Outcome {
        match apply_cycle_retry(&mut request, self.ctx.site.cycle_retry_times) {
            RetryDecision::Requeue { attempt } => {
                let url = request.url.clone();
                match self.shared.scheduler.push(request.clone()) {
                    Ok(_) => {
                        tracing::debug!("Requeued {} (attempt {})", url, attempt);
                        Outcome::Retried
                    }
                    Err(e) => {
                        tracing::warn!("Failed to requeue {}: {}", url, e);
                        self.abandon(&request)
                    }
                }
            }
            RetryDecision::Abandon => self.abandon(&request),
        }
    }

    fn abandon(&self, request: &Request) -> Outcome {
        tracing::error!("Request {} failed", request.url);
        if let Err(e) = self.failure_log.record(request) {
            tracing::warn!("Failed to record failed request {}: {}", request.url, e);
        }
        self.shared.failed.fetch_add(1, Ordering::SeqCst);
        self.listeners.failure(request);
        Outcome::Abandoned
    }

    /// Sleeps `duration` unless the run leaves `Running` first
    async fn pause(&self, duration: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.state().shutdown_token().cancelled() => {}
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

/// Runs one worker until the run leaves `Running` or the frontier is exhausted
pub(crate) async fn run_worker(engine: Arc<Engine>, mut downloader: Box<dyn Downloader>, worker_id: usize) {
    let state = engine.state();
    let scheduler = &engine.shared.scheduler;
    let mut idle_polls: u64 = 0;

    tracing::debug!("Worker {} started", worker_id);

    while state.is_running() {
        let request = match state.claim(|| scheduler.poll()) {
            Ok(Some(request)) => request,
            Ok(None) => {
                idle_polls += 1;
                if idle_polls > engine.settings.idle_patience
                    && engine.settings.exit_when_complete
                    && state.try_finish(|| scheduler.left_count() == 0)
                {
                    tracing::info!("Frontier exhausted, worker {} finished the run", worker_id);
                    break;
                }
                engine.pause(WAIT_INTERVAL).await;
                continue;
            }
            Err(e) => {
                tracing::warn!("Worker {} failed to poll the frontier: {}", worker_id, e);
                engine.pause(WAIT_INTERVAL).await;
                continue;
            }
        };

        idle_polls = 0;
        tracing::debug!(
            "Left: {} Total: {} Thread: {}",
            scheduler.left_count(),
            scheduler.total_count(),
            engine.settings.thread_num
        );

        // A panic in any strategy must not leave the request counted in flight
        let claimed = request.clone();
        let outcome = match AssertUnwindSafe(engine.handle(request, downloader.as_mut()))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => {
                tracing::error!(
                    "Worker {} panicked handling {}: {}",
                    worker_id,
                    claimed.url,
                    panic_message(&*panic)
                );
                engine.abandon(&claimed)
            }
        };
        tracing::trace!("Worker {} outcome: {:?}", worker_id, outcome);

        state.increment_finished();
        state.release();

        let sleep_time = engine.ctx.site.sleep_time;
        if !sleep_time.is_zero() {
            engine.pause(sleep_time).await;
        }
    }

    tracing::debug!("Worker {} exited", worker_id);
}
