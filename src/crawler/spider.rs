//! Spider orchestrator
//!
//! A `Spider` is configured while in `Init`, then `run` seeds the frontier,
//! spawns the workers, waits for them and tears every component down. A
//! spider runs once; build a new one to crawl again.

use crate::config::validate_identity;
use crate::crawler::events::SpiderListener;
use crate::crawler::failure_log::FailureLog;
use crate::crawler::handle::{Shared, SpiderHandle};
use crate::crawler::progress::Progress;
use crate::crawler::worker::{
    run_worker, Engine, PageHandler, WorkerSettings, DEFAULT_IDLE_PATIENCE, WAIT_INTERVAL,
};
use crate::downloader::{Downloader, HttpDownloader};
use crate::model::{requests_from_urls, CrawlContext, Page, Request, Site};
use crate::pipeline::{JsonFilePipeline, Pipeline};
use crate::processor::PageProcessor;
use crate::proxy::ProxyPool;
use crate::scheduler::{self, Scheduler};
use crate::state::Status;
use crate::{ConfigError, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;

/// Root directory for per-run data when none is set
pub const DEFAULT_DATA_ROOT: &str = "./data";

/// Crawl orchestrator
pub struct Spider {
    identity: String,
    site: Arc<Site>,
    processor: Arc<dyn PageProcessor>,
    downloader: Option<Box<dyn Downloader>>,
    pipelines: Vec<Arc<dyn Pipeline>>,
    page_handlers: Vec<PageHandler>,
    proxy_pool: Option<Arc<dyn ProxyPool>>,
    start_requests: Vec<Request>,
    data_root: PathBuf,
    failure_log: Arc<FailureLog>,
    thread_num: usize,
    idle_patience: u64,
    max_depth: u32,
    exit_when_complete: bool,
    spawn_urls: bool,
    shared: Arc<Shared>,
}

impl Spider {
    /// Creates a spider for `site`
    ///
    /// # Arguments
    ///
    /// * `identity` - Run identity, restricted to `A-Z a-z 0-9 _ - /`
    /// * `site` - Crawl policy; its start requests seed the frontier
    /// * `processor` - Extraction strategy
    /// * `scheduler` - Frontier
    ///
    /// # Returns
    ///
    /// * `Ok(Spider)` - Spider in `Init`; its data directory is created by `run`
    /// * `Err(SpiderError)` - Invalid identity
    pub fn new(
        identity: impl Into<String>,
        site: Site,
        processor: Arc<dyn PageProcessor>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Result<Self> {
        let identity = identity.into();
        validate_identity(&identity)?;

        let data_root = PathBuf::from(DEFAULT_DATA_ROOT);
        let failure_log = Arc::new(FailureLog::in_dir(&data_root.join(&identity)));

        Ok(Self {
            identity,
            site: Arc::new(site),
            processor,
            downloader: None,
            pipelines: Vec::new(),
            page_handlers: Vec::new(),
            proxy_pool: None,
            start_requests: Vec::new(),
            data_root,
            failure_log,
            thread_num: 1,
            idle_patience: DEFAULT_IDLE_PATIENCE,
            max_depth: u32::MAX,
            exit_when_complete: true,
            spawn_urls: true,
            shared: Arc::new(Shared::new(scheduler)),
        })
    }

    fn ensure_not_running(&self) -> Result<()> {
        if self.shared.state.status() == Status::Running {
            return Err(ConfigError::AlreadyRunning.into());
        }
        Ok(())
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    /// Directory holding this run's failure log and default output
    pub fn data_dir(&self) -> PathBuf {
        self.data_root.join(&self.identity)
    }

    /// Path of the failed request log
    pub fn failure_log_path(&self) -> &Path {
        self.failure_log.path()
    }

    pub fn thread_num(&self) -> usize {
        self.thread_num
    }

    pub fn status(&self) -> Status {
        self.shared.state.status()
    }

    /// Snapshot of the run's counters
    pub fn progress(&self) -> Progress {
        self.shared.progress()
    }

    /// Cloneable handle for stopping or observing the run from other tasks
    pub fn handle(&self) -> SpiderHandle {
        SpiderHandle::new(Arc::clone(&self.shared))
    }

    /// Sets the number of workers
    pub fn set_thread_num(&mut self, thread_num: usize) -> Result<()> {
        self.ensure_not_running()?;
        if thread_num < 1 {
            return Err(ConfigError::InvalidThreadNum(thread_num).into());
        }
        self.thread_num = thread_num;
        Ok(())
    }

    /// Sets how long workers wait on an empty frontier before the run finishes
    ///
    /// The wait is counted in polls of `WAIT_INTERVAL`, so `ms` becomes
    /// `ms / 10` polls.
    pub fn set_empty_sleep_time(&mut self, ms: u64) -> Result<()> {
        self.ensure_not_running()?;
        if ms < crate::config::MIN_EMPTY_SLEEP_TIME_MS {
            return Err(ConfigError::InvalidEmptySleepTime(ms).into());
        }
        self.idle_patience = ms / WAIT_INTERVAL.as_millis() as u64;
        Ok(())
    }

    /// Sets the deepest depth a follow-up request may have
    pub fn set_max_depth(&mut self, max_depth: u32) -> Result<()> {
        self.ensure_not_running()?;
        self.max_depth = max_depth;
        Ok(())
    }

    /// When false, workers keep polling an empty frontier until stopped
    pub fn set_exit_when_complete(&mut self, exit_when_complete: bool) -> Result<()> {
        self.ensure_not_running()?;
        self.exit_when_complete = exit_when_complete;
        Ok(())
    }

    /// When false, follow-up requests found on pages are ignored
    pub fn set_spawn_urls(&mut self, spawn_urls: bool) -> Result<()> {
        self.ensure_not_running()?;
        self.spawn_urls = spawn_urls;
        Ok(())
    }

    /// Sets the prototype downloader; each worker gets its own clone
    pub fn set_downloader(&mut self, downloader: Box<dyn Downloader>) -> Result<()> {
        self.ensure_not_running()?;
        self.downloader = Some(downloader);
        Ok(())
    }

    /// Appends a pipeline; pipelines run in the order they were added
    pub fn add_pipeline(&mut self, pipeline: Arc<dyn Pipeline>) -> Result<()> {
        self.ensure_not_running()?;
        self.pipelines.push(pipeline);
        Ok(())
    }

    pub fn clear_pipelines(&mut self) -> Result<()> {
        self.ensure_not_running()?;
        self.pipelines.clear();
        Ok(())
    }

    /// Adds an observer run on every fetched page before extraction
    pub fn add_page_handler<F>(&mut self, handler: F) -> Result<()>
    where
        F: Fn(&mut Page) + Send + Sync + 'static,
    {
        self.ensure_not_running()?;
        self.page_handlers.push(Arc::new(handler));
        Ok(())
    }

    pub fn add_listener(&mut self, listener: Arc<dyn SpiderListener>) -> Result<()> {
        self.ensure_not_running()?;
        self.shared.listeners.lock().add(listener);
        Ok(())
    }

    /// Attaches a proxy pool, used when the site enables it
    pub fn set_proxy_pool(&mut self, pool: Arc<dyn ProxyPool>) -> Result<()> {
        self.ensure_not_running()?;
        self.proxy_pool = Some(pool);
        Ok(())
    }

    /// Adds seed URLs at depth 1; unparseable ones are skipped with a warning
    pub fn add_start_urls<I, S>(&mut self, urls: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ensure_not_running()?;
        self.start_requests.extend(requests_from_urls(urls, 1));
        Ok(())
    }

    /// Replaces the extra seed requests
    pub fn set_start_requests(&mut self, requests: Vec<Request>) -> Result<()> {
        self.ensure_not_running()?;
        self.start_requests = requests;
        Ok(())
    }

    /// Moves the data directory to `<root>/<identity>`
    pub fn set_data_root(&mut self, root: impl Into<PathBuf>) -> Result<()> {
        self.ensure_not_running()?;
        let data_root = root.into();
        self.failure_log = Arc::new(FailureLog::in_dir(&data_root.join(&self.identity)));
        self.data_root = data_root;
        Ok(())
    }

    /// Pushes a request straight into the frontier
    pub fn add_request(&self, request: Request) -> Result<bool> {
        Ok(self.shared.scheduler.push(request)?)
    }

    fn context(&self) -> CrawlContext {
        let mut ctx = CrawlContext::new(self.identity.clone(), Arc::clone(&self.site), self.data_dir());
        if self.site.proxy_pool_enabled {
            ctx.proxy_pool = self.proxy_pool.clone();
        }
        ctx
    }

    /// Runs the crawl to a terminal status
    ///
    /// This is the core crawling logic that:
    /// 1. Initializes the frontier, downloader and pipelines
    /// 2. Seeds the frontier with the start requests
    /// 3. Spawns `thread_num` workers and waits for all of them
    /// 4. Tears every component down, each failure isolated
    ///
    /// # Returns
    ///
    /// * `Ok(Status)` - The terminal status the run reached
    /// * `Err(SpiderError)` - The run could not start
    pub async fn run(&mut self) -> Result<Status> {
        match self.shared.state.status() {
            Status::Init => {}
            Status::Running => return Err(ConfigError::AlreadyRunning.into()),
            _ => return Err(ConfigError::AlreadyRan.into()),
        }

        let ctx = self.context();
        std::fs::create_dir_all(&ctx.data_dir)?;
        let frontier = Arc::clone(&self.shared.scheduler);
        frontier.init(&ctx)?;

        let mut downloader = match self.downloader.take() {
            Some(downloader) => downloader,
            None => Box::new(HttpDownloader::new(&self.site)?),
        };
        downloader.set_thread_num(self.thread_num);

        if self.pipelines.is_empty() {
            self.pipelines
                .push(Arc::new(JsonFilePipeline::in_dir(&ctx.data_dir)));
        }

        let mut seeds = self.site.start_requests.clone();
        seeds.append(&mut self.start_requests);
        // Seeds replayed from a failure log carry their old attempt state
        seeds.iter_mut().for_each(Request::clear_attempt_state);
        let seeded = scheduler::seed(frontier.as_ref(), seeds)?;

        if !self.shared.state.transition(Status::Init, Status::Running) {
            self.downloader = Some(downloader);
            return Err(ConfigError::AlreadyRan.into());
        }
        *self.shared.started_at.lock() = Some(Utc::now());

        tracing::info!(
            "Spider {} started with {} workers, {} seed requests",
            self.identity,
            self.thread_num,
            seeded
        );

        let engine = Arc::new(Engine {
            shared: Arc::clone(&self.shared),
            ctx,
            processor: Arc::clone(&self.processor),
            pipelines: self.pipelines.clone(),
            page_handlers: self.page_handlers.clone(),
            listeners: self.shared.listeners.lock().clone(),
            failure_log: Arc::clone(&self.failure_log),
            settings: WorkerSettings {
                thread_num: self.thread_num,
                max_depth: self.max_depth,
                spawn_urls: self.spawn_urls,
                exit_when_complete: self.exit_when_complete,
                idle_patience: self.idle_patience,
            },
        });

        let mut workers = JoinSet::new();
        for worker_id in 0..self.thread_num {
            workers.spawn(run_worker(Arc::clone(&engine), downloader.clone_box(), worker_id));
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Worker task failed: {}", e);
            }
        }

        // Every worker died without a terminal transition
        if self.shared.state.transition(Status::Running, Status::Stopped) {
            tracing::warn!("All workers exited while the run was still running");
        }

        *self.shared.finished_at.lock() = Some(Utc::now());
        let progress = self.shared.progress();
        *self.shared.final_progress.lock() = Some(progress.clone());

        self.teardown(&engine, downloader.as_ref());
        self.downloader = Some(downloader);

        self.shared.notify_closing();
        self.shared.state.exited_token().cancel();

        tracing::info!("Spider {} {}", self.identity, progress);
        Ok(progress.status)
    }

    fn teardown(&self, engine: &Engine, downloader: &dyn Downloader) {
        for pipeline in &engine.pipelines {
            if let Err(e) = pipeline.close() {
                tracing::warn!("Failed to close pipeline: {}", e);
            }
        }

        let scheduler = &self.shared.scheduler;
        if let Err(e) = scheduler.reset_duplicate_check() {
            tracing::warn!("Failed to reset duplicate check: {}", e);
        }
        if let Err(e) = scheduler.close() {
            tracing::warn!("Failed to close scheduler: {}", e);
        }

        if let Err(e) = engine.processor.close() {
            tracing::warn!("Failed to close processor: {}", e);
        }

        if let Err(e) = downloader.close() {
            tracing::warn!("Failed to close downloader: {}", e);
        }
    }
}
