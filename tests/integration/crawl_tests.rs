use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use sumi_spider::crawler::{FailureLog, Spider, SpiderListener};
use sumi_spider::downloader::{DownloadError, DownloadResult, Downloader};
use sumi_spider::pipeline::{CollectorPipeline, Pipeline, PipelineError, PipelineResult};
use sumi_spider::processor::{PageProcessor, ProcessError, ProcessResult};
use sumi_spider::scheduler::{QueueScheduler, Scheduler, SchedulerError, SchedulerResult};
use sumi_spider::{CrawlContext, Page, Request, ResultItems, Site, Status};
use tempfile::TempDir;
use tokio::sync::Semaphore;

const BASE: &str = "https://crawl.test";

fn url(path: &str) -> String {
    format!("{}/{}", BASE, path)
}

fn seeds(paths: &[&str]) -> Vec<Request> {
    paths
        .iter()
        .map(|path| Request::parse(&url(path), 1).unwrap())
        .collect()
}

/// Downloader that fails a configured number of times per URL
#[derive(Clone, Default)]
struct ScriptedDownloader {
    failures_left: Arc<Mutex<HashMap<String, u32>>>,
    fetched: Arc<Mutex<Vec<String>>>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedDownloader {
    fn failing(self, path: &str, times: u32) -> Self {
        self.failures_left.lock().insert(url(path), times);
        self
    }

    fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    fn fetched(&self) -> Vec<String> {
        self.fetched.lock().clone()
    }

    fn fetch_count(&self, path: &str) -> usize {
        let target = url(path);
        self.fetched.lock().iter().filter(|u| **u == target).count()
    }
}

#[async_trait]
impl Downloader for ScriptedDownloader {
    async fn download(&mut self, request: &Request, _ctx: &CrawlContext) -> DownloadResult<Page> {
        let target = request.url.to_string();
        self.fetched.lock().push(target.clone());

        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.map_err(|e| DownloadError::Other {
                url: target.clone(),
                message: e.to_string(),
            })?;
        }

        let fail = {
            let mut failures = self.failures_left.lock();
            match failures.get_mut(&target) {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    true
                }
                _ => false,
            }
        };
        if fail {
            return Err(DownloadError::Other {
                url: target,
                message: "scripted failure".to_string(),
            });
        }

        let mut page = Page::new(request.clone(), "text/html").with_content(target);
        page.status_code = Some(200);
        Ok(page)
    }

    fn clone_box(&self) -> Box<dyn Downloader> {
        Box::new(self.clone())
    }
}

/// Processor that records the URL and emits scripted follow-up paths
#[derive(Default)]
struct LinkGraphProcessor {
    links: HashMap<String, Vec<String>>,
}

impl LinkGraphProcessor {
    fn link(mut self, from: &str, to: &str) -> Self {
        self.links.entry(url(from)).or_default().push(url(to));
        self
    }
}

impl PageProcessor for LinkGraphProcessor {
    fn process(&self, page: &mut Page) -> ProcessResult<()> {
        let current = page.request.url.to_string();
        page.result_items.put("url", current.clone());

        for target in self.links.get(&current).into_iter().flatten() {
            page.add_target_url(target)
                .map_err(|e| ProcessError::Extraction {
                    url: current.clone(),
                    message: e.to_string(),
                })?;
        }
        Ok(())
    }
}

/// Frontier that counts cycle-retry pushes
struct CountingScheduler {
    inner: QueueScheduler,
    retry_pushes: AtomicUsize,
}

impl CountingScheduler {
    fn new() -> Self {
        Self {
            inner: QueueScheduler::new(),
            retry_pushes: AtomicUsize::new(0),
        }
    }
}

impl Scheduler for CountingScheduler {
    fn push(&self, request: Request) -> SchedulerResult<bool> {
        if request.is_cycle_retry() {
            self.retry_pushes.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.push(request)
    }

    fn poll(&self) -> SchedulerResult<Option<Request>> {
        self.inner.poll()
    }

    fn left_count(&self) -> usize {
        self.inner.left_count()
    }

    fn total_count(&self) -> usize {
        self.inner.total_count()
    }
}

#[derive(Default)]
struct EventCounter {
    success: AtomicUsize,
    failure: AtomicUsize,
    closing: AtomicUsize,
}

impl SpiderListener for EventCounter {
    fn on_success(&self, _request: &Request) {
        self.success.fetch_add(1, Ordering::SeqCst);
    }

    fn on_failure(&self, _request: &Request) {
        self.failure.fetch_add(1, Ordering::SeqCst);
    }

    fn on_closing(&self) {
        self.closing.fetch_add(1, Ordering::SeqCst);
    }
}

/// Pipeline that appends `name` and the URL to a shared journal
struct JournalPipeline {
    name: &'static str,
    journal: Arc<Mutex<Vec<(&'static str, String)>>>,
}

impl Pipeline for JournalPipeline {
    fn process(&self, items: &ResultItems, _ctx: &CrawlContext) -> PipelineResult<()> {
        self.journal
            .lock()
            .push((self.name, items.request.url.to_string()));
        Ok(())
    }
}

fn build_spider(
    dir: &TempDir,
    identity: &str,
    site: Site,
    processor: LinkGraphProcessor,
    scheduler: Arc<dyn Scheduler>,
    downloader: &ScriptedDownloader,
) -> Spider {
    let mut spider = Spider::new(identity, site, Arc::new(processor), scheduler).unwrap();
    spider.set_data_root(dir.path()).unwrap();
    spider
        .set_downloader(Box::new(downloader.clone()))
        .unwrap();
    spider
}

fn urls_of(collector: &CollectorPipeline) -> Vec<String> {
    let mut urls: Vec<String> = collector
        .collected()
        .iter()
        .map(|items| items.request.url.to_string())
        .collect();
    urls.sort();
    urls
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_zero_seeds_finishes_without_fetching() {
    let dir = TempDir::new().unwrap();
    let downloader = ScriptedDownloader::default();
    let mut spider = build_spider(
        &dir,
        "empty",
        Site::default(),
        LinkGraphProcessor::default(),
        Arc::new(QueueScheduler::new()),
        &downloader,
    );
    spider.set_thread_num(3).unwrap();

    let started = Instant::now();
    let status = spider.run().await.unwrap();

    assert_eq!(status, Status::Finished);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(downloader.fetched().is_empty());
    assert_eq!(spider.progress().finished, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_follow_ups_stop_at_max_depth() {
    let dir = TempDir::new().unwrap();
    let downloader = ScriptedDownloader::default();
    let processor = LinkGraphProcessor::default().link("a", "d").link("d", "e");
    let site = Site {
        start_requests: seeds(&["a", "b", "c"]),
        ..Site::default()
    };

    let mut spider = build_spider(
        &dir,
        "depth",
        site,
        processor,
        Arc::new(QueueScheduler::new()),
        &downloader,
    );
    let collector = Arc::new(CollectorPipeline::new());
    spider.add_pipeline(collector.clone()).unwrap();
    spider.set_thread_num(2).unwrap();
    spider.set_max_depth(2).unwrap();

    assert_eq!(spider.run().await.unwrap(), Status::Finished);

    assert_eq!(
        urls_of(&collector),
        vec![url("a"), url("b"), url("c"), url("d")]
    );
    assert_eq!(downloader.fetch_count("e"), 0);

    let progress = spider.progress();
    assert_eq!(progress.total, 4);
    assert_eq!(progress.finished, 4);
    assert_eq!(progress.left, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_transient_failures_heal_through_cycle_retry() {
    let dir = TempDir::new().unwrap();
    let downloader = ScriptedDownloader::default().failing("flaky", 2);
    let scheduler = Arc::new(CountingScheduler::new());
    let site = Site {
        start_requests: seeds(&["flaky"]),
        cycle_retry_times: 3,
        ..Site::default()
    };

    let mut spider = build_spider(
        &dir,
        "retry",
        site,
        LinkGraphProcessor::default(),
        scheduler.clone(),
        &downloader,
    );
    let collector = Arc::new(CollectorPipeline::new());
    let events = Arc::new(EventCounter::default());
    spider.add_pipeline(collector.clone()).unwrap();
    spider.add_listener(events.clone()).unwrap();

    assert_eq!(spider.run().await.unwrap(), Status::Finished);

    assert_eq!(scheduler.retry_pushes.load(Ordering::SeqCst), 2);
    assert_eq!(downloader.fetch_count("flaky"), 3);
    assert_eq!(collector.len(), 1);
    assert_eq!(events.success.load(Ordering::SeqCst), 1);
    assert_eq!(events.failure.load(Ordering::SeqCst), 0);
    assert!(FailureLog::read_requests(spider.failure_log_path())
        .unwrap()
        .is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_exhausted_retries_recorded_once() {
    let dir = TempDir::new().unwrap();
    let downloader = ScriptedDownloader::default().failing("broken", u32::MAX);
    let scheduler = Arc::new(CountingScheduler::new());
    let site = Site {
        start_requests: seeds(&["broken", "fine"]),
        cycle_retry_times: 3,
        ..Site::default()
    };

    let mut spider = build_spider(
        &dir,
        "abandon",
        site,
        LinkGraphProcessor::default(),
        scheduler.clone(),
        &downloader,
    );
    let events = Arc::new(EventCounter::default());
    spider.add_listener(events.clone()).unwrap();
    spider.set_thread_num(2).unwrap();

    assert_eq!(spider.run().await.unwrap(), Status::Finished);

    assert_eq!(downloader.fetch_count("broken"), 3);
    assert_eq!(scheduler.retry_pushes.load(Ordering::SeqCst), 2);
    assert_eq!(events.failure.load(Ordering::SeqCst), 1);
    assert_eq!(spider.progress().failed, 1);

    let failed = FailureLog::read_requests(spider.failure_log_path()).unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].url.as_str(), url("broken"));
    assert_eq!(failed[0].extras.cycle_tried_times, Some(2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_waits_for_in_flight_fetches() {
    let dir = TempDir::new().unwrap();
    let gate = Arc::new(Semaphore::new(0));
    let downloader = ScriptedDownloader::default().gated(Arc::clone(&gate));
    let site = Site {
        start_requests: seeds(&["one", "two", "three", "four"]),
        ..Site::default()
    };

    let mut spider = build_spider(
        &dir,
        "stop",
        site,
        LinkGraphProcessor::default(),
        Arc::new(QueueScheduler::new()),
        &downloader,
    );
    spider.set_thread_num(2).unwrap();
    spider.set_exit_when_complete(false).unwrap();
    let handle = spider.handle();

    let run = tokio::spawn(async move {
        let status = spider.run().await;
        (spider, status)
    });

    let deadline = Instant::now() + Duration::from_secs(5);
    while downloader.fetched().len() < 2 {
        assert!(Instant::now() < deadline, "workers never started fetching");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    handle.stop();
    assert_eq!(handle.status(), Status::Stopped);

    // Both fetches are still blocked, so teardown cannot have happened yet
    let early = tokio::time::timeout(Duration::from_millis(100), handle.wait_for_exit()).await;
    assert!(early.is_err());
    assert!(!run.is_finished());

    gate.add_permits(2);
    let (spider, status) = run.await.unwrap();

    assert_eq!(status.unwrap(), Status::Stopped);
    assert_eq!(downloader.fetched().len(), 2);
    let progress = spider.progress();
    assert_eq!(progress.finished, 2);
    assert_eq!(progress.left, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pipelines_run_in_registration_order() {
    let dir = TempDir::new().unwrap();
    let downloader = ScriptedDownloader::default();
    let site = Site {
        start_requests: seeds(&["x", "y", "z"]),
        ..Site::default()
    };

    let mut spider = build_spider(
        &dir,
        "ordering",
        site,
        LinkGraphProcessor::default(),
        Arc::new(QueueScheduler::new()),
        &downloader,
    );
    let journal = Arc::new(Mutex::new(Vec::new()));
    for name in ["first", "second"] {
        spider
            .add_pipeline(Arc::new(JournalPipeline {
                name,
                journal: Arc::clone(&journal),
            }))
            .unwrap();
    }
    spider.set_thread_num(3).unwrap();

    assert_eq!(spider.run().await.unwrap(), Status::Finished);

    let journal = journal.lock();
    assert_eq!(journal.len(), 6);
    for path in ["x", "y", "z"] {
        let target = url(path);
        let positions: Vec<(usize, &str)> = journal
            .iter()
            .enumerate()
            .filter(|(_, (_, u))| *u == target)
            .map(|(i, (name, _))| (i, *name))
            .collect();
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0].1, "first");
        assert_eq!(positions[1].1, "second");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_duplicates_never_fetched_twice() {
    let dir = TempDir::new().unwrap();
    let downloader = ScriptedDownloader::default();
    let processor = LinkGraphProcessor::default()
        .link("a", "b")
        .link("b", "a")
        .link("b", "c")
        .link("c", "a");
    let site = Site {
        start_requests: seeds(&["a", "a", "b"]),
        ..Site::default()
    };

    let mut spider = build_spider(
        &dir,
        "dedupe",
        site,
        processor,
        Arc::new(QueueScheduler::new()),
        &downloader,
    );
    spider.set_thread_num(3).unwrap();

    assert_eq!(spider.run().await.unwrap(), Status::Finished);

    let mut fetched = downloader.fetched();
    fetched.sort();
    assert_eq!(fetched, vec![url("a"), url("b"), url("c")]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_replaying_failure_log_as_fresh_run() {
    let dir = TempDir::new().unwrap();

    let broken = ScriptedDownloader::default().failing("later", u32::MAX);
    let site = Site {
        start_requests: seeds(&["later"]),
        cycle_retry_times: 3,
        ..Site::default()
    };
    let mut first = build_spider(
        &dir,
        "replay",
        site,
        LinkGraphProcessor::default(),
        Arc::new(QueueScheduler::new()),
        &broken,
    );
    assert_eq!(first.run().await.unwrap(), Status::Finished);

    let failed = FailureLog::read_requests(first.failure_log_path()).unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].extras.cycle_tried_times, Some(2));

    // Same budget as the first run, so the replay must heal after two failures
    let flaky = ScriptedDownloader::default().failing("later", 2);
    let scheduler = Arc::new(CountingScheduler::new());
    let site = Site {
        cycle_retry_times: 3,
        ..Site::default()
    };
    let mut second = build_spider(
        &dir,
        "replay-2",
        site,
        LinkGraphProcessor::default(),
        scheduler.clone(),
        &flaky,
    );
    second.set_start_requests(failed).unwrap();
    let collector = Arc::new(CollectorPipeline::new());
    second.add_pipeline(collector.clone()).unwrap();

    assert_eq!(second.run().await.unwrap(), Status::Finished);
    assert_eq!(flaky.fetch_count("later"), 3);
    assert_eq!(scheduler.retry_pushes.load(Ordering::SeqCst), 2);
    assert_eq!(urls_of(&collector), vec![url("later")]);
    assert_eq!(second.progress().failed, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_replayed_seeds_are_deduplicated() {
    let dir = TempDir::new().unwrap();
    let downloader = ScriptedDownloader::default();

    let mut stale = Request::parse(&url("again"), 1).unwrap();
    stale.extras.cycle_tried_times = Some(2);
    stale.extras.proxy = Some("http://10.0.0.1:8080".to_string());
    stale.extras.status_code = Some(500);

    let mut spider = build_spider(
        &dir,
        "replay-dedupe",
        Site::default(),
        LinkGraphProcessor::default(),
        Arc::new(QueueScheduler::new()),
        &downloader,
    );
    spider
        .set_start_requests(vec![stale.clone(), stale])
        .unwrap();
    let collector = Arc::new(CollectorPipeline::new());
    spider.add_pipeline(collector.clone()).unwrap();

    assert_eq!(spider.run().await.unwrap(), Status::Finished);

    assert_eq!(downloader.fetch_count("again"), 1);
    let collected = collector.collected();
    assert_eq!(collected.len(), 1);
    assert_eq!(collected[0].request.extras.cycle_tried_times, None);
    assert_eq!(collected[0].request.extras.proxy, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_exit_fires_closing_immediately() {
    let dir = TempDir::new().unwrap();
    let downloader = ScriptedDownloader::default();
    let mut spider = build_spider(
        &dir,
        "exit",
        Site::default(),
        LinkGraphProcessor::default(),
        Arc::new(QueueScheduler::new()),
        &downloader,
    );
    spider.set_exit_when_complete(false).unwrap();
    let events = Arc::new(EventCounter::default());
    spider.add_listener(events.clone()).unwrap();
    let handle = spider.handle();

    let run = tokio::spawn(async move { spider.run().await });

    let deadline = Instant::now() + Duration::from_secs(5);
    while handle.status() != Status::Running {
        assert!(Instant::now() < deadline, "spider never started");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    handle.exit();
    assert_eq!(events.closing.load(Ordering::SeqCst), 1);

    assert_eq!(run.await.unwrap().unwrap(), Status::Exited);
    assert_eq!(events.closing.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_requests_added_while_running_are_crawled() {
    let dir = TempDir::new().unwrap();
    let downloader = ScriptedDownloader::default();
    let mut spider = build_spider(
        &dir,
        "live",
        Site::default(),
        LinkGraphProcessor::default(),
        Arc::new(QueueScheduler::new()),
        &downloader,
    );
    spider.set_exit_when_complete(false).unwrap();
    let handle = spider.handle();

    let run = tokio::spawn(async move { spider.run().await });

    assert!(handle
        .add_request(Request::parse(&url("late"), 1).unwrap())
        .unwrap());

    let deadline = Instant::now() + Duration::from_secs(5);
    while handle.progress().finished < 1 {
        assert!(Instant::now() < deadline, "late request never handled");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    handle.stop_and_wait().await;
    assert_eq!(run.await.unwrap().unwrap(), Status::Stopped);
    assert_eq!(downloader.fetch_count("late"), 1);
}

/// Names of the components closed at teardown, in order
#[derive(Clone, Default)]
struct CloseLog(Arc<Mutex<Vec<&'static str>>>);

impl CloseLog {
    fn record(&self, name: &'static str) {
        self.0.lock().push(name);
    }

    fn names(&self) -> Vec<&'static str> {
        self.0.lock().clone()
    }
}

/// Sink that rejects every result and fails to close
struct BrokenPipeline {
    closes: CloseLog,
}

impl Pipeline for BrokenPipeline {
    fn process(&self, _items: &ResultItems, _ctx: &CrawlContext) -> PipelineResult<()> {
        Err(PipelineError::Write("disk full".to_string()))
    }

    fn close(&self) -> PipelineResult<()> {
        self.closes.record("broken-pipeline");
        Err(PipelineError::Write("disk full".to_string()))
    }
}

/// Collector that records its close
struct ClosingCollector {
    inner: Arc<CollectorPipeline>,
    closes: CloseLog,
}

impl Pipeline for ClosingCollector {
    fn process(&self, items: &ResultItems, ctx: &CrawlContext) -> PipelineResult<()> {
        self.inner.process(items, ctx)
    }

    fn close(&self) -> PipelineResult<()> {
        self.closes.record("collector");
        Ok(())
    }
}

/// Frontier whose teardown calls all fail
struct BrokenCloseScheduler {
    inner: QueueScheduler,
    closes: CloseLog,
}

impl Scheduler for BrokenCloseScheduler {
    fn push(&self, request: Request) -> SchedulerResult<bool> {
        self.inner.push(request)
    }

    fn poll(&self) -> SchedulerResult<Option<Request>> {
        self.inner.poll()
    }

    fn left_count(&self) -> usize {
        self.inner.left_count()
    }

    fn total_count(&self) -> usize {
        self.inner.total_count()
    }

    fn reset_duplicate_check(&self) -> SchedulerResult<()> {
        self.closes.record("reset-duplicate-check");
        Err(SchedulerError::Backend("connection lost".to_string()))
    }

    fn close(&self) -> SchedulerResult<()> {
        self.closes.record("scheduler");
        Err(SchedulerError::Closed)
    }
}

/// Processor that fails to close
struct BrokenCloseProcessor {
    inner: LinkGraphProcessor,
    closes: CloseLog,
}

impl PageProcessor for BrokenCloseProcessor {
    fn process(&self, page: &mut Page) -> ProcessResult<()> {
        self.inner.process(page)
    }

    fn close(&self) -> ProcessResult<()> {
        self.closes.record("processor");
        Err(ProcessError::Extraction {
            url: BASE.to_string(),
            message: "model unloaded twice".to_string(),
        })
    }
}

/// Downloader that fails to close
#[derive(Clone)]
struct BrokenCloseDownloader {
    inner: ScriptedDownloader,
    closes: CloseLog,
}

#[async_trait]
impl Downloader for BrokenCloseDownloader {
    async fn download(&mut self, request: &Request, ctx: &CrawlContext) -> DownloadResult<Page> {
        self.inner.download(request, ctx).await
    }

    fn clone_box(&self) -> Box<dyn Downloader> {
        Box::new(self.clone())
    }

    fn close(&self) -> DownloadResult<()> {
        self.closes.record("downloader");
        Err(DownloadError::Other {
            url: BASE.to_string(),
            message: "pool already shut".to_string(),
        })
    }
}

/// Processor that panics on one URL and records the rest
struct TrippingProcessor {
    trip: String,
}

impl PageProcessor for TrippingProcessor {
    fn process(&self, page: &mut Page) -> ProcessResult<()> {
        let current = page.request.url.to_string();
        if current == self.trip {
            panic!("cannot extract {}", current);
        }
        page.result_items.put("url", current);
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failing_sink_does_not_block_later_sinks() {
    let dir = TempDir::new().unwrap();
    let downloader = ScriptedDownloader::default();
    let site = Site {
        start_requests: seeds(&["p", "q"]),
        ..Site::default()
    };
    let mut spider = build_spider(
        &dir,
        "sink-isolation",
        site,
        LinkGraphProcessor::default(),
        Arc::new(QueueScheduler::new()),
        &downloader,
    );
    let closes = CloseLog::default();
    let journal = Arc::new(Mutex::new(Vec::new()));
    spider
        .add_pipeline(Arc::new(BrokenPipeline {
            closes: closes.clone(),
        }))
        .unwrap();
    spider
        .add_pipeline(Arc::new(JournalPipeline {
            name: "healthy",
            journal: Arc::clone(&journal),
        }))
        .unwrap();
    let events = Arc::new(EventCounter::default());
    spider.add_listener(events.clone()).unwrap();

    assert_eq!(spider.run().await.unwrap(), Status::Finished);

    let mut reached: Vec<String> = journal.lock().iter().map(|(_, u)| u.clone()).collect();
    reached.sort();
    assert_eq!(reached, vec![url("p"), url("q")]);
    assert_eq!(events.success.load(Ordering::SeqCst), 2);
    assert_eq!(spider.progress().failed, 0);
    assert!(FailureLog::read_requests(spider.failure_log_path())
        .unwrap()
        .is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_teardown_failures_are_isolated() {
    let dir = TempDir::new().unwrap();
    let closes = CloseLog::default();
    let downloader = BrokenCloseDownloader {
        inner: ScriptedDownloader::default(),
        closes: closes.clone(),
    };
    let site = Site {
        start_requests: seeds(&["only"]),
        ..Site::default()
    };
    let processor = BrokenCloseProcessor {
        inner: LinkGraphProcessor::default(),
        closes: closes.clone(),
    };
    let scheduler = BrokenCloseScheduler {
        inner: QueueScheduler::new(),
        closes: closes.clone(),
    };

    let mut spider =
        Spider::new("teardown", site, Arc::new(processor), Arc::new(scheduler)).unwrap();
    spider.set_data_root(dir.path()).unwrap();
    spider.set_downloader(Box::new(downloader)).unwrap();
    let collector = Arc::new(CollectorPipeline::new());
    spider
        .add_pipeline(Arc::new(BrokenPipeline {
            closes: closes.clone(),
        }))
        .unwrap();
    spider
        .add_pipeline(Arc::new(ClosingCollector {
            inner: Arc::clone(&collector),
            closes: closes.clone(),
        }))
        .unwrap();
    let events = Arc::new(EventCounter::default());
    spider.add_listener(events.clone()).unwrap();
    let handle = spider.handle();

    assert_eq!(spider.run().await.unwrap(), Status::Finished);

    assert_eq!(
        closes.names(),
        vec![
            "broken-pipeline",
            "collector",
            "reset-duplicate-check",
            "scheduler",
            "processor",
            "downloader",
        ]
    );
    assert_eq!(collector.len(), 1);
    assert_eq!(events.closing.load(Ordering::SeqCst), 1);
    tokio::time::timeout(Duration::from_secs(1), handle.wait_for_exit())
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_processor_is_recorded_and_run_finishes() {
    let dir = TempDir::new().unwrap();
    let downloader = ScriptedDownloader::default();
    let site = Site {
        start_requests: seeds(&["calm", "boom", "steady"]),
        cycle_retry_times: 3,
        ..Site::default()
    };
    let processor = TrippingProcessor { trip: url("boom") };

    let mut spider = Spider::new(
        "panic",
        site,
        Arc::new(processor),
        Arc::new(QueueScheduler::new()),
    )
    .unwrap();
    spider.set_data_root(dir.path()).unwrap();
    spider
        .set_downloader(Box::new(downloader.clone()))
        .unwrap();
    spider.set_thread_num(2).unwrap();
    let collector = Arc::new(CollectorPipeline::new());
    spider.add_pipeline(collector.clone()).unwrap();
    let events = Arc::new(EventCounter::default());
    spider.add_listener(events.clone()).unwrap();

    let status = tokio::time::timeout(Duration::from_secs(5), spider.run())
        .await
        .expect("run stalled after a worker panic")
        .unwrap();

    assert_eq!(status, Status::Finished);
    assert_eq!(urls_of(&collector), vec![url("calm"), url("steady")]);
    assert_eq!(events.failure.load(Ordering::SeqCst), 1);

    let progress = spider.progress();
    assert_eq!(progress.finished, 3);
    assert_eq!(progress.failed, 1);

    let failed = FailureLog::read_requests(spider.failure_log_path()).unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].url.as_str(), url("boom"));
}
