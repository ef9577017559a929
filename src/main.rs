//! Sumi-Spider main entry point
//!
//! This is the command-line interface for the Sumi-Spider crawl engine.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sumi_spider::config::{load_config_with_hash, Config, SchedulerKind};
use sumi_spider::crawler::{FailureLog, Spider};
use sumi_spider::pipeline::{ConsolePipeline, JsonFilePipeline, Pipeline, SqlitePipeline};
use sumi_spider::processor::LinkProcessor;
use sumi_spider::proxy::RoundRobinProxyPool;
use sumi_spider::scheduler::{PriorityScheduler, QueueScheduler, Scheduler};
use tracing_subscriber::EnvFilter;

/// Sumi-Spider: a concurrent crawl engine
///
/// Crawls from the configured start URLs with a fixed pool of workers,
/// follows links within the allowed domains, and writes extracted results
/// to the configured pipelines.
#[derive(Parser, Debug)]
#[command(name = "sumi-spider")]
#[command(version)]
#[command(about = "A concurrent crawl engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the resolved crawl plan without crawling
    #[arg(long)]
    dry_run: bool,

    /// Seed the run from a failed request log instead of the start URLs
    #[arg(long, value_name = "FILE")]
    replay_failures: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        return handle_dry_run(&config);
    }

    handle_crawl(config, cli.replay_failures.as_deref()).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_spider=info,warn"),
            1 => EnvFilter::new("sumi_spider=debug,info"),
            2 => EnvFilter::new("sumi_spider=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: prints the resolved configuration
fn handle_dry_run(config: &Config) -> Result<()> {
    println!("=== Sumi-Spider Dry Run ===\n");
    println!("Identity: {}", config.identity());
    println!(
        "Data directory: {}\n",
        config.spider.data_dir.join(config.identity()).display()
    );

    let resolved = toml::to_string_pretty(config).context("Failed to render configuration")?;
    println!("{}", resolved);

    println!("✓ Configuration is valid");
    println!(
        "✓ Would start crawling with {} seed URLs and {} workers",
        config.site.start_urls.len(),
        config.spider.thread_num
    );
    Ok(())
}

fn build_scheduler(kind: SchedulerKind) -> Arc<dyn Scheduler> {
    match kind {
        SchedulerKind::Queue => Arc::new(QueueScheduler::new()),
        SchedulerKind::Priority => Arc::new(PriorityScheduler::new()),
        SchedulerKind::QueueNoDedup => Arc::new(QueueScheduler::without_duplicate_removal()),
    }
}

fn build_pipeline(name: &str, config: &Config, data_dir: &Path) -> Result<Arc<dyn Pipeline>> {
    let pipeline: Arc<dyn Pipeline> = match name {
        "console" => Arc::new(ConsolePipeline::new()),
        "sqlite" => {
            std::fs::create_dir_all(data_dir)?;
            let path = data_dir.join(&config.output.sqlite_path);
            Arc::new(
                SqlitePipeline::new(&path)
                    .with_context(|| format!("Failed to open {}", path.display()))?,
            )
        }
        _ => Arc::new(JsonFilePipeline::in_dir(data_dir)),
    };
    Ok(pipeline)
}

/// Builds a spider from the configuration
fn build_spider(config: &Config, replay: Option<&Path>) -> Result<Spider> {
    let mut site = config.to_site();
    if let Some(path) = replay {
        site.start_requests = FailureLog::read_requests(path)
            .with_context(|| format!("Failed to read failure log {}", path.display()))?;
        tracing::info!(
            "Replaying {} failed requests from {}",
            site.start_requests.len(),
            path.display()
        );
    }

    let processor = Arc::new(LinkProcessor::with_allowed_domains(
        config.site.allowed_domains.clone(),
    ));
    let scheduler = build_scheduler(config.spider.scheduler);

    let mut spider = Spider::new(config.identity(), site, processor, scheduler)?;
    spider.set_data_root(&config.spider.data_dir)?;
    spider.set_thread_num(config.spider.thread_num)?;
    spider.set_exit_when_complete(config.spider.exit_when_complete)?;
    spider.set_spawn_urls(config.spider.spawn_urls)?;
    if let Some(max_depth) = config.spider.max_depth {
        spider.set_max_depth(max_depth)?;
    }
    if let Some(ms) = config.spider.empty_sleep_time {
        spider.set_empty_sleep_time(ms)?;
    }

    if config.site.proxy_pool_enabled {
        spider.set_proxy_pool(Arc::new(RoundRobinProxyPool::new(
            config.site.proxies.clone(),
        )?))?;
    }

    let data_dir = spider.data_dir();
    for name in &config.output.pipelines {
        spider.add_pipeline(build_pipeline(name, config, &data_dir)?)?;
    }

    Ok(spider)
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, replay: Option<&Path>) -> Result<()> {
    let mut spider = build_spider(&config, replay)?;
    let handle = spider.handle();

    tracing::info!(
        "Starting spider {} ({} seed URLs, failures logged to {})",
        spider.identity(),
        spider.site().start_requests.len(),
        spider.failure_log_path().display()
    );

    let run = tokio::spawn(async move { spider.run().await });

    let interrupt = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, waiting for in-flight requests");
            interrupt.stop_and_wait().await;
        }
    });

    let status = run.await.context("Spider task panicked")??;
    let progress = handle.progress();

    println!("\n=== Crawl {} ===", status);
    println!("{}", progress);
    Ok(())
}
