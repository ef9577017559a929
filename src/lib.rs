//! Sumi-Spider: a concurrent crawl engine
//!
//! This crate dispatches fetch requests from a shared frontier across a fixed
//! pool of workers, runs pluggable extraction over every fetched page, and
//! routes the extracted results to output pipelines. The engine enforces depth
//! limits, duplicate suppression, bounded cycle-retry and a graceful shutdown
//! state machine, while staying agnostic to what is fetched or extracted.

pub mod config;
pub mod crawler;
pub mod downloader;
pub mod model;
pub mod pipeline;
pub mod processor;
pub mod proxy;
pub mod scheduler;
pub mod state;

use thiserror::Error;

/// Main error type for Sumi-Spider operations
#[derive(Debug, Error)]
pub enum SpiderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] scheduler::SchedulerError),

    #[error("Download error: {0}")]
    Download(#[from] downloader::DownloadError),

    #[error("Processor error: {0}")]
    Process(#[from] processor::ProcessError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] pipeline::PipelineError),

    #[error("Proxy error: {0}")]
    Proxy(#[from] proxy::ProxyError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Worker task failed: {0}")]
    Worker(String),
}

/// Configuration-specific errors
///
/// These are fatal: they surface at the call that caused them and are never
/// retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid identity '{0}': use A-Z a-z 0-9 _ - in segments separated by single '/'")]
    InvalidIdentity(String),

    #[error("Thread count must be at least 1, got {0}")]
    InvalidThreadNum(usize),

    #[error("Empty sleep time must be at least 10000ms, got {0}ms")]
    InvalidEmptySleepTime(u64),

    #[error("Spider is already running")]
    AlreadyRunning,

    #[error("Spider has already run; create a new spider to crawl again")]
    AlreadyRan,
}

/// Result type alias for Sumi-Spider operations
pub type Result<T> = std::result::Result<T, SpiderError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Spider, SpiderHandle, SpiderListener};
pub use model::{CrawlContext, Page, Request, RequestExtras, ResultItems, Site};
pub use state::Status;
