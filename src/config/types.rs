use crate::model::{requests_from_urls, Site, DEFAULT_CONTENT_TYPE, DEFAULT_USER_AGENT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Identity used when neither the config nor the seeds provide one
pub const DEFAULT_IDENTITY: &str = "sumi-spider";

/// Main configuration structure for Sumi-Spider
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub spider: SpiderConfig,
    pub site: SiteConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Engine behavior configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpiderConfig {
    /// Run identity; namespaces the data directory
    #[serde(default)]
    pub identity: Option<String>,

    /// Number of concurrent workers
    #[serde(rename = "thread-num", default = "default_thread_num")]
    pub thread_num: usize,

    /// Maximum depth of follow-up requests; unlimited when absent
    #[serde(rename = "max-depth", default)]
    pub max_depth: Option<u32>,

    /// How long workers wait on an empty frontier before exiting (milliseconds)
    #[serde(rename = "empty-sleep-time", default)]
    pub empty_sleep_time: Option<u64>,

    /// Finish the run once the frontier stays empty
    #[serde(rename = "exit-when-complete", default = "default_true")]
    pub exit_when_complete: bool,

    /// Push follow-up requests found on pages
    #[serde(rename = "spawn-urls", default = "default_true")]
    pub spawn_urls: bool,

    /// Frontier implementation
    #[serde(default)]
    pub scheduler: SchedulerKind,

    /// Root directory for per-run data
    #[serde(rename = "data-dir", default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Frontier implementations selectable from the config file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchedulerKind {
    /// FIFO with hash-set duplicate removal
    #[default]
    Queue,

    /// Priority ordered with hash-set duplicate removal
    Priority,

    /// FIFO without duplicate removal
    QueueNoDedup,
}

/// Site policy configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    /// Seed URLs, crawled at depth 1
    #[serde(rename = "start-urls", default)]
    pub start_urls: Vec<String>,

    /// Delay between requests per worker (milliseconds)
    #[serde(rename = "sleep-time", default)]
    pub sleep_time: u64,

    /// Maximum cycle-retry attempts; 0 disables retry
    #[serde(rename = "cycle-retry-times", default)]
    pub cycle_retry_times: u32,

    #[serde(rename = "content-type", default = "default_content_type")]
    pub content_type: String,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout (milliseconds)
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(rename = "accepted-status-codes", default = "default_accepted_status_codes")]
    pub accepted_status_codes: Vec<u16>,

    #[serde(rename = "proxy-pool-enabled", default)]
    pub proxy_pool_enabled: bool,

    /// Proxy URLs for the round-robin pool
    #[serde(default)]
    pub proxies: Vec<String>,

    /// Domains whose links are followed (e.g. "example.com" or "*.example.com")
    #[serde(rename = "allowed-domains", default)]
    pub allowed_domains: Vec<String>,

    /// Extra headers sent with every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Pipelines in dispatch order: "json-file", "console" or "sqlite"
    #[serde(default = "default_pipelines")]
    pub pipelines: Vec<String>,

    /// SQLite database file, relative to the run data directory
    #[serde(rename = "sqlite-path", default = "default_sqlite_path")]
    pub sqlite_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            pipelines: default_pipelines(),
            sqlite_path: default_sqlite_path(),
        }
    }
}

impl Config {
    /// Run identity: the configured one, else the first seed host
    ///
    /// Characters a host may carry but an identity may not (dots, mostly)
    /// become underscores.
    pub fn identity(&self) -> String {
        if let Some(identity) = &self.spider.identity {
            return identity.clone();
        }

        self.site
            .start_urls
            .iter()
            .find_map(|url| url::Url::parse(url).ok()?.host_str().map(str::to_string))
            .map(|host| {
                host.chars()
                    .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
                    .collect()
            })
            .unwrap_or_else(|| DEFAULT_IDENTITY.to_string())
    }

    /// Builds the immutable site policy, seeding start URLs at depth 1
    pub fn to_site(&self) -> Site {
        let site = &self.site;
        let start_requests = requests_from_urls(&site.start_urls, 1);
        let domain = start_requests
            .first()
            .and_then(|r| r.url.host_str())
            .map(str::to_string);

        Site {
            domain,
            sleep_time: Duration::from_millis(site.sleep_time),
            cycle_retry_times: site.cycle_retry_times,
            content_type: site.content_type.clone(),
            user_agent: site.user_agent.clone(),
            timeout: Duration::from_millis(site.timeout),
            accepted_status_codes: site.accepted_status_codes.clone(),
            headers: site.headers.clone(),
            proxy_pool_enabled: site.proxy_pool_enabled,
            start_requests,
        }
    }
}

fn default_thread_num() -> usize {
    1
}

fn default_true() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_content_type() -> String {
    DEFAULT_CONTENT_TYPE.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_timeout() -> u64 {
    30_000
}

fn default_accepted_status_codes() -> Vec<u16> {
    vec![200]
}

fn default_pipelines() -> Vec<String> {
    vec!["json-file".to_string()]
}

fn default_sqlite_path() -> String {
    "results.db".to_string()
}
