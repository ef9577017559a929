//! Site policy shared read-only by every worker

use crate::model::Request;
use std::collections::BTreeMap;
use std::time::Duration;

/// Default Content-Type assumed when a response does not declare one
pub const DEFAULT_CONTENT_TYPE: &str = "text/html";

/// Default User-Agent sent by the HTTP downloader
pub const DEFAULT_USER_AGENT: &str = concat!("sumi-spider/", env!("CARGO_PKG_VERSION"));

/// Immutable crawl policy read at start-up
#[derive(Debug, Clone)]
pub struct Site {
    /// Domain this site represents, if any
    pub domain: Option<String>,

    /// Delay each worker sleeps after handling a request
    pub sleep_time: Duration,

    /// Maximum number of cycle-retry attempts; 0 disables cycle-retry
    pub cycle_retry_times: u32,

    /// Content-Type assumed when a response does not declare one
    pub content_type: String,

    /// User-Agent header value
    pub user_agent: String,

    /// Per-request timeout
    pub timeout: Duration,

    /// Status codes treated as a successful fetch
    pub accepted_status_codes: Vec<u16>,

    /// Extra headers sent with every request
    pub headers: BTreeMap<String, String>,

    /// Whether requests are routed through the attached proxy pool
    pub proxy_pool_enabled: bool,

    /// Requests seeded into the frontier at start-up
    pub start_requests: Vec<Request>,
}

impl Default for Site {
    fn default() -> Self {
        Self {
            domain: None,
            sleep_time: Duration::ZERO,
            cycle_retry_times: 0,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            accepted_status_codes: vec![200],
            headers: BTreeMap::new(),
            proxy_pool_enabled: false,
            start_requests: Vec::new(),
        }
    }
}

impl Site {
    /// Returns true if `status` counts as a successful fetch
    pub fn accepts_status(&self, status: u16) -> bool {
        self.accepted_status_codes.contains(&status)
    }
}
