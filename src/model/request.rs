//! Fetch request definitions
//!
//! A `Request` identifies one unit of work. It is immutable apart from its
//! `extras`, which the orchestrator and the page processor use to attach
//! side-channel metadata (retry attempts, assigned proxy, last status code).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Typed side-channel metadata carried by a request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestExtras {
    /// Number of cycle-retry attempts already made for this request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_tried_times: Option<u32>,

    /// Proxy assigned to this request by the proxy pool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,

    /// HTTP status code of the last fetch attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    /// URL of the page this request was discovered on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,

    /// Arbitrary metadata attached by page processors
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: BTreeMap<String, serde_json::Value>,
}

/// A single fetch request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// The URL to fetch
    pub url: Url,

    /// Ordering hint (lower values poll first in priority frontiers)
    #[serde(default)]
    pub priority: i64,

    /// Depth of this request; seeds start at 1
    pub depth: u32,

    /// Side-channel metadata
    #[serde(default)]
    pub extras: RequestExtras,
}

impl Request {
    /// Creates a request for `url` at the given depth with neutral priority
    pub fn new(url: Url, depth: u32) -> Self {
        Self {
            url,
            priority: 0,
            depth,
            extras: RequestExtras::default(),
        }
    }

    /// Parses `url` and creates a request at the given depth
    pub fn parse(url: &str, depth: u32) -> Result<Self, url::ParseError> {
        Ok(Self::new(Url::parse(url)?, depth))
    }

    /// Sets the priority, builder style
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Attaches a custom extra, builder style
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extras.custom.insert(key.into(), value);
        self
    }

    /// Depth assigned to requests discovered on this request's page
    pub fn next_depth(&self) -> u32 {
        self.depth.saturating_add(1)
    }

    /// Key used for duplicate suppression
    pub fn fingerprint(&self) -> &str {
        self.url.as_str()
    }

    /// Returns true if this request is being re-attempted by the cycle-retry policy
    ///
    /// Such requests were necessarily seen before, so frontiers let them
    /// through the duplicate check.
    pub fn is_cycle_retry(&self) -> bool {
        self.extras.cycle_tried_times.is_some()
    }

    /// Drops what a previous attempt left in the extras
    ///
    /// The retry count, assigned proxy and last status code are cleared so
    /// the request starts over like a new seed. Referer and custom extras
    /// are kept.
    pub fn clear_attempt_state(&mut self) {
        self.extras.cycle_tried_times = None;
        self.extras.proxy = None;
        self.extras.status_code = None;
    }
}

/// Converts a list of URLs into requests at the given depth, skipping unparseable entries
pub fn requests_from_urls<I, S>(urls: I, depth: u32) -> Vec<Request>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    urls.into_iter()
        .filter_map(|url| match Request::parse(url.as_ref(), depth) {
            Ok(request) => Some(request),
            Err(e) => {
                tracing::warn!("Skipping invalid URL {}: {}", url.as_ref(), e);
                None
            }
        })
        .collect()
}
