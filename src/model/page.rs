//! Fetched pages and their extracted results

use crate::model::Request;
use serde_json::Value;
use std::collections::BTreeMap;

/// Structured output extracted from one page
#[derive(Debug, Clone, PartialEq)]
pub struct ResultItems {
    /// The request whose page produced these results
    pub request: Request,

    /// Extracted fields, keyed by name
    pub fields: BTreeMap<String, Value>,

    /// Set by the processor to keep these results away from pipelines
    pub skip: bool,
}

impl ResultItems {
    /// Creates an empty result container for `request`
    pub fn new(request: Request) -> Self {
        Self {
            request,
            fields: BTreeMap::new(),
            skip: false,
        }
    }

    /// Stores a field, replacing any previous value under the same key
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Gets a field by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns true if no field has been extracted
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns true if these results must not reach the pipelines
    ///
    /// Results are skipped when explicitly marked or when nothing was extracted.
    pub fn is_skip(&self) -> bool {
        self.skip || self.fields.is_empty()
    }
}

/// Result of fetching one request
///
/// A page is owned by the worker that fetched it and is dropped once the
/// worker has dispatched it to the pipelines or re-queued its request.
#[derive(Debug, Clone)]
pub struct Page {
    /// The originating request
    pub request: Request,

    /// Raw page content
    pub content: String,

    /// HTTP status code, when the fetch went over HTTP
    pub status_code: Option<u16>,

    /// Content-Type of the fetched content
    pub content_type: String,

    /// Fetch succeeded but the page must not be processed
    pub skip: bool,

    /// The request must be re-attempted through the cycle-retry policy
    pub need_cycle_retry: bool,

    /// Extraction intentionally produced no follow-ups; none are spawned
    pub miss_target_urls: bool,

    /// Extracted results
    pub result_items: ResultItems,

    target_requests: Vec<Request>,
}

impl Page {
    /// Creates an empty page for `request`
    pub fn new(request: Request, content_type: impl Into<String>) -> Self {
        let result_items = ResultItems::new(request.clone());
        Self {
            request,
            content: String::new(),
            status_code: None,
            content_type: content_type.into(),
            skip: false,
            need_cycle_retry: false,
            miss_target_urls: false,
            result_items,
            target_requests: Vec::new(),
        }
    }

    /// Sets the page content, builder style
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Adds a follow-up request as-is
    pub fn add_target_request(&mut self, request: Request) {
        self.target_requests.push(request);
    }

    /// Adds a follow-up for `href`, resolved against this page's URL
    ///
    /// The follow-up gets the next depth and records this page as its referer.
    pub fn add_target_url(&mut self, href: &str) -> Result<(), url::ParseError> {
        let url = self.request.url.join(href)?;
        let mut request = Request::new(url, self.request.next_depth());
        request.extras.referer = Some(self.request.url.to_string());
        self.target_requests.push(request);
        Ok(())
    }

    /// Follow-up requests discovered on this page
    pub fn target_requests(&self) -> &[Request] {
        &self.target_requests
    }

    /// Takes the follow-up requests out of the page
    pub fn take_target_requests(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.target_requests)
    }
}
