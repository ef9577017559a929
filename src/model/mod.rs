//! Data model shared by the orchestrator and the pluggable strategies
//!
//! - `Request`: one unit of work, with typed side-channel `RequestExtras`
//! - `Page` / `ResultItems`: the fetched page and what was extracted from it
//! - `Site`: immutable crawl policy
//! - `CrawlContext`: what every strategy call gets to see about the run

mod page;
mod request;
mod site;

pub use page::{Page, ResultItems};
pub use request::{requests_from_urls, Request, RequestExtras};
pub use site::{Site, DEFAULT_CONTENT_TYPE, DEFAULT_USER_AGENT};

use crate::proxy::ProxyPool;
use std::path::PathBuf;
use std::sync::Arc;

/// Read-only view of the run handed to schedulers, downloaders and pipelines
#[derive(Clone)]
pub struct CrawlContext {
    /// Run identity
    pub identity: String,

    /// Site policy
    pub site: Arc<Site>,

    /// Per-run data directory
    pub data_dir: PathBuf,

    /// Proxy pool, when one is attached and enabled for the site
    pub proxy_pool: Option<Arc<dyn ProxyPool>>,
}

impl CrawlContext {
    /// Creates a context without a proxy pool
    pub fn new(identity: impl Into<String>, site: Arc<Site>, data_dir: PathBuf) -> Self {
        Self {
            identity: identity.into(),
            site,
            data_dir,
            proxy_pool: None,
        }
    }
}

impl std::fmt::Debug for CrawlContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrawlContext")
            .field("identity", &self.identity)
            .field("data_dir", &self.data_dir)
            .field("proxy_pool", &self.proxy_pool.is_some())
            .finish()
    }
}
