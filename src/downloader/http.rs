//! HTTP downloader implementation
//!
//! This module handles HTTP fetching for the crawler, including:
//! - Building HTTP clients from the site policy
//! - Routing requests through an assigned proxy
//! - Classifying status codes against the accepted set

use crate::downloader::traits::{DownloadError, DownloadResult, Downloader};
use crate::model::{CrawlContext, Page, Request, Site};
use async_trait::async_trait;
use reqwest::{header, Client, Proxy};
use std::collections::HashMap;

/// Fetches pages over HTTP(S) with reqwest
#[derive(Clone)]
pub struct HttpDownloader {
    client: Client,
    /// Clients bound to a proxy, built on first use
    proxied: HashMap<String, Client>,
    user_agent: String,
    timeout: std::time::Duration,
    thread_num: usize,
}

/// Builds an HTTP client with the site's user agent and timeout
///
/// # Arguments
///
/// * `site` - The site policy
/// * `proxy` - Optional proxy URL every request is routed through
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(DownloadError)` - Failed to build client
pub fn build_http_client(site: &Site, proxy: Option<&str>) -> DownloadResult<Client> {
    build_client(&site.user_agent, site.timeout, proxy)
}

fn build_client(
    user_agent: &str,
    timeout: std::time::Duration,
    proxy: Option<&str>,
) -> DownloadResult<Client> {
    let mut builder = Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout.min(std::time::Duration::from_secs(10)))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        let proxy = Proxy::all(proxy).map_err(|e| DownloadError::Client(e.to_string()))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| DownloadError::Client(e.to_string()))
}

impl HttpDownloader {
    /// Creates a downloader for `site`
    pub fn new(site: &Site) -> DownloadResult<Self> {
        Ok(Self {
            client: build_http_client(site, None)?,
            proxied: HashMap::new(),
            user_agent: site.user_agent.clone(),
            timeout: site.timeout,
            thread_num: 1,
        })
    }

    /// Number of workers this downloader was configured for
    pub fn thread_num(&self) -> usize {
        self.thread_num
    }

    fn client_for(&mut self, proxy: Option<&str>) -> DownloadResult<Client> {
        let Some(proxy) = proxy else {
            return Ok(self.client.clone());
        };

        if let Some(client) = self.proxied.get(proxy) {
            return Ok(client.clone());
        }

        let client = build_client(&self.user_agent, self.timeout, Some(proxy))?;
        self.proxied.insert(proxy.to_string(), client.clone());
        Ok(client)
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    /// Fetches a request
    ///
    /// # Response Handling
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | Status in `accepted_status_codes` | Page with body |
    /// | Any other status | `DownloadError::Status` |
    /// | Timeout | `DownloadError::Timeout` |
    /// | Connection or body error | `DownloadError::Http` |
    async fn download(&mut self, request: &Request, ctx: &CrawlContext) -> DownloadResult<Page> {
        let site = &ctx.site;
        let url = request.url.as_str();
        let client = self.client_for(request.extras.proxy.as_deref())?;

        let mut builder = client.get(request.url.clone());
        for (name, value) in &site.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(referer) = &request.extras.referer {
            builder = builder.header(header::REFERER, referer.as_str());
        }

        let response = builder.send().await.map_err(|e| classify(url, e))?;

        let status = response.status().as_u16();
        if !site.accepts_status(status) {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status,
            });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| site.content_type.clone());

        let body = response.text().await.map_err(|e| classify(url, e))?;

        let mut page = Page::new(request.clone(), content_type).with_content(body);
        page.status_code = Some(status);
        Ok(page)
    }

    fn clone_box(&self) -> Box<dyn Downloader> {
        Box::new(self.clone())
    }

    fn set_thread_num(&mut self, thread_num: usize) {
        self.thread_num = thread_num;
    }
}

fn classify(url: &str, error: reqwest::Error) -> DownloadError {
    if error.is_timeout() {
        DownloadError::Timeout {
            url: url.to_string(),
        }
    } else {
        DownloadError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}
