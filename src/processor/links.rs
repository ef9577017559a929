//! Link-following page processor
//!
//! HTML pages are scanned for their title and for followable links. Links
//! to an allowed host become follow-up requests; the page URL, its title and
//! every discovered link are recorded as result fields.

use crate::model::Page;
use crate::processor::traits::{PageProcessor, ProcessResult};
use scraper::{Html, Selector};
use url::Url;

/// Elements whose `href` points at another document
///
/// Anchors marked `download` are files, not pages.
const LINK_SELECTORS: &[&str] = &["a[href]:not([download])", "link[rel='canonical'][href]"];

/// `href` prefixes that never lead to a crawlable document
const IGNORED_HREF_PREFIXES: &[&str] = &["#", "javascript:", "mailto:", "tel:", "data:"];

/// Follows links found in HTML pages
///
/// Only pages whose Content-Type mentions HTML are scanned; anything else is
/// recorded with its URL and marked as having no target URLs.
///
/// # Example
///
/// ```
/// use sumi_spider::processor::{LinkProcessor, PageProcessor};
/// use sumi_spider::{Page, Request};
///
/// let request = Request::parse("https://example.com/", 1).unwrap();
/// let mut page = Page::new(request, "text/html")
///     .with_content(r#"<title>Home</title><a href="/next">Next</a>"#);
///
/// LinkProcessor::new().process(&mut page).unwrap();
/// assert_eq!(page.target_requests()[0].url.as_str(), "https://example.com/next");
/// assert_eq!(page.result_items.get("title").and_then(|t| t.as_str()), Some("Home"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct LinkProcessor {
    allowed_domains: Vec<String>,
}

impl LinkProcessor {
    /// Creates a processor that follows links to any host
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a processor that follows links only to `domains` and their subdomains
    pub fn with_allowed_domains(domains: Vec<String>) -> Self {
        Self {
            allowed_domains: domains
                .into_iter()
                .map(|d| d.trim().trim_start_matches("*.").to_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    /// Returns true if links to `url` should be followed
    pub fn is_allowed(&self, url: &Url) -> bool {
        if self.allowed_domains.is_empty() {
            return true;
        }

        let Some(host) = url.host_str().map(str::to_lowercase) else {
            return false;
        };

        self.allowed_domains.iter().any(|domain| {
            host == *domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        })
    }
}

impl PageProcessor for LinkProcessor {
    fn process(&self, page: &mut Page) -> ProcessResult<()> {
        let page_url = page.request.url.clone();
        page.result_items.put("url", page_url.as_str());

        if !page.content_type.to_lowercase().contains("html") {
            tracing::debug!("Not following links on {} ({})", page_url, page.content_type);
            page.miss_target_urls = true;
            return Ok(());
        }

        let document = Html::parse_document(&page.content);
        if let Some(title) = page_title(&document) {
            page.result_items.put("title", title);
        }

        let links = discovered_links(&document, &page_url);
        let mut followed = 0;
        for link in links.iter().filter(|link| self.is_allowed(link)) {
            match page.add_target_url(link.as_str()) {
                Ok(()) => followed += 1,
                Err(e) => tracing::debug!("Skipping link {} on {}: {}", link, page_url, e),
            }
        }

        tracing::trace!(
            "Found {} links on {}, following {}",
            links.len(),
            page_url,
            followed
        );
        page.result_items.put(
            "links",
            links.iter().map(Url::as_str).collect::<Vec<_>>(),
        );

        Ok(())
    }
}

fn page_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    let title = document
        .select(&selector)
        .next()?
        .text()
        .collect::<String>();
    let title = title.trim();
    (!title.is_empty()).then(|| title.to_string())
}

/// Absolute HTTP(S) targets of every link element, in document order per selector
fn discovered_links(document: &Html, page_url: &Url) -> Vec<Url> {
    LINK_SELECTORS
        .iter()
        .filter_map(|css| Selector::parse(css).ok())
        .flat_map(|selector| {
            document
                .select(&selector)
                .filter_map(|element| element.value().attr("href"))
                .filter_map(|href| followable(href, page_url))
                .collect::<Vec<_>>()
        })
        .collect()
}

fn followable(href: &str, page_url: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty()
        || IGNORED_HREF_PREFIXES
            .iter()
            .any(|prefix| href.starts_with(prefix))
    {
        return None;
    }

    let target = page_url.join(href).ok()?;
    matches!(target.scheme(), "http" | "https").then_some(target)
}
