//! Downloader module (fetch strategies)
//!
//! A downloader turns one request into one page. Workers each hold their own
//! instance, cloned from a prototype, so no fetch state is shared.

mod http;
mod traits;

pub use http::{build_http_client, HttpDownloader};
pub use traits::{DownloadError, DownloadResult, Downloader};
