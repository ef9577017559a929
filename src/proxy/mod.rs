//! Proxy pool contract
//!
//! How proxies are sourced is outside the engine. The orchestrator only
//! assigns a proxy to a request before its fetch and returns it afterwards,
//! together with the last status code so the pool can judge its health.

use parking_lot::Mutex;
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur while building a proxy pool
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Proxy pool is empty")]
    Empty,

    #[error("Invalid proxy URL {url}: {message}")]
    InvalidUrl { url: String, message: String },
}

/// A source of proxies shared by all workers
pub trait ProxyPool: Send + Sync {
    /// Takes a proxy for the next request, if one is available
    fn acquire(&self) -> Option<String>;

    /// Returns a proxy after use with the status code its request ended with
    fn release(&self, proxy: &str, status_code: Option<u16>);
}

/// Cycles through a fixed list of proxies
///
/// Releases without a status code or with an error status count as a failure
/// against the proxy.
pub struct RoundRobinProxyPool {
    proxies: Vec<String>,
    inner: Mutex<PoolState>,
}

#[derive(Default)]
struct PoolState {
    next: usize,
    failures: HashMap<String, u32>,
}

impl RoundRobinProxyPool {
    /// Creates a pool over `proxies`, validating each as a URL
    pub fn new(proxies: Vec<String>) -> Result<Self, ProxyError> {
        if proxies.is_empty() {
            return Err(ProxyError::Empty);
        }

        for proxy in &proxies {
            url::Url::parse(proxy).map_err(|e| ProxyError::InvalidUrl {
                url: proxy.clone(),
                message: e.to_string(),
            })?;
        }

        Ok(Self {
            proxies,
            inner: Mutex::new(PoolState::default()),
        })
    }

    /// Number of failed releases recorded against `proxy`
    pub fn failure_count(&self, proxy: &str) -> u32 {
        self.inner.lock().failures.get(proxy).copied().unwrap_or(0)
    }
}

impl ProxyPool for RoundRobinProxyPool {
    fn acquire(&self) -> Option<String> {
        let mut state = self.inner.lock();
        let proxy = self.proxies.get(state.next % self.proxies.len())?.clone();
        state.next = state.next.wrapping_add(1);
        Some(proxy)
    }

    fn release(&self, proxy: &str, status_code: Option<u16>) {
        let failed = status_code.map_or(true, |code| code >= 400);
        if failed {
            let mut state = self.inner.lock();
            *state.failures.entry(proxy.to_string()).or_insert(0) += 1;
            tracing::debug!("Proxy {} released after failure ({:?})", proxy, status_code);
        }
    }
}
