//! Run event listeners
//!
//! Listeners are notified synchronously on whichever task detects the event,
//! so implementations must not assume any particular thread.

use crate::model::Request;
use std::sync::Arc;

/// Observer of request outcomes and run shutdown
pub trait SpiderListener: Send + Sync {
    /// A request was fetched and handled
    fn on_success(&self, _request: &Request) {}

    /// A request was abandoned and written to the failure log
    fn on_failure(&self, _request: &Request) {}

    /// The run is closing
    fn on_closing(&self) {}
}

/// Registered listeners, fanned out in registration order
#[derive(Clone, Default)]
pub(crate) struct Listeners {
    listeners: Vec<Arc<dyn SpiderListener>>,
}

impl Listeners {
    pub(crate) fn add(&mut self, listener: Arc<dyn SpiderListener>) {
        self.listeners.push(listener);
    }

    pub(crate) fn success(&self, request: &Request) {
        for listener in &self.listeners {
            listener.on_success(request);
        }
    }

    pub(crate) fn failure(&self, request: &Request) {
        for listener in &self.listeners {
            listener.on_failure(request);
        }
    }

    pub(crate) fn closing(&self) {
        for listener in &self.listeners {
            listener.on_closing();
        }
    }
}
