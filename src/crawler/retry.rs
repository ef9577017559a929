//! Cycle-retry policy
//!
//! A request that failed to fetch or extract goes back into the frontier with
//! its attempt counter bumped, until the counter reaches the site's maximum.

use crate::model::Request;

/// What to do with a request that needs another attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Push the request back into the frontier
    Requeue { attempt: u32 },

    /// Give up on the request for good
    Abandon,
}

/// Applies the cycle-retry policy to `request`
///
/// | Attempt counter | Result |
/// |-----------------|--------|
/// | `max_cycle_retries == 0` | Abandon (retry disabled) |
/// | absent | set to 1, requeue |
/// | present | incremented; abandon once it reaches `max_cycle_retries` |
///
/// On requeue the request's priority is reset to the neutral 0.
pub fn apply_cycle_retry(request: &mut Request, max_cycle_retries: u32) -> RetryDecision {
    if max_cycle_retries == 0 {
        return RetryDecision::Abandon;
    }

    let attempt = match request.extras.cycle_tried_times {
        None => 1,
        Some(tried) => {
            let attempt = tried.saturating_add(1);
            if attempt >= max_cycle_retries {
                return RetryDecision::Abandon;
            }
            attempt
        }
    };

    request.extras.cycle_tried_times = Some(attempt);
    request.priority = 0;
    RetryDecision::Requeue { attempt }
}
