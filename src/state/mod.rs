//! State module for tracking a crawl run
//!
//! - `Status`: the lifecycle state machine (Init → Running → Stopped/Finished/Exited)
//! - `RunState`: the synchronized holder for status, counters and shutdown tokens

mod run_state;

pub use run_state::{RunState, Status};
