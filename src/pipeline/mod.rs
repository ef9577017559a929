//! Pipeline module (output sinks)
//!
//! Pipelines receive the result items of every completed, non-skipped page,
//! in registration order. Bundled pipelines:
//! - `JsonFilePipeline`: JSON lines in the run data directory (the default)
//! - `SqlitePipeline`: rows in a SQLite database
//! - `ConsolePipeline`: stdout
//! - `CollectorPipeline`: in memory

mod collector;
mod console;
mod json_file;
mod sqlite;
mod traits;

pub use collector::CollectorPipeline;
pub use console::ConsolePipeline;
pub use json_file::{JsonFilePipeline, RESULTS_FILE_NAME};
pub use sqlite::SqlitePipeline;
pub use traits::{Pipeline, PipelineError, PipelineResult, ResultRecord};
