//! Processor module (extraction strategies)
//!
//! A page processor turns a fetched page into result fields and follow-up
//! requests. The bundled `LinkProcessor` follows HTML links.

mod links;
mod traits;

pub use links::LinkProcessor;
pub use traits::{PageProcessor, ProcessError, ProcessResult};
