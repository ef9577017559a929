//! Configuration module for Sumi-Spider
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sumi_spider::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("spider.toml")).unwrap();
//! println!("Spider {} will use {} workers", config.identity(), config.spider.thread_num);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    Config, OutputConfig, SchedulerKind, SiteConfig, SpiderConfig, DEFAULT_IDENTITY,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

pub use validation::{validate_identity, MAX_THREAD_NUM, MIN_EMPTY_SLEEP_TIME_MS, PIPELINE_NAMES};
