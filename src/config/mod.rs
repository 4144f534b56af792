//! Configuration module for the catalog crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use catalog_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("catalog.toml")).unwrap();
//! println!("Crawler will visit at most {} pages", config.pagination.max_pages);
//! ```

mod parser;
mod types;
mod validation;

pub use validation::validate;
pub(crate) use validation::validate_detail_pages;

// Re-export types
pub use types::{
    Config, CrawlerConfig, FetchConfig, FetchEngine, OutputConfig, PaginationConfig,
    ScrollConfig, SelectorConfig, SiteConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
