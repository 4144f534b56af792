//! Catalog Crawler: product listing crawl-and-extraction engine
//!
//! This crate searches a retail catalog, walks its listing pages (either by
//! explicit pagination or by scrolling an infinite listing in a browser),
//! extracts product name/price/link, resolves categories, and hands back a
//! terminated, auditable crawl session.

pub mod config;
pub mod crawler;
pub mod output;
pub mod session;
pub mod state;
pub mod storage;
pub mod url;

use std::time::Duration;
use thiserror::Error;

/// Main error type for catalog crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Timed out after {timeout:?} waiting for element '{selector}'")]
    ElementTimeout { selector: String, timeout: Duration },

    #[error("Parse error for {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Fetch strategy does not support {0}")]
    Unsupported(&'static str),

    #[error("Browser session error: {0}")]
    Browser(String),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Session task failed: {0}")]
    Task(String),
}

impl CrawlError {
    /// Returns true if the error belongs to a single page or scroll step
    ///
    /// Recoverable errors are absorbed by the orchestrator (counted, logged)
    /// and the crawl moves on to the next step. Everything else aborts the
    /// session before any fetch is issued.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::ElementTimeout { .. } | Self::Browser(_)
        )
    }

    /// Returns true if the error means the document could not be read as markup
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Template is missing placeholder {0}")]
    MissingPlaceholder(&'static str),
}

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlMode, CrawlTarget, Coordinator, TargetBuilder};
pub use session::{CrawlSession, ProductCardCandidate, ProductRecord};
pub use state::TerminationReason;
