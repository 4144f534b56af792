use crate::url::SpaceEncoding;
use serde::Deserialize;

/// Main configuration structure for the catalog crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    pub selectors: SelectorConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub scroll: ScrollConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,
}

/// Catalog site and search endpoint configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Site origin used to absolutize root-relative product links
    pub origin: String,

    /// Search URL template containing `{query}`
    pub search_url: String,

    /// Paginated search URL template containing `{query}` and `{page}`
    #[serde(default)]
    pub page_url: Option<String>,

    /// How spaces are encoded in the query
    #[serde(default)]
    pub space_encoding: SpaceEncoding,
}

/// CSS selectors for product cards
///
/// Every field is an ordered list of fallbacks; the first selector yielding
/// a non-empty value wins.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SelectorConfig {
    /// Product card container
    pub card: Vec<String>,

    /// Product name within a card
    pub name: Vec<String>,

    /// Price text within a card
    pub price: Vec<String>,

    /// Product link within a card
    pub link: Vec<String>,

    /// Breadcrumb entries (document-wide) used to derive categories
    #[serde(default)]
    pub breadcrumb: Vec<String>,

    /// Breadcrumb entries on a product's own page, read when detail pages are enabled
    #[serde(default)]
    pub detail_breadcrumb: Vec<String>,

    /// Element the browser engine waits for before reading the listing
    #[serde(default)]
    pub ready: Option<String>,
}

/// Which fetch engine drives the crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchEngine {
    /// Plain HTTP GET, one document per request
    #[default]
    Static,
    /// Headless browser session that can wait and scroll
    Browser,
}

/// Fetch behaviour configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FetchConfig {
    pub engine: FetchEngine,

    /// Timeout for a single HTTP request (seconds)
    pub request_timeout_secs: u64,

    /// Timeout for waiting on a required element (seconds)
    pub element_timeout_secs: u64,

    /// User agent sent by the static engine
    pub user_agent: String,

    /// Run the browser without a window
    pub headless: bool,

    /// Explicit Chrome/Chromium executable
    pub chrome_path: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            engine: FetchEngine::Static,
            request_timeout_secs: 20,
            element_timeout_secs: 20,
            user_agent: format!("catalog-crawler/{}", env!("CARGO_PKG_VERSION")),
            headless: true,
            chrome_path: None,
        }
    }
}

/// Paginated mode configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PaginationConfig {
    /// Highest page index that will be requested
    pub max_pages: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { max_pages: 10 }
    }
}

/// Scroll mode configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ScrollConfig {
    /// Consecutive unchanged height readings required to declare loading complete
    pub stability_threshold: u32,

    /// Wall-clock ceiling for the whole scroll loop (seconds)
    pub time_ceiling_secs: u64,

    /// Pause after each scroll so lazy content can render (milliseconds)
    pub settle_delay_ms: u64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            stability_threshold: 1,
            time_ceiling_secs: 60,
            settle_delay_ms: 2000,
        }
    }
}

/// Crawler-wide configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// Maximum number of query sessions running at once
    pub max_concurrent_sessions: u32,

    /// Visit each new product's page to read its breadcrumbs
    pub detail_pages: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sessions: 2,
            detail_pages: false,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite database file
    pub database_path: String,

    /// Path to the markdown summary file
    pub summary_path: String,
}
