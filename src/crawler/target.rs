//! Target builder: turns a query and a position into a listing URL

use crate::config::SiteConfig;
use crate::url::{encode_query, normalize_query, SpaceEncoding};
use crate::{CrawlError, UrlError};
use std::fmt;
use url::Url;

/// Opaque scroll position marker (last measured document height)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollCursor(u64);

impl ScrollCursor {
    /// The position before any scroll has been issued
    pub fn origin() -> Self {
        Self(0)
    }

    /// A cursor at a measured document height
    pub fn at_height(height: u64) -> Self {
        Self(height)
    }

    pub fn height(&self) -> u64 {
        self.0
    }
}

/// Where in the listing a target points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetPosition {
    /// 1-based page index (paginated mode)
    Page(u32),

    /// Scroll state (scroll mode)
    Scroll(ScrollCursor),
}

impl fmt::Display for TargetPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page(index) => write!(f, "page {}", index),
            Self::Scroll(cursor) => write!(f, "scroll @{}px", cursor.height()),
        }
    }
}

/// One immutable crawl step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    query: String,
    encoded_query: String,
    position: TargetPosition,
    url: Url,
}

impl CrawlTarget {
    /// The whitespace-normalized query
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The query as written into the URL
    pub fn encoded_query(&self) -> &str {
        &self.encoded_query
    }

    pub fn position(&self) -> TargetPosition {
        self.position
    }

    /// The page index, if this is a paginated target
    pub fn page_index(&self) -> Option<u32> {
        match self.position {
            TargetPosition::Page(index) => Some(index),
            TargetPosition::Scroll(_) => None,
        }
    }

    /// The listing URL to fetch
    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Builds `CrawlTarget`s from the site's search URL templates
///
/// Templates use `{query}` and `{page}` placeholders. Paginated targets use
/// the page template when one is configured; otherwise page 1 maps to the
/// plain search template and later pages cannot be addressed.
#[derive(Debug, Clone)]
pub struct TargetBuilder {
    search_template: String,
    page_template: Option<String>,
    spaces: SpaceEncoding,
}

impl TargetBuilder {
    /// Creates a builder from explicit templates
    pub fn new(
        search_template: impl Into<String>,
        page_template: Option<String>,
        spaces: SpaceEncoding,
    ) -> Self {
        Self {
            search_template: search_template.into(),
            page_template,
            spaces,
        }
    }

    /// Creates a builder from site configuration
    pub fn from_site(site: &SiteConfig) -> Self {
        Self::new(
            site.search_url.clone(),
            site.page_url.clone(),
            site.space_encoding,
        )
    }

    /// Returns true if page indices beyond 1 can be addressed
    pub fn supports_pages(&self) -> bool {
        self.page_template.is_some()
    }

    /// Builds a target for one page or scroll step
    ///
    /// # Arguments
    ///
    /// * `query` - Search text; must be non-empty after trimming
    /// * `position` - Page index (≥ 1) or scroll cursor
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlTarget)` - The target and its URL
    /// * `Err(CrawlError::InvalidQuery)` - The query is blank or the page index is 0
    /// * `Err(CrawlError::Url)` - The filled template is not a valid URL
    ///
    /// # Example
    ///
    /// ```
    /// use catalog_crawler::crawler::{TargetBuilder, TargetPosition};
    /// use catalog_crawler::url::SpaceEncoding;
    ///
    /// let builder = TargetBuilder::new(
    ///     "https://www.nike.com/gb/w?q={query}",
    ///     Some("https://www.nike.com/gb/w?q={query}&page={page}".to_string()),
    ///     SpaceEncoding::Plus,
    /// );
    /// let target = builder.build("air max", TargetPosition::Page(2)).unwrap();
    /// assert_eq!(target.url().as_str(), "https://www.nike.com/gb/w?q=air+max&page=2");
    /// ```
    pub fn build(&self, query: &str, position: TargetPosition) -> Result<CrawlTarget, CrawlError> {
        let normalized = normalize_query(query);
        if normalized.is_empty() {
            return Err(CrawlError::InvalidQuery(
                "query must not be empty".to_string(),
            ));
        }

        let encoded = encode_query(&normalized, self.spaces);

        let filled = match position {
            TargetPosition::Page(0) => {
                return Err(CrawlError::InvalidQuery(
                    "page index must be at least 1".to_string(),
                ));
            }
            TargetPosition::Page(index) => match &self.page_template {
                Some(template) => template
                    .replace("{query}", &encoded)
                    .replace("{page}", &index.to_string()),
                None if index == 1 => self.search_template.replace("{query}", &encoded),
                None => return Err(UrlError::MissingPlaceholder("{page}").into()),
            },
            TargetPosition::Scroll(_) => self.search_template.replace("{query}", &encoded),
        };

        let url = Url::parse(&filled).map_err(|e| UrlError::Parse(format!("{}: {}", filled, e)))?;

        Ok(CrawlTarget {
            query: normalized,
            encoded_query: encoded,
            position,
            url,
        })
    }
}
