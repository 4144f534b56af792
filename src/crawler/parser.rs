//! Product extractor
//!
//! This module pulls product cards out of a listing document:
//! - Card discovery via an ordered list of container selectors
//! - Per-field fallback selectors (first non-empty match wins)
//! - Price text normalization
//! - Validation of candidates into records

use crate::config::SelectorConfig;
use crate::crawler::category::{resolve_category, CategoryPath};
use crate::session::{ProductCardCandidate, ProductRecord};
use crate::url::absolutize_link;
use crate::ConfigError;
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Compiled selectors for one site's product cards
#[derive(Debug, Clone)]
pub struct ListingSelectors {
    card: Vec<Selector>,
    name: Vec<Selector>,
    price: Vec<Selector>,
    link: Vec<Selector>,
    breadcrumb: Vec<Selector>,
    detail_breadcrumb: Vec<Selector>,
}

fn compile(selectors: &[String]) -> Result<Vec<Selector>, ConfigError> {
    selectors
        .iter()
        .map(|s| {
            Selector::parse(s).map_err(|e| ConfigError::InvalidSelector {
                selector: s.clone(),
                message: format!("{:?}", e),
            })
        })
        .collect()
}

impl ListingSelectors {
    /// Compiles selectors from configuration
    pub fn from_config(config: &SelectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            card: compile(&config.card)?,
            name: compile(&config.name)?,
            price: compile(&config.price)?,
            link: compile(&config.link)?,
            breadcrumb: compile(&config.breadcrumb)?,
            detail_breadcrumb: compile(&config.detail_breadcrumb)?,
        })
    }

    /// Returns true if product detail pages can be read for categories
    pub fn has_detail_breadcrumbs(&self) -> bool {
        !self.detail_breadcrumb.is_empty()
    }
}

/// Extracts every product card candidate from a listing document
///
/// # Extraction Rules
///
/// - Cards come from the first card selector that matches anything
/// - Name and price are the trimmed text of the first matching field
///   selector inside the card; empty text counts as absent
/// - Link is the `href` of the first matching link selector inside the card,
///   falling back to the card's own `href` when the card is an anchor
/// - Breadcrumbs are read once per document and shared by all its cards
///
/// Unparseable markup never fails: the HTML parser recovers and an
/// unrecognizable document simply yields no candidates.
///
/// # Example
///
/// ```
/// use catalog_crawler::config::SelectorConfig;
/// use catalog_crawler::crawler::{extract_candidates, ListingSelectors};
///
/// let config = SelectorConfig {
///     card: vec!["div.card".into()],
///     name: vec!["h3".into()],
///     price: vec![".price".into()],
///     link: vec!["a".into()],
///     breadcrumb: vec![],
///     detail_breadcrumb: vec![],
///     ready: None,
/// };
/// let selectors = ListingSelectors::from_config(&config).unwrap();
/// let html = r#"<div class="card"><h3>Air Max 90</h3><span class="price">£129.99</span><a href="/t/1">x</a></div>"#;
/// let candidates = extract_candidates(html, &selectors);
/// assert_eq!(candidates[0].name.as_deref(), Some("Air Max 90"));
/// ```
pub fn extract_candidates(html: &str, selectors: &ListingSelectors) -> Vec<ProductCardCandidate> {
    let document = Html::parse_document(html);

    let breadcrumbs = extract_breadcrumbs(&document, &selectors.breadcrumb);

    let cards: Vec<ElementRef> = selectors
        .card
        .iter()
        .map(|selector| document.select(selector).collect::<Vec<_>>())
        .find(|cards| !cards.is_empty())
        .unwrap_or_default();

    cards
        .into_iter()
        .map(|card| ProductCardCandidate {
            name: first_text(card, &selectors.name),
            price_raw: first_text(card, &selectors.price),
            link: first_href(card, &selectors.link),
            breadcrumbs: breadcrumbs.clone(),
        })
        .collect()
}

/// Returns the trimmed, whitespace-collapsed text of an element
fn element_text(element: ElementRef) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn first_text(card: ElementRef, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|selector| {
        card.select(selector)
            .map(element_text)
            .find(|text| !text.is_empty())
    })
}

fn first_href(card: ElementRef, selectors: &[Selector]) -> Option<String> {
    let nested = selectors.iter().find_map(|selector| {
        card.select(selector)
            .filter_map(|element| element.value().attr("href"))
            .map(str::trim)
            .find(|href| !href.is_empty())
            .map(str::to_string)
    });

    nested.or_else(|| {
        card.value()
            .attr("href")
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .map(str::to_string)
    })
}

/// Breadcrumb texts from the first selector with any non-blank entry
///
/// Blank entries keep their place so levels stay positional.
fn extract_breadcrumbs(document: &Html, selectors: &[Selector]) -> Vec<String> {
    selectors
        .iter()
        .map(|selector| document.select(selector).map(element_text).collect::<Vec<_>>())
        .find(|crumbs| crumbs.iter().any(|crumb| !crumb.is_empty()))
        .unwrap_or_default()
}

/// Normalizes displayed price text into a number
///
/// Every character outside `[0-9.]` is dropped and the remainder parsed as a
/// non-negative decimal. Returns `None` when nothing parsable remains.
///
/// # Examples
///
/// ```
/// use catalog_crawler::crawler::parse_price;
///
/// assert_eq!(parse_price("£1,099.99"), Some(1099.99));
/// assert_eq!(parse_price("Contact for price"), None);
/// ```
pub fn parse_price(raw: &str) -> Option<f64> {
    let digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if digits.is_empty() {
        return None;
    }

    digits
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
}

/// Normalizes price text, defaulting to 0.0 when it cannot be parsed
pub fn normalize_price(raw: &str) -> f64 {
    parse_price(raw).unwrap_or(0.0)
}

/// Context shared by every candidate validated from one document
#[derive(Debug, Clone)]
pub struct ValidationContext<'a> {
    /// Site origin for absolutizing root-relative links
    pub origin: &'a Url,

    /// Externally supplied category triple, overriding breadcrumbs
    pub category_override: Option<&'a CategoryPath>,

    /// Capture timestamp for records from this document
    pub captured_at: DateTime<Utc>,
}

/// Validates a candidate into a record
///
/// Returns `None` (a routine skip, not an error) when name, price text, or a
/// usable link is missing. Unparsable price text still yields a record with
/// `price_value` 0.0 and `price_parsed` false.
pub fn validate_candidate(
    candidate: ProductCardCandidate,
    context: &ValidationContext<'_>,
) -> Option<ProductRecord> {
    let name = candidate.name.filter(|n| !n.trim().is_empty())?;
    let price_raw = candidate.price_raw.filter(|p| !p.trim().is_empty())?;
    let link = candidate
        .link
        .as_deref()
        .and_then(|href| absolutize_link(href, context.origin))?;

    let parsed = parse_price(&price_raw);
    let category = resolve_category(&candidate.breadcrumbs, context.category_override);

    Some(ProductRecord {
        name: name.trim().to_string(),
        price_value: parsed.unwrap_or(0.0),
        price_parsed: parsed.is_some(),
        price_raw,
        link,
        category: category.category,
        subcategory: category.subcategory,
        sub_subcategory: category.sub_subcategory,
        captured_at: context.captured_at,
    })
}

/// Reads the breadcrumb trail from a product detail page
///
/// Returns an empty list when no detail breadcrumb selector matches a
/// non-blank entry.
pub fn extract_detail_breadcrumbs(html: &str, selectors: &ListingSelectors) -> Vec<String> {
    let document = Html::parse_document(html);
    extract_breadcrumbs(&document, &selectors.detail_breadcrumb)
}
