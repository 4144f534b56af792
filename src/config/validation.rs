use crate::config::types::{
    Config, CrawlerConfig, FetchConfig, OutputConfig, PaginationConfig, ScrollConfig,
    SelectorConfig, SiteConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_selector_config(&config.selectors)?;
    validate_fetch_config(&config.fetch)?;
    validate_pagination_config(&config.pagination)?;
    validate_scroll_config(&config.scroll)?;
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    validate_detail_pages(config.crawler.detail_pages, &config.selectors)?;
    Ok(())
}

/// Detail pages need a selector to read breadcrumbs from
pub(crate) fn validate_detail_pages(
    enabled: bool,
    selectors: &SelectorConfig,
) -> Result<(), ConfigError> {
    if enabled && selectors.detail_breadcrumb.is_empty() {
        return Err(ConfigError::Validation(
            "crawler.detail-pages requires selectors.detail-breadcrumb".to_string(),
        ));
    }
    Ok(())
}

/// Validates the site origin and search templates
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    validate_http_url("origin", &config.origin)?;

    validate_template("search_url", &config.search_url, &["{query}"])?;

    if let Some(page_url) = &config.page_url {
        validate_template("page_url", page_url, &["{query}", "{page}"])?;
    }

    Ok(())
}

/// Validates that a URL template has its placeholders and parses once filled
fn validate_template(name: &str, template: &str, placeholders: &[&str]) -> Result<(), ConfigError> {
    for placeholder in placeholders {
        if !template.contains(placeholder) {
            return Err(ConfigError::Validation(format!(
                "{} must contain {}, got '{}'",
                name, placeholder, template
            )));
        }
    }

    let sample = template.replace("{query}", "q").replace("{page}", "1");
    validate_http_url(name, &sample)
}

/// Validates that a string is an absolute HTTP(S) URL
fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            name, value
        )));
    }

    Ok(())
}

/// Validates that every selector compiles and the required ones are present
fn validate_selector_config(config: &SelectorConfig) -> Result<(), ConfigError> {
    for (name, list) in [
        ("card", &config.card),
        ("name", &config.name),
        ("price", &config.price),
        ("link", &config.link),
    ] {
        if list.is_empty() {
            return Err(ConfigError::Validation(format!(
                "selectors.{} must list at least one selector",
                name
            )));
        }
    }

    let all = config
        .card
        .iter()
        .chain(&config.name)
        .chain(&config.price)
        .chain(&config.link)
        .chain(&config.breadcrumb)
        .chain(&config.detail_breadcrumb)
        .chain(config.ready.iter());

    for selector in all {
        validate_selector(selector)?;
    }

    Ok(())
}

/// Validates a single CSS selector
pub(crate) fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector {
            selector: selector.to_string(),
            message: format!("{:?}", e),
        })
}

/// Validates fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    if config.element_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "element_timeout_secs must be >= 1, got {}",
            config.element_timeout_secs
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates paginated mode configuration
fn validate_pagination_config(config: &PaginationConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }
    Ok(())
}

/// Validates scroll mode configuration
fn validate_scroll_config(config: &ScrollConfig) -> Result<(), ConfigError> {
    if config.stability_threshold < 1 {
        return Err(ConfigError::Validation(format!(
            "stability_threshold must be >= 1, got {}",
            config.stability_threshold
        )));
    }

    if config.time_ceiling_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "time_ceiling_secs must be >= 1, got {}",
            config.time_ceiling_secs
        )));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_sessions < 1 || config.max_concurrent_sessions > 16 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_sessions must be between 1 and 16, got {}",
            config.max_concurrent_sessions
        )));
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.summary_path.is_empty() {
        return Err(ConfigError::Validation(
            "summary_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_template() {
        assert!(validate_template("t", "https://shop.example.com/w?q={query}", &["{query}"]).is_ok());
        assert!(validate_template(
            "t",
            "https://shop.example.com/w?q={query}&page={page}",
            &["{query}", "{page}"]
        )
        .is_ok());

        assert!(validate_template("t", "https://shop.example.com/w", &["{query}"]).is_err());
        assert!(validate_template("t", "https://x.com/w?q={query}", &["{query}", "{page}"]).is_err());
        assert!(validate_template("t", "ftp://x.com/{query}", &["{query}"]).is_err());
        assert!(validate_template("t", "not a url {query}", &["{query}"]).is_err());
    }

    #[test]
    fn test_validate_selector() {
        assert!(validate_selector("div.product-card__body").is_ok());
        assert!(validate_selector("nav[aria-label='Breadcrumbs'] li a").is_ok());
        assert!(validate_selector("[data-test=\"product-price\"]").is_ok());

        assert!(matches!(
            validate_selector("div[[").unwrap_err(),
            ConfigError::InvalidSelector { .. }
        ));
    }

    #[test]
    fn test_detail_pages_need_selector() {
        let mut selectors = SelectorConfig {
            card: vec!["div.card".into()],
            name: vec![".name".into()],
            price: vec![".price".into()],
            link: vec!["a".into()],
            breadcrumb: vec![],
            detail_breadcrumb: vec![],
            ready: None,
        };

        assert!(validate_detail_pages(false, &selectors).is_ok());
        assert!(validate_detail_pages(true, &selectors).is_err());

        selectors.detail_breadcrumb = vec!["nav[aria-label='Breadcrumbs'] li a".into()];
        assert!(validate_detail_pages(true, &selectors).is_ok());
    }

    #[test]
    fn test_validate_scroll_config() {
        assert!(validate_scroll_config(&ScrollConfig::default()).is_ok());

        let zero_threshold = ScrollConfig {
            stability_threshold: 0,
            ..ScrollConfig::default()
        };
        assert!(validate_scroll_config(&zero_threshold).is_err());
    }
}
