use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use catalog_crawler::config::load_config;
///
/// let config = load_config(Path::new("catalog.toml")).unwrap();
/// println!("Search template: {}", config.site.search_url);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;

    validate(&config)?;

    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// This is stored with every persisted session so results can be traced back
/// to the configuration that produced them.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok((Config, String))` - Successfully loaded configuration and its hash
/// * `Err(ConfigError)` - Failed to load or parse the configuration
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchEngine;
    use crate::url::SpaceEncoding;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[site]
origin = "https://www.nike.com"
search-url = "https://www.nike.com/gb/w?q={query}"

[selectors]
card = ["div.product-card__body"]
name = ["div.product-card__title"]
price = ["div.product-price"]
link = ["a.product-card__link-overlay"]

[output]
database-path = "./test.db"
summary-path = "./summary.md"
"#;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_minimal_config_uses_defaults() {
        let file = create_temp_config(MINIMAL);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.site.space_encoding, SpaceEncoding::Plus);
        assert_eq!(config.site.page_url, None);
        assert_eq!(config.fetch.engine, FetchEngine::Static);
        assert_eq!(config.fetch.request_timeout_secs, 20);
        assert_eq!(config.fetch.element_timeout_secs, 20);
        assert_eq!(config.pagination.max_pages, 10);
        assert_eq!(config.scroll.stability_threshold, 1);
        assert_eq!(config.scroll.time_ceiling_secs, 60);
        assert_eq!(config.crawler.max_concurrent_sessions, 2);
        assert!(config.selectors.breadcrumb.is_empty());
    }

    #[test]
    fn test_load_full_config() {
        let config_content = r#"
[site]
origin = "https://www.nike.com"
search-url = "https://www.nike.com/gb/search?q={query}"
page-url = "https://www.nike.com/gb/search?q={query}&page={page}"
space-encoding = "percent"

[selectors]
card = ["div.product-card__body", "div.product-card"]
name = ["div.product-card__title"]
price = ["div.product-price", "[data-test='product-price']"]
link = ["a.product-card__link-overlay"]
breadcrumb = ["nav[aria-label='Breadcrumbs'] li a"]
ready = "div.product-grid"

[fetch]
engine = "browser"
element-timeout-secs = 5
headless = false

[pagination]
max-pages = 3

[scroll]
stability-threshold = 2
time-ceiling-secs = 30
settle-delay-ms = 500

[crawler]
max-concurrent-sessions = 4

[output]
database-path = "./test.db"
summary-path = "./summary.md"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.site.space_encoding, SpaceEncoding::Percent);
        assert_eq!(config.selectors.card.len(), 2);
        assert_eq!(config.selectors.ready.as_deref(), Some("div.product-grid"));
        assert_eq!(config.fetch.engine, FetchEngine::Browser);
        assert_eq!(config.fetch.element_timeout_secs, 5);
        assert_eq!(config.fetch.request_timeout_secs, 20);
        assert!(!config.fetch.headless);
        assert_eq!(config.pagination.max_pages, 3);
        assert_eq!(config.scroll.stability_threshold, 2);
        assert_eq!(config.scroll.settle_delay_ms, 500);
        assert_eq!(config.crawler.max_concurrent_sessions, 4);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/catalog.toml"));
        assert!(matches!(result.unwrap_err(), ConfigError::Io(_)));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let content = MINIMAL.replace("?q={query}", "?q=shoes");
        let result = parse_config(&content);
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_load_config_with_bad_selector() {
        let content = MINIMAL.replace("div.product-price", "div[[");
        let result = parse_config(&content);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidSelector { .. }
        ));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config(MINIMAL);

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
