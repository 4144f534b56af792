//! Integration tests for the crawler
//!
//! These tests use wiremock to serve listing pages and a scripted browser
//! session to drive scroll mode, and exercise the full crawl cycle from
//! configuration to stored products.

use async_trait::async_trait;
use catalog_crawler::config::{load_config_with_hash, parse_config, Config};
use catalog_crawler::crawler::{
    crawl, run_crawl, BrowserSession, CategoryPath, Coordinator, CrawlMode, CrawlOptions,
    DynamicFetcher,
};
use catalog_crawler::output::{
    generate_markdown_summary, load_statistics, OutputHandler, SqliteOutputHandler,
};
use catalog_crawler::storage::{SqliteStorage, Storage};
use catalog_crawler::{CrawlError, TerminationReason};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a TOML configuration pointing at the given origin
fn config_toml(origin: &str) -> String {
    format!(
        r#"
[site]
origin = "{origin}"
search-url = "{origin}/search?q={{query}}"
page-url = "{origin}/search?q={{query}}&page={{page}}"

[selectors]
card = ["li.product-card", "div.card"]
name = [".product-card__title", ".name"]
price = [".product-price", ".price"]
link = ["a.product-card__link", "a"]
breadcrumb = ["nav.breadcrumb li"]

[fetch]
request-timeout-secs = 5

[output]
database-path = "./unused.db"
summary-path = "./unused.md"
"#,
        origin = origin
    )
}

fn create_test_config(origin: &str) -> Config {
    parse_config(&config_toml(origin)).expect("Failed to parse test config")
}

/// One product card; `None` leaves the price element out
fn card(name: &str, price: Option<&str>, href: &str) -> String {
    let price = price
        .map(|p| format!(r#"<div class="product-price">{}</div>"#, p))
        .unwrap_or_default();
    format!(
        r#"<li class="product-card"><div class="product-card__title">{}</div>{}<a class="product-card__link" href="{}">View</a></li>"#,
        name, price, href
    )
}

fn listing_page(cards: &[String]) -> String {
    format!(
        r#"<html><body>
<nav class="breadcrumb"><ol><li>Men</li><li>Shoes</li><li>Running</li></ol></nav>
<ul class="grid">{}</ul>
</body></html>"#,
        cards.concat()
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, query: &str, page: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", query))
        .and(query_param("page", page))
        .respond_with(response)
        .mount(server)
        .await;
}

fn paginated(config: &Config, max_pages: u32) -> CrawlOptions {
    CrawlOptions::from_config(config, CrawlMode::Paginated { max_pages })
}

#[tokio::test]
async fn test_paginated_crawl_end_to_end() {
    let server = MockServer::start().await;
    let config = create_test_config(&server.uri());

    // 18 complete cards and 2 without a price element
    let mut cards: Vec<String> = (1..=18)
        .map(|i| card(&format!("Air Max {}", i), Some("£119.99"), &format!("/t/air-max-{}", i)))
        .collect();
    cards.push(card("Air Max Mystery", None, "/t/air-max-mystery"));
    cards.push(card("Air Max Secret", None, "/t/air-max-secret"));

    mount_page(&server, "air max", "1", html(listing_page(&cards))).await;
    mount_page(&server, "air max", "2", html(listing_page(&[]))).await;

    let session = run_crawl(
        &config,
        paginated(&config, 2),
        "air max",
        CancellationToken::new(),
    )
    .await
    .expect("Crawl failed");

    assert_eq!(session.query(), "air max");
    assert_eq!(session.records().len(), 18);
    assert_eq!(session.failed_extractions(), 2);
    assert_eq!(session.failed_fetches(), 0);
    assert_eq!(session.pages_or_scrolls_visited(), 2);
    assert_eq!(session.termination_reason(), TerminationReason::Exhausted);

    let first = &session.records()[0];
    assert_eq!(first.name, "Air Max 1");
    assert_eq!(first.price_value, 119.99);
    assert_eq!(first.link, format!("{}/t/air-max-1", server.uri()));
    assert_eq!(
        first.category_path(),
        CategoryPath::new("Men", "Shoes", "Running")
    );
}

#[tokio::test]
async fn test_price_normalization_in_crawl() {
    let server = MockServer::start().await;
    let config = create_test_config(&server.uri());

    let cards = vec![
        card("Premium Boot", Some("£1,099.99"), "/t/premium-boot"),
        card("Made To Order", Some("Contact for price"), "/t/made-to-order"),
    ];
    mount_page(&server, "boots", "1", html(listing_page(&cards))).await;

    let session = run_crawl(&config, paginated(&config, 1), "boots", CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(session.records().len(), 2);
    assert_eq!(session.records()[0].price_value, 1099.99);
    assert!(session.records()[0].price_parsed);

    let unpriced = &session.records()[1];
    assert_eq!(unpriced.price_raw, "Contact for price");
    assert_eq!(unpriced.price_value, 0.0);
    assert!(!unpriced.price_parsed);
    assert_eq!(session.termination_reason(), TerminationReason::MaxPagesReached);
}

#[tokio::test]
async fn test_duplicates_across_pages() {
    let server = MockServer::start().await;
    let config = create_test_config(&server.uri());

    let page1 = vec![
        card("Dunk Low", Some("£99.99"), "/t/dunk-low"),
        card("Dunk High", Some("£109.99"), "/t/dunk-high"),
    ];
    let page2 = vec![
        card("Dunk Low (again)", Some("£89.99"), "/t/dunk-low"),
        card("Dunk Mid", Some("£104.99"), "/t/dunk-mid"),
    ];
    mount_page(&server, "dunk", "1", html(listing_page(&page1))).await;
    mount_page(&server, "dunk", "2", html(listing_page(&page2))).await;
    mount_page(&server, "dunk", "3", html(listing_page(&[]))).await;

    let session = run_crawl(&config, paginated(&config, 5), "dunk", CancellationToken::new())
        .await
        .expect("Crawl failed");

    let names: Vec<&str> = session.records().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Dunk Low", "Dunk High", "Dunk Mid"]);
    assert_eq!(session.pages_or_scrolls_visited(), 3);
    assert_eq!(session.termination_reason(), TerminationReason::Exhausted);
}

#[tokio::test]
async fn test_server_error_page_is_skipped() {
    let server = MockServer::start().await;
    let config = create_test_config(&server.uri());

    mount_page(
        &server,
        "socks",
        "1",
        html(listing_page(&[card("Crew Sock", Some("£12.00"), "/t/crew")])),
    )
    .await;
    mount_page(&server, "socks", "2", ResponseTemplate::new(503)).await;
    mount_page(
        &server,
        "socks",
        "3",
        html(listing_page(&[card("Ankle Sock", Some("£10.00"), "/t/ankle")])),
    )
    .await;
    mount_page(&server, "socks", "4", html(listing_page(&[]))).await;

    let session = run_crawl(&config, paginated(&config, 10), "socks", CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(session.records().len(), 2);
    assert_eq!(session.failed_fetches(), 1);
    assert_eq!(session.pages_or_scrolls_visited(), 4);
    assert_eq!(session.termination_reason(), TerminationReason::Exhausted);
}

fn product_page(crumbs: &[&str]) -> String {
    let items: String = crumbs
        .iter()
        .map(|crumb| format!("<li><a href='/c'>{}</a></li>", crumb))
        .collect();
    format!(
        r#"<html><body><nav aria-label="Breadcrumbs"><ol>{}</ol></nav><h1>Product</h1></body></html>"#,
        items
    )
}

#[tokio::test]
async fn test_detail_pages_refine_categories() {
    let server = MockServer::start().await;
    let mut config = create_test_config(&server.uri());
    config.selectors.detail_breadcrumb = vec!["nav[aria-label='Breadcrumbs'] li a".to_string()];
    config.crawler.detail_pages = true;

    mount_page(
        &server,
        "dunk",
        "1",
        html(listing_page(&[
            card("Dunk Low", Some("£99.99"), "/t/dunk-low"),
            card("Pegasus 41", Some("£124.99"), "/t/pegasus-41"),
        ])),
    )
    .await;
    mount_page(&server, "dunk", "2", html(listing_page(&[]))).await;

    Mock::given(method("GET"))
        .and(path("/t/dunk-low"))
        .respond_with(html(product_page(&["Women", "Shoes", "Lifestyle"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/t/pegasus-41"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let options = paginated(&config, 5);
    assert!(options.detail_pages);

    let session = run_crawl(&config, options, "dunk", CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(session.records().len(), 2);
    assert_eq!(
        session.records()[0].category_path(),
        CategoryPath::new("Women", "Shoes", "Lifestyle")
    );
    // A detail page that fails keeps the listing category and counts as a failed fetch
    assert_eq!(
        session.records()[1].category_path(),
        CategoryPath::new("Men", "Shoes", "Running")
    );
    assert_eq!(session.failed_fetches(), 1);
    assert_eq!(session.termination_reason(), TerminationReason::Exhausted);
}

#[tokio::test]
async fn test_blank_query_issues_no_request() {
    let server = MockServer::start().await;
    let config = create_test_config(&server.uri());

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = run_crawl(&config, paginated(&config, 3), "   ", CancellationToken::new()).await;
    assert!(matches!(result, Err(CrawlError::InvalidQuery(_))));
}

#[tokio::test]
async fn test_cancelled_crawl_issues_no_request() {
    let server = MockServer::start().await;
    let config = create_test_config(&server.uri());

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let session = run_crawl(&config, paginated(&config, 3), "air max", cancel)
        .await
        .expect("Cancelled crawl should still produce a session");

    assert!(session.records().is_empty());
    assert_eq!(session.pages_or_scrolls_visited(), 0);
    assert_eq!(session.termination_reason(), TerminationReason::Cancelled);
}

#[tokio::test]
async fn test_multiple_queries_are_isolated() {
    let server = MockServer::start().await;
    let config = Arc::new(create_test_config(&server.uri()));

    mount_page(
        &server,
        "jordan",
        "1",
        html(listing_page(&[card("Jordan 1", Some("£139.99"), "/t/jordan-1")])),
    )
    .await;
    mount_page(&server, "jordan", "2", html(listing_page(&[]))).await;

    let options = paginated(&config, 2);
    let outcomes = crawl(
        config,
        options,
        vec!["jordan".to_string(), "  ".to_string()],
        CancellationToken::new(),
    )
    .await
    .expect("Scheduler failed");

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].query, "jordan");
    let session = outcomes[0].result.as_ref().expect("First query failed");
    assert_eq!(session.records().len(), 1);
    assert!(matches!(outcomes[1].result, Err(CrawlError::InvalidQuery(_))));
}

/// Browser session replaying a fixed sequence of document heights
struct ScriptedBrowser {
    heights: Vec<u64>,
    scrolls: usize,
    html: String,
    url: Option<Url>,
}

impl ScriptedBrowser {
    fn new(heights: Vec<u64>, html: String) -> Self {
        Self {
            heights,
            scrolls: 0,
            html,
            url: None,
        }
    }
}

#[async_trait]
impl BrowserSession for ScriptedBrowser {
    async fn goto(&mut self, url: &Url) -> Result<(), CrawlError> {
        self.url = Some(url.clone());
        Ok(())
    }

    async fn has_element(&mut self, _selector: &str) -> Result<bool, CrawlError> {
        Ok(true)
    }

    async fn scroll_to_end(&mut self) -> Result<(), CrawlError> {
        self.scrolls += 1;
        Ok(())
    }

    async fn document_height(&mut self) -> Result<u64, CrawlError> {
        // Past the script, keep growing so the listing never settles
        let index = self.scrolls.saturating_sub(1);
        Ok(self
            .heights
            .get(index)
            .copied()
            .unwrap_or(10_000 + index as u64))
    }

    async fn content(&mut self) -> Result<String, CrawlError> {
        Ok(self.html.clone())
    }

    async fn current_url(&mut self) -> Result<Url, CrawlError> {
        self.url
            .clone()
            .ok_or_else(|| CrawlError::Browser("no page loaded".to_string()))
    }

    async fn close(&mut self) -> Result<(), CrawlError> {
        Ok(())
    }
}

fn scroll_options(config: &Config, threshold: u32, ceiling: Duration) -> CrawlOptions {
    CrawlOptions::from_config(
        config,
        CrawlMode::Scroll {
            stability_threshold: threshold,
            time_ceiling: ceiling,
        },
    )
}

#[tokio::test]
async fn test_scroll_crawl_settles() {
    let config = create_test_config("https://shop.example");
    let cards: Vec<String> = (1..=5)
        .map(|i| card(&format!("Pegasus {}", i), Some("£124.99"), &format!("/t/pegasus-{}", i)))
        .collect();

    let browser = ScriptedBrowser::new(vec![100, 200, 200, 200], listing_page(&cards));
    let fetcher = DynamicFetcher::new(browser, Duration::ZERO);

    let session = Coordinator::new(
        &config,
        fetcher,
        scroll_options(&config, 1, Duration::from_secs(30)),
        CancellationToken::new(),
    )
    .expect("Failed to create coordinator")
    .run("pegasus")
    .await
    .expect("Crawl failed");

    assert_eq!(session.termination_reason(), TerminationReason::HeightStable);
    assert_eq!(session.pages_or_scrolls_visited(), 3);
    assert_eq!(session.records().len(), 5);
    assert_eq!(session.records()[0].link, "https://shop.example/t/pegasus-1");
}

#[tokio::test]
async fn test_scroll_crawl_times_out() {
    let config = create_test_config("https://shop.example");
    let browser = ScriptedBrowser::new(
        Vec::new(),
        listing_page(&[card("Vomero", Some("£149.99"), "/t/vomero")]),
    );
    let fetcher = DynamicFetcher::new(browser, Duration::from_millis(20));

    let session = Coordinator::new(
        &config,
        fetcher,
        scroll_options(&config, 2, Duration::from_millis(200)),
        CancellationToken::new(),
    )
    .expect("Failed to create coordinator")
    .run("vomero")
    .await
    .expect("Crawl failed");

    assert_eq!(session.termination_reason(), TerminationReason::TimedOut);
    assert!(session.pages_or_scrolls_visited() >= 1);
    // The partial listing is still captured
    assert_eq!(session.records().len(), 1);
}

#[tokio::test]
async fn test_sessions_persist_and_summarize() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = dir.path().join("config.toml");
    let db_path = dir.path().join("catalog.db");
    let summary_path = dir.path().join("summary.md");

    let mut file = std::fs::File::create(&config_path).expect("Failed to create config");
    file.write_all(config_toml(&server.uri()).as_bytes())
        .expect("Failed to write config");

    let (config, hash) = load_config_with_hash(&config_path).expect("Failed to load config");
    assert_eq!(hash.len(), 64);

    let cards = vec![
        card("Blazer Mid", Some("£89.99"), "/t/blazer-mid"),
        card("Blazer Low", Some("£79.99"), "/t/blazer-low"),
        card("Blazer Custom", Some("POA"), "/t/blazer-custom"),
    ];
    mount_page(&server, "blazer", "1", html(listing_page(&cards))).await;
    mount_page(&server, "blazer", "2", html(listing_page(&[]))).await;

    let session = run_crawl(&config, paginated(&config, 3), "blazer", CancellationToken::new())
        .await
        .expect("Crawl failed");

    let storage = SqliteStorage::new(&db_path).expect("Failed to open storage");
    let handler = SqliteOutputHandler::new(Arc::new(Mutex::new(storage)), hash.clone());
    let run_id = handler
        .record_session(&session, "paginated")
        .expect("Failed to record session");

    let summary = handler.generate_summary().expect("Failed to summarize");
    generate_markdown_summary(&summary, &summary_path).expect("Failed to write summary");

    let markdown = std::fs::read_to_string(&summary_path).expect("Failed to read summary");
    assert!(markdown.contains(&format!("## \"blazer\" (run {})", run_id)));
    assert!(markdown.contains("- **Unparsed Prices**: 1"));
    assert!(markdown.contains("| Men | 3 | 2 | 79.99 | 89.99 | 84.99 |"));

    // Reopen to make sure everything reached disk
    let storage = SqliteStorage::new(&db_path).expect("Failed to reopen storage");
    let run = storage.get_run(run_id).expect("Run missing");
    assert_eq!(run.config_hash, hash);
    assert_eq!(run.termination_reason, Some(TerminationReason::Exhausted));
    assert_eq!(run.pages_visited, 2);

    let products = storage.get_products(run_id).expect("Products missing");
    assert_eq!(products.len(), 3);
    assert_eq!(products[0].name, "Blazer Mid");

    let stats = load_statistics(&storage).expect("Failed to load statistics");
    assert_eq!(stats.total_runs, 1);
    assert_eq!(stats.total_products, 3);
}
