//! Catalog Crawler main entry point
//!
//! This is the command-line interface for the catalog crawl-and-extraction engine.

use anyhow::{bail, Context};
use catalog_crawler::config::{load_config_with_hash, validate, Config, FetchEngine};
use catalog_crawler::crawler::{
    crawl, CategoryPath, CrawlMode, CrawlOptions, ScrollCursor, TargetBuilder, TargetPosition,
};
use catalog_crawler::output::{
    generate_markdown_summary, load_statistics, print_statistics, OutputHandler,
    SqliteOutputHandler,
};
use catalog_crawler::storage::SqliteStorage;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Catalog Crawler: search a retail catalog and extract its products
///
/// Each query is crawled as an independent session, either page by page or
/// by scrolling an infinite listing, until the listing is exhausted or a
/// page/time ceiling is hit. Products are stored in SQLite and a markdown
/// price summary grouped by category is written at the end.
#[derive(Parser, Debug)]
#[command(name = "catalog-crawler")]
#[command(version)]
#[command(about = "Retail catalog crawler and product extractor", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Search terms, one session each
    #[arg(value_name = "QUERY", required_unless_present = "stats")]
    queries: Vec<String>,

    /// How listings are walked
    #[arg(long, value_enum, default_value_t = ModeArg::Paginated)]
    mode: ModeArg,

    /// Highest page index to fetch (paginated mode)
    #[arg(long)]
    max_pages: Option<u32>,

    /// Consecutive unchanged heights that end scrolling (scroll mode)
    #[arg(long)]
    stability_threshold: Option<u32>,

    /// Total scroll time allowed, in seconds (scroll mode)
    #[arg(long)]
    time_ceiling_secs: Option<u64>,

    /// Fetch engine, overriding the configuration
    #[arg(long, value_enum)]
    engine: Option<EngineArg>,

    /// Category label applied to every product instead of breadcrumbs
    #[arg(long)]
    category: Option<String>,

    /// Subcategory label (with --category)
    #[arg(long, requires = "category")]
    subcategory: Option<String>,

    /// Sub-subcategory label (with --category)
    #[arg(long, requires = "category")]
    sub_subcategory: Option<String>,

    /// Open each product's page to read its breadcrumbs
    #[arg(long)]
    detail_pages: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Paginated,
    Scroll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EngineArg {
    Static,
    Browser,
}

impl Cli {
    /// Resolves the crawl mode from configuration and flag overrides
    fn crawl_mode(&self, config: &Config) -> CrawlMode {
        match self.mode {
            ModeArg::Paginated => CrawlMode::Paginated {
                max_pages: self.max_pages.unwrap_or(config.pagination.max_pages).max(1),
            },
            ModeArg::Scroll => CrawlMode::Scroll {
                stability_threshold: self
                    .stability_threshold
                    .unwrap_or(config.scroll.stability_threshold)
                    .max(1),
                time_ceiling: Duration::from_secs(
                    self.time_ceiling_secs
                        .unwrap_or(config.scroll.time_ceiling_secs)
                        .max(1),
                ),
            },
        }
    }

    fn category_override(&self) -> Option<CategoryPath> {
        self.category.as_ref().map(|category| {
            CategoryPath::new(
                category.trim(),
                self.subcategory.as_deref().unwrap_or("").trim(),
                self.sub_subcategory.as_deref().unwrap_or("").trim(),
            )
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(engine) = cli.engine {
        config.fetch.engine = match engine {
            EngineArg::Static => FetchEngine::Static,
            EngineArg::Browser => FetchEngine::Browser,
        };
    }

    if cli.detail_pages {
        config.crawler.detail_pages = true;
        validate(&config).context("--detail-pages needs a detail breadcrumb selector")?;
    }

    let options = CrawlOptions::from_config(&config, cli.crawl_mode(&config))
        .with_category_override(cli.category_override());

    if cli.dry_run {
        handle_dry_run(&config, &options, &cli.queries)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(config, config_hash, options, cli.queries).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG`, when set, takes precedence over the flags.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if quiet {
            // Only show errors
            EnvFilter::new("error")
        } else {
            match verbose {
                0 => EnvFilter::new("catalog_crawler=info,warn"),
                1 => EnvFilter::new("catalog_crawler=debug,info"),
                2 => EnvFilter::new("catalog_crawler=trace,debug"),
                _ => EnvFilter::new("trace"),
            }
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(
    config: &Config,
    options: &CrawlOptions,
    queries: &[String],
) -> anyhow::Result<()> {
    println!("=== Catalog Crawler Dry Run ===\n");

    println!("Site:");
    println!("  Origin: {}", config.site.origin);
    println!("  Search URL: {}", config.site.search_url);
    if let Some(page_url) = &config.site.page_url {
        println!("  Page URL: {}", page_url);
    }
    println!("  Space encoding: {:?}", config.site.space_encoding);

    println!("\nCrawl:");
    println!("  Mode: {}", options.mode);
    println!("  Engine: {:?}", config.fetch.engine);
    println!("  Request timeout: {}s", config.fetch.request_timeout_secs);
    println!("  Element timeout: {:?}", options.element_timeout);
    if let Some(ready) = &options.ready_selector {
        println!("  Ready selector: {}", ready);
    }
    println!(
        "  Max concurrent sessions: {}",
        config.crawler.max_concurrent_sessions
    );
    if let Some(category) = &options.category_override {
        println!("  Category override: {}", category);
    }
    println!("  Detail pages: {}", options.detail_pages);

    println!("\nSelectors:");
    println!("  Card: {}", config.selectors.card.join(" | "));
    println!("  Name: {}", config.selectors.name.join(" | "));
    println!("  Price: {}", config.selectors.price.join(" | "));
    println!("  Link: {}", config.selectors.link.join(" | "));
    if !config.selectors.breadcrumb.is_empty() {
        println!("  Breadcrumb: {}", config.selectors.breadcrumb.join(" | "));
    }
    if !config.selectors.detail_breadcrumb.is_empty() {
        println!(
            "  Detail breadcrumb: {}",
            config.selectors.detail_breadcrumb.join(" | ")
        );
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Summary: {}", config.output.summary_path);

    let targets = TargetBuilder::from_site(&config.site);
    let position = match options.mode {
        CrawlMode::Paginated { .. } => TargetPosition::Page(1),
        CrawlMode::Scroll { .. } => TargetPosition::Scroll(ScrollCursor::origin()),
    };

    println!("\nQueries ({}):", queries.len());
    for query in queries {
        match targets.build(query, position) {
            Ok(target) => println!("  - \"{}\" -> {}", target.query(), target.url()),
            Err(e) => println!("  - \"{}\" -> invalid: {}", query, e),
        }
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))
        .context("failed to open database")?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    config_hash: String,
    options: CrawlOptions,
    queries: Vec<String>,
) -> anyhow::Result<()> {
    let storage = SqliteStorage::new(Path::new(&config.output.database_path))
        .context("failed to open database")?;
    let handler = SqliteOutputHandler::new(Arc::new(Mutex::new(storage)), config_hash);

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing current steps");
            signal_token.cancel();
        }
    });

    tracing::info!(
        "Crawling {} queries in {} mode",
        queries.len(),
        options.mode.name()
    );

    let mode = options.mode.name();
    let outcomes = crawl(Arc::new(config.clone()), options, queries, cancel).await?;

    let mut failures = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(session) => {
                handler.record_session(session, mode)?;
                println!(
                    "\"{}\": {} products, {} pages/scrolls, {} failed extractions, {} failed fetches ({})",
                    session.query(),
                    session.records().len(),
                    session.pages_or_scrolls_visited(),
                    session.failed_extractions(),
                    session.failed_fetches(),
                    session.termination_reason()
                );
            }
            Err(e) => {
                failures += 1;
                eprintln!("\"{}\": failed: {}", outcome.query, e);
            }
        }
    }

    let summary = handler.generate_summary()?;
    let summary_path = Path::new(&config.output.summary_path);
    generate_markdown_summary(&summary, summary_path)?;
    println!("\n✓ Summary written to: {}", summary_path.display());

    if failures == outcomes.len() {
        bail!("all {} sessions failed", failures);
    }

    Ok(())
}
