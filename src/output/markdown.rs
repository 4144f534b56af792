//! Markdown summary generation
//!
//! This module generates human-readable markdown summaries of crawl results:
//! one section per session with its audit counters and a price table grouped
//! by category.

use crate::output::traits::{CrawlSummary, OutputResult, RunSummary};
use crate::storage::CategoryPriceStats;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Generates a markdown summary and writes it to a file
///
/// # Arguments
///
/// * `summary` - The crawl summary data
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(summary: &CrawlSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

fn format_price(price: Option<f64>) -> String {
    price
        .map(|p| format!("{:.2}", p))
        .unwrap_or_else(|| "-".to_string())
}

fn category_label(stats: &CategoryPriceStats) -> &str {
    if stats.category.is_empty() {
        "(uncategorized)"
    } else {
        &stats.category
    }
}

/// Formats a crawl summary as markdown
pub fn format_markdown_summary(summary: &CrawlSummary) -> String {
    let mut md = String::new();

    md.push_str("# Catalog Crawl Summary\n\n");
    md.push_str(&format!(
        "Generated {}\n\n",
        summary.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    // Overall statistics
    md.push_str("## Overall\n\n");
    md.push_str(&format!("- **Sessions**: {}\n", summary.runs.len()));
    md.push_str(&format!("- **Products**: {}\n", summary.total_records()));
    md.push_str(&format!(
        "- **Pages/Scrolls Visited**: {}\n",
        summary.total_steps()
    ));
    md.push_str(&format!(
        "- **Truncated Sessions**: {}\n\n",
        summary.truncated_runs()
    ));

    for run in &summary.runs {
        format_run(&mut md, run);
    }

    md
}

fn format_run(md: &mut String, summary: &RunSummary) {
    let run = &summary.run;

    md.push_str(&format!("## \"{}\" (run {})\n\n", run.query, run.id));
    md.push_str(&format!("- **Mode**: {}\n", run.mode));
    md.push_str(&format!(
        "- **Termination**: {}\n",
        run.termination_reason
            .map(|r| r.to_string())
            .unwrap_or_else(|| "unfinished".to_string())
    ));
    if let Some(duration) = summary.duration_seconds() {
        md.push_str(&format!("- **Duration**: {} seconds\n", duration));
    }
    md.push_str(&format!("- **Pages/Scrolls Visited**: {}\n", run.pages_visited));
    md.push_str(&format!("- **Products**: {}\n", summary.record_count));
    md.push_str(&format!(
        "- **Failed Extractions**: {}\n",
        run.failed_extractions
    ));
    md.push_str(&format!("- **Failed Fetches**: {}\n", run.failed_fetches));
    md.push_str(&format!(
        "- **Unparsed Prices**: {}\n",
        summary.unparsed_prices()
    ));
    md.push_str(&format!("- **Config Hash**: {}\n\n", run.config_hash));

    if summary.categories.is_empty() {
        md.push_str("No products recorded.\n\n");
        return;
    }

    md.push_str("| Category | Products | Priced | Min | Max | Mean |\n");
    md.push_str("|----------|----------|--------|-----|-----|------|\n");
    for stats in &summary.categories {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            category_label(stats),
            stats.count,
            stats.parsed_count,
            format_price(stats.min_price),
            format_price(stats.max_price),
            format_price(stats.mean_price)
        ));
    }
    md.push('\n');
}
