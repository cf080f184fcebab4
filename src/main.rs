// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (tracing) on stderr
// 3. Dispatch to the appropriate subcommand handler
// 4. Print the report (table, JSON, and optionally an HTML file)
// 5. Exit with proper code (0 = compliant, 1 = violations found, 2 = error)
//
// Progress messages go to stderr so that `--json` output on stdout can be
// piped straight into other tools.
// =============================================================================

mod cli; // src/cli.rs - command-line parsing
mod crawl; // src/crawl/ - same-origin page discovery
mod fetch; // src/fetch.rs - HTTP fetching behind a trait
mod report; // src/report/ - aggregation and rendering
mod rules; // src/rules/ - rule catalogue, checks and engine
mod scan; // src/scan.rs - crawl + scan orchestration

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::{Cli, Commands, CrawlArgs};
use crawl::{CrawlProgress, CrawlOptions};
use fetch::HttpFetcher;
use report::{AggregateReport, ComplianceStatus, ScanProgress};
use rules::RuleEngine;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole anyhow context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Logs go to stderr; RUST_LOG overrides the default "warn" level
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

// Returns:
//   Ok(0) = compliant (or nothing to judge)
//   Ok(1) = violations found
//   Ok(2) = the scan itself failed
//   Err = unexpected error (bad arguments, unwritable file, ...)
async fn run(cli: Cli) -> Result<i32> {
    let fetcher = HttpFetcher::new(cli.fetch.to_config()).context("failed to set up HTTP client")?;

    match cli.command {
        Commands::Crawl { url, crawl, json } => handle_crawl(&fetcher, &url, &crawl, json).await,
        Commands::Scan { url, json, html } => {
            let engine = load_engine()?;
            eprintln!("🔍 Scanning page: {}", url);
            let report = scan::scan_page(&engine, &fetcher, &url, print_scan_progress).await;
            finish(&report, json, html.as_deref())
        }
        Commands::Site { url, crawl, json, html } => {
            let engine = load_engine()?;
            let options = crawl.to_options();
            eprintln!("🔍 Scanning website: {}", url);
            eprintln!(
                "📊 Max pages: {}, max depth: {}",
                options.max_pages, options.max_depth
            );
            let report = scan::scan_site(
                &engine,
                &fetcher,
                &url,
                &options,
                print_crawl_progress,
                print_scan_progress,
            )
            .await;
            finish(&report, json, html.as_deref())
        }
        Commands::Rules { json } => {
            let engine = load_engine()?;
            let catalogue = engine.catalogue();
            if json {
                let metas: Vec<_> = catalogue.rules().iter().map(|rule| &rule.meta).collect();
                let output = serde_json::json!({
                    "version": catalogue.version(),
                    "rules": metas,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                report::print_catalogue(catalogue);
            }
            Ok(0)
        }
    }
}

fn load_engine() -> Result<RuleEngine> {
    RuleEngine::builtin().context("built-in rule catalogue is invalid")
}

// Handles the 'crawl' subcommand: discovery only, no rules run
async fn handle_crawl(fetcher: &HttpFetcher, url: &str, args: &CrawlArgs, json: bool) -> Result<i32> {
    let seed = scan::parse_seed(url).map_err(anyhow::Error::msg)?;
    let options: CrawlOptions = args.to_options();

    eprintln!("🔍 Crawling website: {}", seed);
    let pages = crawl::discover(fetcher, &seed, &options, print_crawl_progress).await;

    if json {
        let pages: Vec<String> = pages.iter().map(|url| url.to_string()).collect();
        let output = serde_json::json!({ "seed": seed.as_str(), "pages": pages });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for page in &pages {
            println!("{}", page);
        }
        println!();
        println!("📄 Discovered {} page(s)", pages.len());
    }
    Ok(0)
}

// Prints the report and decides the exit code
fn finish(report: &AggregateReport, json: bool, html: Option<&Path>) -> Result<i32> {
    if json {
        println!("{}", report::to_json(report)?);
    } else {
        report::print_table(report);
    }

    if let Some(path) = html {
        std::fs::write(path, report::to_html(report))
            .with_context(|| format!("failed to write HTML report to {}", path.display()))?;
        eprintln!("📝 HTML report written to {}", path.display());
    }

    Ok(exit_code(report))
}

fn exit_code(report: &AggregateReport) -> i32 {
    if report.error.is_some() {
        return 2;
    }
    match report.status {
        ComplianceStatus::Compliant => 0,
        ComplianceStatus::PartiallyCompliant | ComplianceStatus::NonCompliant => 1,
    }
}

fn print_crawl_progress(progress: &CrawlProgress) {
    match &progress.current_url {
        Some(url) => eprintln!("   [{} visited / {} found] {}", progress.visited, progress.discovered, url),
        None => eprintln!("📄 Found {} page(s)", progress.discovered),
    }
}

fn print_scan_progress(progress: &ScanProgress) {
    match &progress.current_url {
        Some(url) => eprintln!("   [{}/{}] checking {}", progress.scanned, progress.total, url),
        None => eprintln!("✅ Checked {} page(s)\n", progress.total),
    }
}
