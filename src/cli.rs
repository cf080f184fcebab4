// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API: the CLI structure is described by Rust structs
// and enums, and clap generates the parsing code from the attributes.
//
// Global flags (timeout, proxy, user agent, log format) apply to every
// subcommand and can appear before or after the subcommand name.
// =============================================================================

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::crawl::CrawlOptions;
use crate::fetch::{FetchConfig, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};

#[derive(Parser, Debug)]
#[command(
    name = "dga-auditor",
    version,
    about = "Audit websites against the DGA design and accessibility rules",
    long_about = "dga-auditor crawls a website, runs the automated DGA design-system and \
                  accessibility checks on every page, and produces a deduplicated compliance \
                  report with a score. Rules that need a human reviewer are listed as a checklist."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub fetch: FetchArgs,

    /// Write logs as JSON lines to stderr (filter with RUST_LOG)
    #[arg(long, global = true)]
    pub log_json: bool,
}

// Settings for every HTTP request the tool makes
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Seconds to wait for a page before giving up
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: u64,

    /// Fetch remote pages through a proxy service (e.g. http://localhost:3000)
    ///
    /// Requests are sent to <endpoint>/api/proxy?url=<page>. Pages on
    /// localhost are always fetched directly.
    #[arg(long, global = true)]
    pub proxy_endpoint: Option<Url>,

    /// User-Agent header sent with every request
    #[arg(long, global = true, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,
}

impl FetchArgs {
    pub fn to_config(&self) -> FetchConfig {
        FetchConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            user_agent: self.user_agent.clone(),
            proxy_endpoint: self.proxy_endpoint.clone(),
        }
    }
}

// Limits for the same-origin crawler
#[derive(Args, Debug)]
pub struct CrawlArgs {
    /// Stop after this many pages
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_pages: u64,

    /// How many links away from the start page to follow
    ///
    /// Depth 0 = just the starting page
    /// Depth 1 = starting page + the pages it links to
    #[arg(long, default_value_t = 3)]
    pub max_depth: usize,

    /// Pause between page fetches, in milliseconds
    #[arg(long, default_value_t = 100)]
    pub delay_ms: u64,
}

impl CrawlArgs {
    pub fn to_options(&self) -> CrawlOptions {
        CrawlOptions {
            max_pages: usize::try_from(self.max_pages).unwrap_or(usize::MAX),
            max_depth: self.max_depth,
            delay: Duration::from_millis(self.delay_ms),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the pages a site scan would cover, without checking them
    ///
    /// Example: dga-auditor crawl https://example.gov.sa --max-pages 20
    Crawl {
        /// Website URL to start from
        url: String,

        #[command(flatten)]
        crawl: CrawlArgs,

        /// Output the page list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a single page
    ///
    /// Example: dga-auditor scan https://example.gov.sa/services
    Scan {
        /// Page URL to check
        url: String,

        /// Output the report as JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Also write a standalone HTML report to this file
        #[arg(long, value_name = "PATH")]
        html: Option<PathBuf>,
    },

    /// Crawl a website and check every page found
    ///
    /// Example: dga-auditor site https://example.gov.sa --max-depth 2
    Site {
        /// Website URL to start from
        url: String,

        #[command(flatten)]
        crawl: CrawlArgs,

        /// Output the report as JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Also write a standalone HTML report to this file
        #[arg(long, value_name = "PATH")]
        html: Option<PathBuf>,
    },

    /// Print the rule catalogue
    Rules {
        /// Output the rules as JSON
        #[arg(long)]
        json: bool,
    },
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What does #[command(flatten)] do?
//    - It inlines the fields of another Args struct into this command
//    - CrawlArgs is shared by `crawl` and `site` without repeating the fields
//
// 2. What does `global = true` mean?
//    - The flag is accepted by every subcommand
//    - `dga-auditor --timeout-secs 5 site URL` and
//      `dga-auditor site URL --timeout-secs 5` are the same
//
// 3. Why value_parser!(u64).range(1..)?
//    - clap rejects `--max-pages 0` before our code ever runs
//    - The user gets a normal usage error instead of an empty report
//
// 4. Why Option<Url> for the proxy?
//    - clap parses the value with Url's FromStr, so a bad URL is a usage error
//    - None means "fetch directly"
// -----------------------------------------------------------------------------
