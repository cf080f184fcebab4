// src/scan.rs
// =============================================================================
// Top-level scans: the glue between crawling and reporting.
//
// These functions never return Err. A scan that cannot produce any result
// (bad seed URL, every page unreachable) comes back as an error-shaped
// report with score 0 and an `error` message, so callers only ever render.
// =============================================================================

use tracing::warn;
use url::Url;

use crate::crawl::{self, CrawlOptions, CrawlProgress};
use crate::fetch::PageFetcher;
use crate::report::{aggregate, AggregateReport, ScanProgress};
use crate::rules::RuleEngine;

// Crawls from `seed` and scans every discovered page
pub async fn scan_site<F, C, S>(
    engine: &RuleEngine,
    fetcher: &F,
    seed: &str,
    options: &CrawlOptions,
    on_crawl: C,
    on_scan: S,
) -> AggregateReport
where
    F: PageFetcher + ?Sized,
    C: FnMut(&CrawlProgress),
    S: FnMut(&ScanProgress),
{
    let seed = match parse_seed(seed) {
        Ok(url) => url,
        Err(message) => return AggregateReport::failed(message, engine.manual_checks()),
    };

    let urls = crawl::discover(fetcher, &seed, options, on_crawl).await;
    let report = aggregate(engine, fetcher, &urls, on_scan).await;
    fail_if_nothing_scanned(report)
}

// Scans a single page without crawling
pub async fn scan_page<F, S>(engine: &RuleEngine, fetcher: &F, url: &str, on_scan: S) -> AggregateReport
where
    F: PageFetcher + ?Sized,
    S: FnMut(&ScanProgress),
{
    let url = match parse_seed(url) {
        Ok(url) => url,
        Err(message) => return AggregateReport::failed(message, engine.manual_checks()),
    };

    let report = aggregate(engine, fetcher, &[url], on_scan).await;
    fail_if_nothing_scanned(report)
}

// Accepts http(s) URLs only; the message ends up in the report
pub fn parse_seed(input: &str) -> Result<Url, String> {
    let url = Url::parse(input.trim()).map_err(|e| format!("Invalid URL '{}': {}", input, e))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("Unsupported URL scheme '{}': {}", url.scheme(), input));
    }
    Ok(url)
}

// If no page could be fetched there is nothing to score
fn fail_if_nothing_scanned(report: AggregateReport) -> AggregateReport {
    let all_failed = !report.page_results.is_empty()
        && report.page_results.iter().all(|page| page.error.is_some());
    if !all_failed {
        return report;
    }

    let first = &report.page_results[0];
    let message = format!(
        "Could not fetch {}: {}",
        first.url,
        first.error.as_deref().unwrap_or("unknown error")
    );
    warn!(%message, "scan produced no results");
    report.into_failed(message)
}
