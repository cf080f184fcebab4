// src/crawl/queue.rs
// =============================================================================
// This module implements website discovery with a breadth-first walk.
//
// How it works:
// 1. Start with the seed URL in the frontier at depth 0
// 2. Pop the front of the frontier; skip it if visited or too deep
// 3. Fetch the page HTML (failures are logged and skipped)
// 4. Extract same-origin page links
// 5. Every new link is discovered and queued at depth + 1
// 6. Stop when the frontier is empty or max_pages URLs are discovered
//
// Politeness:
// - Adds a delay between requests to avoid overwhelming servers
// - Only crawls the seed's origin
//
// Rust concepts:
// - HashSet: To track visited URLs (O(1) lookup)
// - VecDeque: Double-ended queue for breadth-first crawling
// - FnMut: the progress callback may mutate its captured state
// =============================================================================

use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::links::extract_page_links;
use crate::fetch::PageFetcher;

// Crawl budgets
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Upper bound on the number of discovered URLs (seed included)
    pub max_pages: usize,
    /// Pages deeper than this are never fetched (the seed is depth 0)
    pub max_depth: usize,
    /// Pause after each successfully fetched page
    pub delay: Duration,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            max_pages: 50,
            max_depth: 3,
            delay: Duration::from_millis(100),
        }
    }
}

// Snapshot handed to the progress callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlProgress {
    pub discovered: usize,
    pub visited: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_url: Option<String>,
    pub completed: bool,
}

// Represents a page in the frontier
#[derive(Debug, Clone)]
struct CrawlItem {
    url: Url,
    depth: usize, // How many link hops from the seed
}

// Everything one crawl owns; dropped when discover() returns
struct CrawlState {
    // Discovery order is the result order, the set answers "seen before?"
    discovered: Vec<Url>,
    seen: HashSet<Url>,
    visited: HashSet<Url>,
    frontier: VecDeque<CrawlItem>,
}

impl CrawlState {
    fn new(seed: Url) -> Self {
        let mut state = Self {
            discovered: Vec::new(),
            seen: HashSet::new(),
            visited: HashSet::new(),
            frontier: VecDeque::new(),
        };
        state.discover(seed, 0);
        state
    }

    // Adds a URL to `discovered` and the frontier if it is new
    fn discover(&mut self, url: Url, depth: usize) {
        if self.seen.insert(url.clone()) {
            self.discovered.push(url.clone());
            self.frontier.push_back(CrawlItem { url, depth });
        }
    }

    fn progress(&self, current_url: Option<&Url>, completed: bool) -> CrawlProgress {
        CrawlProgress {
            discovered: self.discovered.len(),
            visited: self.visited.len(),
            current_url: current_url.map(Url::to_string),
            completed,
        }
    }
}

// Discovers the same-origin pages reachable from a seed URL
//
// Parameters:
//   fetcher: where page HTML comes from
//   seed: the URL to start from
//   options: page/depth budgets and politeness delay
//   on_progress: called once per visited page and once at the end
//
// Returns: discovered URLs in discovery order, never more than max_pages.
// Fetch failures never abort the walk; the failing page just contributes
// no links.
pub async fn discover<F, P>(
    fetcher: &F,
    seed: &Url,
    options: &CrawlOptions,
    mut on_progress: P,
) -> Vec<Url>
where
    F: PageFetcher + ?Sized,
    P: FnMut(&CrawlProgress),
{
    if options.max_pages == 0 {
        on_progress(&CrawlProgress {
            discovered: 0,
            visited: 0,
            current_url: None,
            completed: true,
        });
        return Vec::new();
    }

    let mut seed = seed.clone();
    seed.set_fragment(None);
    let origin = seed.origin();

    let mut state = CrawlState::new(seed);

    // Process the frontier until empty or the page budget is spent
    while state.discovered.len() < options.max_pages {
        let Some(item) = state.frontier.pop_front() else {
            break;
        };

        if state.visited.contains(&item.url) || item.depth > options.max_depth {
            continue;
        }

        state.visited.insert(item.url.clone());
        on_progress(&state.progress(Some(&item.url), false));
        info!(depth = item.depth, url = %item.url, "crawling");

        let page = match fetcher.fetch(&item.url).await {
            Ok(page) => page,
            Err(e) => {
                warn!(url = %item.url, error = %e, "failed to fetch page, skipping");
                continue;
            }
        };

        let links = if page.is_html() {
            extract_page_links(&page.body, &item.url, &origin)
        } else {
            debug!(url = %item.url, content_type = ?page.content_type, "not HTML, no links followed");
            Vec::new()
        };

        for link in links {
            if state.discovered.len() >= options.max_pages {
                break;
            }
            state.discover(link, item.depth + 1);
        }

        if !options.delay.is_zero() {
            tokio::time::sleep(options.delay).await;
        }
    }

    on_progress(&state.progress(None, true));
    info!(
        discovered = state.discovered.len(),
        visited = state.visited.len(),
        "crawl finished"
    );

    state.discovered
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why is the seed "discovered" before anything is fetched?
//    - The result always contains the page the user asked for
//    - Even if the seed is unreachable, the scanner gets to report why
//
// 2. Why do discovered URLs sometimes never get fetched?
//    - A link found at depth max_depth is discovered at max_depth + 1
//    - It is returned (so it gets scanned) but its own links are not followed
//
// 3. What is `?Sized` on F?
//    - It lets callers pass `&dyn PageFetcher` as well as concrete types
//
// 4. Why does the loop always end?
//    - Each iteration pops one frontier entry
//    - New entries only appear while discovered < max_pages
// -----------------------------------------------------------------------------
