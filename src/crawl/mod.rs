// src/crawl/mod.rs
// =============================================================================
// This module discovers the pages of a website.
//
// Features:
// - Breadth-first crawling starting from a seed URL
// - Same-origin restriction (scheme + host + port must match the seed)
// - Page budget (max_pages) and depth budget (max_depth)
// - Skips links to images, documents, archives, media and static assets
// - Polite crawling with a delay between requests
//
// Rust concepts:
// - Async programming: every fetch is an await point
// - Collections: HashSet for visited URLs, VecDeque for the frontier
// =============================================================================

mod links;
mod queue;

// Re-export the public crawling API
pub use queue::{discover, CrawlOptions, CrawlProgress};
