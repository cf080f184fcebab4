// src/crawl/links.rs
// =============================================================================
// This module pulls crawlable page links out of an HTML document.
//
// A link survives only if it:
// - is not a mailto:, tel:, javascript: or same-page "#..." target
// - resolves to an http(s) URL with the same origin as the seed
// - does not point at a non-page resource (.pdf, .png, .js, ...)
//
// Fragments are stripped, so "/p#foo" and "/p#bar" both become "/p".
// Malformed hrefs are dropped silently; one bad link never spoils a page.
// =============================================================================

use scraper::{Html, Selector};
use url::{Origin, Url};

// File extensions that are never HTML pages
const SKIPPED_EXTENSIONS: &[&str] = &[
    // images
    "jpg", "jpeg", "png", "gif", "svg", "webp",
    // documents
    "pdf", "doc", "docx", "xls", "xlsx",
    // archives
    "zip", "tar", "gz",
    // media
    "mp3", "mp4", "avi", "mov",
    // static assets
    "css", "js", "json", "xml",
];

// Schemes that are links but not pages
const SKIPPED_SCHEMES: &[&str] = &["mailto:", "tel:", "javascript:"];

// Extracts the same-origin page links of an HTML document
//
// Parameters:
//   html: the page markup
//   page_url: the URL the markup came from (base for relative links)
//   origin: the seed's origin, links elsewhere are dropped
//
// Returns: absolute, fragment-free URLs in document order (may repeat)
pub fn extract_page_links(html: &str, page_url: &Url, origin: &Origin) -> Vec<Url> {
    let document = Html::parse_document(html);

    // "a[href]" is a constant; if it somehow fails we just find no links
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_page_link(page_url, href, origin))
        .collect()
}

// Resolves one href against the page URL and applies every filter
//
// Returns: Some(url) if the link is a crawlable page on our origin
pub fn resolve_page_link(base: &Url, href: &str, origin: &Origin) -> Option<Url> {
    // Authors sometimes leave stray quotes around attribute values
    let href = href
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'')
        .trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if SKIPPED_SCHEMES.iter().any(|scheme| lowered.starts_with(scheme)) {
        return None;
    }

    let mut url = base.join(href).ok()?;

    if !matches!(url.scheme(), "http" | "https") || url.origin() != *origin {
        return None;
    }

    url.set_fragment(None);

    if has_skipped_extension(&url) {
        return None;
    }

    Some(url)
}

// Checks the last path segment's extension against SKIPPED_EXTENSIONS
fn has_skipped_extension(url: &Url) -> bool {
    let Some(last_segment) = url.path_segments().and_then(|mut segments| segments.next_back()) else {
        return false;
    };

    match last_segment.rsplit_once('.') {
        Some((_, extension)) => {
            let extension = extension.to_ascii_lowercase();
            SKIPPED_EXTENSIONS.contains(&extension.as_str())
        }
        None => false,
    }
}
