// src/rules/check.rs
// =============================================================================
// The executable half of a rule.
//
// A rule is checked in one of two shapes:
// - Check::Document: one predicate over the whole parsed page
// - Check::Elements: a CSS selector plus a predicate run on every match
//
// Predicates get the page URL through PageContext instead of reading it off
// the document. They return Result so a broken check (bad selector, an
// attribute that can't be parsed) is reported instead of panicking.
// =============================================================================

use scraper::{ElementRef, Html, Selector};
use std::fmt;
use thiserror::Error;
use url::Url;

/// Predicate over the whole document.
pub type DocumentPredicate = fn(&Html, &PageContext) -> Result<Outcome, CheckError>;

/// Predicate over one element matched by a rule's selector.
pub type ElementPredicate = fn(ElementRef<'_>, &PageContext) -> Result<Outcome, CheckError>;

#[derive(Clone, Copy)]
pub enum Check {
    Document(DocumentPredicate),
    Elements {
        selector: &'static str,
        predicate: ElementPredicate,
    },
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::Document(_) => f.write_str("Check::Document"),
            Check::Elements { selector, .. } => {
                f.debug_struct("Check::Elements").field("selector", selector).finish()
            }
        }
    }
}

/// What the predicate is allowed to know about the page besides its markup.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub page_url: Option<Url>,
}

/// Result of a single predicate call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    pub passed: bool,
    pub reason: Option<String>,
    pub fix: Option<String>,
}

impl Outcome {
    pub fn pass() -> Self {
        Self {
            passed: true,
            ..Self::default()
        }
    }

    pub fn fail(reason: impl Into<String>, fix: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason: Some(reason.into()),
            fix: Some(fix.into()),
        }
    }

    // Passes when `ok`, otherwise fails with the given explanation
    pub fn require(ok: bool, reason: impl Into<String>, fix: impl Into<String>) -> Self {
        if ok {
            Self::pass()
        } else {
            Self::fail(reason, fix)
        }
    }
}

impl From<bool> for Outcome {
    fn from(passed: bool) -> Self {
        Self {
            passed,
            ..Self::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },
    #[error("attribute {attribute}=\"{value}\" is not valid")]
    InvalidAttribute { attribute: String, value: String },
}

pub fn parse_selector(css: &str) -> Result<Selector, CheckError> {
    Selector::parse(css).map_err(|e| CheckError::Selector {
        selector: css.to_string(),
        message: format!("{e:?}"),
    })
}

// All elements of the document matching `css`, in document order
pub fn select_all<'a>(doc: &'a Html, css: &str) -> Result<Vec<ElementRef<'a>>, CheckError> {
    let selector = parse_selector(css)?;
    Ok(doc.select(&selector).collect())
}

// All descendants of `element` matching `css`
pub fn select_within<'a>(element: ElementRef<'a>, css: &str) -> Result<Vec<ElementRef<'a>>, CheckError> {
    let selector = parse_selector(css)?;
    Ok(element.select(&selector).collect())
}

// Text content with runs of whitespace collapsed to single spaces
pub fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

// Non-blank attribute value
pub fn attr_value<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

// The outermost element the node belongs to (normally <html>)
pub fn root_of(element: ElementRef<'_>) -> ElementRef<'_> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .last()
        .unwrap_or(element)
}
