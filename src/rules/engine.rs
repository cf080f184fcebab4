// src/rules/engine.rs
// =============================================================================
// This module runs the catalogue over one parsed page.
//
// For every automated rule:
// - Check::Document  -> call the predicate once
// - Check::Elements  -> select all matches and call the predicate on each;
//                       no matches means the rule passes (the component
//                       simply isn't on this page)
//
// A predicate error never escapes: it is logged and counted as a failure.
// Manual rules are skipped here and only show up in the checklist.
//
// Rust concepts:
// - match on an enum to dispatch between two kinds of check
// - Serialize derives so reports can be printed as JSON
// =============================================================================

use scraper::{ElementRef, Html};
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use super::catalogue::{Catalogue, CatalogueError, RuleMeta, RuleType, Severity};
use super::check::{select_all, Check, Outcome, PageContext};

/// Longest preview snippet attached to a violation, in characters.
pub const PREVIEW_LIMIT: usize = 1000;

// One failed automated rule on one page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub rule_id: String,
    pub description: String,
    pub severity: Severity,
    pub category: String,
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    pub requirements: Vec<String>,
    pub page_url: Option<String>,
    /// Markup of the offending element (or the page start for page-level rules)
    pub preview: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
}

// One passed automated rule on one page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassedCheck {
    pub rule_id: String,
    pub description: String,
    pub severity: Severity,
    pub category: String,
    pub page_url: Option<String>,
}

// A manual rule, listed for a human reviewer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualCheck {
    pub rule_id: String,
    pub description: String,
    pub category: String,
    pub severity: Severity,
    pub requirements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageReport {
    pub score: u8,
    pub violations: Vec<Violation>,
    pub passed: Vec<PassedCheck>,
    pub total_checks: usize,
    pub page_url: Option<String>,
}

// round(100 * passed / (passed + violations)), or 100 when nothing was checked
pub fn compliance_score(passed: usize, violations: usize) -> u8 {
    let total = passed + violations;
    if total == 0 {
        return 100;
    }
    (100.0 * passed as f64 / total as f64).round() as u8
}

// Result of one rule on one page
enum Verdict {
    Pass,
    Fail(Failure),
}

struct Failure {
    preview: String,
    reason: Option<String>,
    fix: Option<String>,
}

impl Failure {
    fn new(preview: String, outcome: Outcome) -> Self {
        Self {
            preview,
            reason: outcome.reason,
            fix: outcome.fix,
        }
    }
}

pub struct RuleEngine {
    catalogue: Catalogue,
}

impl RuleEngine {
    pub fn new(catalogue: Catalogue) -> Self {
        Self { catalogue }
    }

    pub fn builtin() -> Result<Self, CatalogueError> {
        Ok(Self::new(Catalogue::builtin()?))
    }

    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    /// Parses `html` and evaluates it.
    pub fn evaluate_html(&self, html: &str, page_url: Option<&Url>) -> PageReport {
        let doc = Html::parse_document(html);
        self.evaluate(&doc, page_url)
    }

    /// Runs every automated rule over `doc`.
    pub fn evaluate(&self, doc: &Html, page_url: Option<&Url>) -> PageReport {
        let ctx = PageContext {
            page_url: page_url.cloned(),
        };
        let page = page_url.map(Url::to_string);

        let mut violations = Vec::new();
        let mut passed = Vec::new();

        for rule in self.catalogue.rules() {
            let Some(check) = &rule.check else {
                continue; // manual
            };

            match run_check(&rule.meta, check, doc, &ctx) {
                Verdict::Pass => passed.push(PassedCheck {
                    rule_id: rule.meta.id.clone(),
                    description: rule.meta.description.clone(),
                    severity: rule.meta.severity,
                    category: rule.meta.category.clone(),
                    page_url: page.clone(),
                }),
                Verdict::Fail(failure) => violations.push(Violation {
                    rule_id: rule.meta.id.clone(),
                    description: rule.meta.description.clone(),
                    severity: rule.meta.severity,
                    category: rule.meta.category.clone(),
                    rule_type: rule.meta.rule_type,
                    requirements: rule.meta.requirements.clone(),
                    page_url: page.clone(),
                    preview: failure.preview,
                    reason: failure.reason,
                    fix: failure.fix,
                }),
            }
        }

        debug!(
            page = page.as_deref().unwrap_or("<inline>"),
            passed = passed.len(),
            violations = violations.len(),
            "page evaluated"
        );

        PageReport {
            score: compliance_score(passed.len(), violations.len()),
            total_checks: passed.len() + violations.len(),
            violations,
            passed,
            page_url: page,
        }
    }

    /// Manual rules as a checklist, in catalogue order.
    pub fn manual_checks(&self) -> Vec<ManualCheck> {
        self.catalogue
            .rules()
            .iter()
            .filter(|rule| rule.meta.rule_type == RuleType::Manual)
            .map(|rule| ManualCheck {
                rule_id: rule.meta.id.clone(),
                description: rule.meta.description.clone(),
                category: rule.meta.category.clone(),
                severity: rule.meta.severity,
                requirements: rule.meta.requirements.clone(),
            })
            .collect()
    }
}

fn run_check(meta: &RuleMeta, check: &Check, doc: &Html, ctx: &PageContext) -> Verdict {
    match check {
        Check::Document(predicate) => match predicate(doc, ctx) {
            Ok(outcome) if outcome.passed => Verdict::Pass,
            Ok(outcome) => Verdict::Fail(Failure::new(page_preview(doc), outcome)),
            Err(e) => {
                warn!(rule = %meta.id, error = %e, "check failed");
                Verdict::Fail(Failure::new(page_preview(doc), error_outcome(e)))
            }
        },
        Check::Elements { selector, predicate } => {
            let elements = match select_all(doc, selector) {
                Ok(elements) => elements,
                Err(e) => {
                    warn!(rule = %meta.id, error = %e, "check failed");
                    return Verdict::Fail(Failure::new(page_preview(doc), error_outcome(e)));
                }
            };

            if elements.is_empty() {
                return Verdict::Pass;
            }

            // Every match is checked; the first failure is the one reported
            let mut first_failure = None;
            let mut failing = 0;
            for element in elements {
                let outcome = match predicate(element, ctx) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!(rule = %meta.id, error = %e, "check failed on element");
                        error_outcome(e)
                    }
                };
                if !outcome.passed {
                    failing += 1;
                    if first_failure.is_none() {
                        first_failure = Some(Failure::new(element_preview(element), outcome));
                    }
                }
            }

            match first_failure {
                Some(failure) => {
                    debug!(rule = %meta.id, failing, "elements failed");
                    Verdict::Fail(failure)
                }
                None => Verdict::Pass,
            }
        }
    }
}

fn error_outcome(error: impl std::fmt::Display) -> Outcome {
    Outcome {
        passed: false,
        reason: Some(error.to_string()),
        fix: None,
    }
}

fn element_preview(element: ElementRef<'_>) -> String {
    truncate_chars(&element.html(), PREVIEW_LIMIT)
}

fn page_preview(doc: &Html) -> String {
    truncate_chars(&doc.root_element().html(), PREVIEW_LIMIT)
}

// Cuts at a char boundary so Arabic text never splits mid-character
fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}
