// src/report/aggregate.rs
// =============================================================================
// This module scans many pages and merges their reports.
//
// How it works:
// 1. Pages are fetched and evaluated one at a time, in input order
// 2. A page that can't be fetched is recorded with score 0 and an error
// 3. Violations are deduplicated by (rule id, description): the same broken
//    header on 30 pages is one violation with 30 affected pages
// 4. Score and status use the totals *before* deduplication
// =============================================================================

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};
use url::Url;

use crate::fetch::PageFetcher;
use crate::rules::{compliance_score, ManualCheck, PassedCheck, RuleEngine, Violation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ComplianceStatus {
    Compliant,
    PartiallyCompliant,
    NonCompliant,
}

impl ComplianceStatus {
    // violations and passed are pre-dedup counts
    pub fn from_counts(violations: usize, passed: usize) -> Self {
        if violations == 0 {
            ComplianceStatus::Compliant
        } else if violations > passed {
            ComplianceStatus::NonCompliant
        } else {
            ComplianceStatus::PartiallyCompliant
        }
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            ComplianceStatus::Compliant => "Compliant",
            ComplianceStatus::PartiallyCompliant => "Partially Compliant",
            ComplianceStatus::NonCompliant => "Non-Compliant",
        })
    }
}

// A violation merged across every page it appeared on
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupedViolation {
    #[serde(flatten)]
    pub violation: Violation,
    pub affected_pages: Vec<String>,
    pub occurrences: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    pub url: String,
    pub score: u8,
    pub violation_count: usize,
    pub passed_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanProgress {
    pub scanned: usize,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_url: Option<String>,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateReport {
    pub score: u8,
    pub status: ComplianceStatus,
    pub violations: Vec<DedupedViolation>,
    pub passed: Vec<PassedCheck>,
    pub total_checks: usize,
    pub page_results: Vec<PageSummary>,
    pub total_pages: usize,
    pub pages_with_violations: usize,
    pub total_violations_before_dedup: usize,
    pub manual_checks: Vec<ManualCheck>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AggregateReport {
    /// Error-shaped report: callers render it instead of handling an Err.
    pub fn failed(message: impl Into<String>, manual_checks: Vec<ManualCheck>) -> Self {
        Self {
            score: 0,
            status: ComplianceStatus::NonCompliant,
            violations: Vec::new(),
            passed: Vec::new(),
            total_checks: 0,
            page_results: Vec::new(),
            total_pages: 0,
            pages_with_violations: 0,
            total_violations_before_dedup: 0,
            manual_checks,
            timestamp: Utc::now(),
            error: Some(message.into()),
        }
    }

    // Turns a finished report into an error report, keeping the page list
    pub fn into_failed(self, message: impl Into<String>) -> Self {
        Self {
            page_results: self.page_results,
            total_pages: self.total_pages,
            ..Self::failed(message, self.manual_checks)
        }
    }
}

// Collapses repeated violations, keeping first-seen order
#[derive(Default)]
struct ViolationDedup {
    index: HashMap<String, usize>,
    entries: Vec<DedupedViolation>,
}

impl ViolationDedup {
    fn add(&mut self, violation: Violation, page_url: &str) {
        let key = format!("{}-{}", violation.rule_id, violation.description);
        match self.index.get(&key) {
            Some(&position) => {
                let entry = &mut self.entries[position];
                if !entry.affected_pages.iter().any(|page| page == page_url) {
                    entry.affected_pages.push(page_url.to_string());
                }
                entry.occurrences += 1;
            }
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(DedupedViolation {
                    violation,
                    affected_pages: vec![page_url.to_string()],
                    occurrences: 1,
                });
            }
        }
    }

    fn into_entries(self) -> Vec<DedupedViolation> {
        self.entries
    }
}

// Scans every URL in order and merges the results
//
// Parameters:
//   engine: the rule engine to evaluate pages with
//   fetcher: where page HTML comes from
//   urls: pages to scan, usually the crawler's output
//   on_progress: called before each page and once at the end
pub async fn aggregate<F, P>(
    engine: &RuleEngine,
    fetcher: &F,
    urls: &[Url],
    mut on_progress: P,
) -> AggregateReport
where
    F: PageFetcher + ?Sized,
    P: FnMut(&ScanProgress),
{
    let total = urls.len();
    let mut dedup = ViolationDedup::default();
    let mut passed = Vec::new();
    let mut page_results = Vec::with_capacity(total);
    let mut violation_total = 0;

    for (index, url) in urls.iter().enumerate() {
        on_progress(&ScanProgress {
            scanned: index + 1,
            total,
            current_url: Some(url.to_string()),
            completed: false,
        });
        info!(url = %url, page = index + 1, total, "scanning page");

        let page = match fetcher.fetch(url).await {
            Ok(page) => page,
            Err(e) => {
                warn!(url = %url, error = %e, "failed to scan page");
                page_results.push(PageSummary {
                    url: url.to_string(),
                    score: 0,
                    violation_count: 0,
                    passed_count: 0,
                    error: Some(e.to_string()),
                });
                continue;
            }
        };

        debug!(url = %page.url, status = page.status, bytes = page.body.len(), "page fetched");

        if !page.is_html() {
            let content_type = page.content_type.as_deref().unwrap_or_default();
            warn!(url = %url, content_type, "not an HTML page, skipping");
            page_results.push(PageSummary {
                url: url.to_string(),
                score: 0,
                violation_count: 0,
                passed_count: 0,
                error: Some(format!("not an HTML page ({content_type})")),
            });
            continue;
        }

        // Rules see the URL the markup was served from, after redirects
        let report = engine.evaluate_html(&page.body, Some(&page.final_url));
        let page_url = url.to_string();

        page_results.push(PageSummary {
            url: page_url.clone(),
            score: report.score,
            violation_count: report.violations.len(),
            passed_count: report.passed.len(),
            error: None,
        });

        violation_total += report.violations.len();
        for violation in report.violations {
            dedup.add(violation, &page_url);
        }
        passed.extend(report.passed);
    }

    on_progress(&ScanProgress {
        scanned: total,
        total,
        current_url: None,
        completed: true,
    });

    let violations = dedup.into_entries();
    let pages_with_violations = page_results
        .iter()
        .filter(|summary| summary.violation_count > 0)
        .count();

    info!(
        pages = total,
        violations = violation_total,
        unique_violations = violations.len(),
        passed = passed.len(),
        "scan finished"
    );

    AggregateReport {
        score: compliance_score(passed.len(), violation_total),
        status: ComplianceStatus::from_counts(violation_total, passed.len()),
        total_checks: passed.len() + violation_total,
        violations,
        passed,
        total_pages: total,
        page_results,
        pages_with_violations,
        total_violations_before_dedup: violation_total,
        manual_checks: engine.manual_checks(),
        timestamp: Utc::now(),
        error: None,
    }
}
