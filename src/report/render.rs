// src/report/render.rs
// =============================================================================
// This module turns an AggregateReport into something people can read.
//
// Output formats:
// - a terminal table (default)
// - pretty JSON (--json)
// - a small standalone HTML file (--html report.html)
// =============================================================================

use anyhow::Result;

use super::aggregate::{AggregateReport, ComplianceStatus};
use crate::rules::{Catalogue, RuleType, Severity};

// Longest cell we print before cutting it with "..."
const CELL_WIDTH: usize = 57;

pub fn to_json(report: &AggregateReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

// Prints the report as a human-readable table in the terminal
pub fn print_table(report: &AggregateReport) {
    if let Some(error) = &report.error {
        println!("❌ Scan failed: {}", error);
        return;
    }

    println!("{:<60} {:<8} {:<12} {:<8}", "PAGE", "SCORE", "VIOLATIONS", "PASSED");
    println!("{}", "=".repeat(91));
    for page in &report.page_results {
        match &page.error {
            Some(error) => println!("{:<60} ⚠️  {}", shorten(&page.url), error),
            None => println!(
                "{:<60} {:<8} {:<12} {:<8}",
                shorten(&page.url),
                page.score,
                page.violation_count,
                page.passed_count
            ),
        }
    }
    println!();

    if !report.violations.is_empty() {
        println!("{:<6} {:<8} {:<60} {:<6}", "RULE", "SEVERITY", "VIOLATION", "PAGES");
        println!("{}", "=".repeat(83));
        for entry in &report.violations {
            let v = &entry.violation;
            println!(
                "{:<6} {:<8} {:<60} {:<6}",
                v.rule_id,
                v.severity,
                shorten(&v.description),
                entry.affected_pages.len()
            );
            if let Some(reason) = &v.reason {
                println!("{:<15} ↳ {}", "", reason);
            }
        }
        println!();
    }

    println!("📊 Summary:");
    println!("   {} {} ({}%)", status_icon(report.status), report.status, report.score);
    println!("   📄 Pages: {} ({} with violations)", report.total_pages, report.pages_with_violations);
    println!(
        "   ❌ Violations: {} unique, {} total",
        report.violations.len(),
        report.total_violations_before_dedup
    );
    println!("   ✅ Passed checks: {}", report.passed.len());
    println!("   📝 Manual checks to review: {}", report.manual_checks.len());
}

// Prints the rule catalogue as a table
pub fn print_catalogue(catalogue: &Catalogue) {
    println!("{:<4} {:<16} {:<8} {:<10} {}", "ID", "CATEGORY", "SEVERITY", "TYPE", "DESCRIPTION");
    println!("{}", "=".repeat(100));
    for rule in catalogue.rules() {
        let meta = &rule.meta;
        println!(
            "{:<4} {:<16} {:<8} {:<10} {}",
            meta.id, meta.category, meta.severity, meta.rule_type, meta.description
        );
    }
    println!();
    println!(
        "📋 {} rules (catalogue v{}): {} automated, {} manual",
        catalogue.len(),
        catalogue.version(),
        catalogue.count(RuleType::Automated),
        catalogue.count(RuleType::Manual)
    );
    println!(
        "   {} high, {} medium, {} low severity",
        catalogue.count_severity(Severity::High),
        catalogue.count_severity(Severity::Medium),
        catalogue.count_severity(Severity::Low)
    );
}

// Renders a minimal standalone HTML document
pub fn to_html(report: &AggregateReport) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>DGA compliance report</title>\n");
    html.push_str("<style>body{font-family:sans-serif;margin:2rem}table{border-collapse:collapse;width:100%}td,th{border:1px solid #ccc;padding:.4rem;text-align:left;vertical-align:top}pre{white-space:pre-wrap;margin:0}</style>\n");
    html.push_str("</head>\n<body>\n<h1>DGA compliance report</h1>\n");
    html.push_str(&format!(
        "<p>Generated {}</p>\n",
        escape_html(&report.timestamp.to_rfc3339())
    ));

    if let Some(error) = &report.error {
        html.push_str(&format!("<p><strong>Scan failed:</strong> {}</p>\n", escape_html(error)));
    }

    html.push_str(&format!(
        "<p><strong>{}</strong>: score {}%, {} pages ({} with violations), {} unique violations ({} total), {} passed checks</p>\n",
        report.status,
        report.score,
        report.total_pages,
        report.pages_with_violations,
        report.violations.len(),
        report.total_violations_before_dedup,
        report.passed.len()
    ));

    html.push_str("<h2>Pages</h2>\n<table>\n<tr><th>URL</th><th>Score</th><th>Violations</th><th>Passed</th><th>Error</th></tr>\n");
    for page in &report.page_results {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape_html(&page.url),
            page.score,
            page.violation_count,
            page.passed_count,
            escape_html(page.error.as_deref().unwrap_or(""))
        ));
    }
    html.push_str("</table>\n");

    html.push_str("<h2>Violations</h2>\n<table>\n<tr><th>Rule</th><th>Severity</th><th>Description</th><th>Reason / fix</th><th>Pages</th><th>Preview</th></tr>\n");
    for entry in &report.violations {
        let v = &entry.violation;
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}<br>{}</td><td>{}</td><td><pre>{}</pre></td></tr>\n",
            escape_html(&v.rule_id),
            v.severity,
            escape_html(&v.description),
            escape_html(v.reason.as_deref().unwrap_or("")),
            escape_html(v.fix.as_deref().unwrap_or("")),
            entry
                .affected_pages
                .iter()
                .map(|page| escape_html(page))
                .collect::<Vec<_>>()
                .join("<br>"),
            escape_html(&v.preview)
        ));
    }
    html.push_str("</table>\n");

    html.push_str("<h2>Manual checklist</h2>\n<ul>\n");
    for check in &report.manual_checks {
        html.push_str(&format!(
            "<li>[{}] {} ({}, {})</li>\n",
            escape_html(&check.rule_id),
            escape_html(&check.description),
            escape_html(&check.category),
            check.severity
        ));
    }
    html.push_str("</ul>\n</body>\n</html>\n");
    html
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn status_icon(status: ComplianceStatus) -> &'static str {
    match status {
        ComplianceStatus::Compliant => "✅",
        ComplianceStatus::PartiallyCompliant => "⚠️ ",
        ComplianceStatus::NonCompliant => "❌",
    }
}

// Truncates long cells for display (char-safe for Arabic text)
fn shorten(text: &str) -> String {
    if text.chars().count() > CELL_WIDTH {
        format!("{}...", text.chars().take(CELL_WIDTH).collect::<String>())
    } else {
        text.to_string()
    }
}
