// src/report/mod.rs
// =============================================================================
// This module builds and renders multi-page reports.
//
// Submodules:
// - aggregate: sequential scanning, deduplication, score and status
// - render: terminal table, JSON and HTML output
// =============================================================================

mod aggregate;
mod render;

pub use aggregate::{aggregate, AggregateReport, ComplianceStatus, ScanProgress};
pub use render::{print_catalogue, print_table, to_html, to_json};
