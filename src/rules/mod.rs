// src/rules/mod.rs
// =============================================================================
// This module contains the rule engine.
//
// Submodules:
// - catalogue: rule metadata (JSON) joined with the registered checks
// - check: the Check enum, Outcome, and selector helpers for predicates
// - predicates: the automated checks themselves, keyed by rule id
// - engine: evaluates a parsed page and builds a PageReport
// =============================================================================

mod catalogue;
mod check;
mod engine;
mod predicates;

pub use catalogue::{Catalogue, RuleType, Severity};
pub use engine::{compliance_score, ManualCheck, PassedCheck, RuleEngine, Violation};
