// src/rules/catalogue.rs
// =============================================================================
// This module loads the rule catalogue.
//
// A rule has two halves:
// - metadata (id, category, description, requirements, severity, type),
//   kept as JSON in catalogue.json and compiled into the binary
// - an executable Check, looked up by id in predicates::REGISTRY
//
// Loading joins the two and validates them up front:
// - rule ids must be unique
// - every automated rule needs a registered check
// - every registered check needs a rule
// =============================================================================

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use super::check::Check;
use super::predicates::REGISTRY;

/// Catalogue shipped with the binary.
pub const BUILTIN_CATALOGUE: &str = include_str!("catalogue.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleType {
    /// Checked by a predicate over the page markup
    Automated,
    /// Needs a human reviewer; listed as a checklist item only
    Manual,
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            RuleType::Automated => "automated",
            RuleType::Manual => "manual",
        })
    }
}

// The data half of a rule, exactly as it appears in catalogue.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMeta {
    pub id: String,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    pub severity: Severity,
    #[serde(rename = "type")]
    pub rule_type: RuleType,
}

// A rule ready to run; manual rules carry no check
#[derive(Debug, Clone)]
pub struct Rule {
    pub meta: RuleMeta,
    pub check: Option<Check>,
}

#[derive(Debug, Deserialize)]
struct CatalogueFile {
    version: String,
    rules: Vec<RuleMeta>,
}

#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error("catalogue is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate rule id '{0}'")]
    DuplicateId(String),
    #[error("automated rule '{0}' has no registered check")]
    MissingCheck(String),
    #[error("check registered for unknown rule '{0}'")]
    OrphanCheck(String),
}

#[derive(Debug, Clone)]
pub struct Catalogue {
    version: String,
    rules: Vec<Rule>,
}

impl Catalogue {
    /// Loads the catalogue compiled into the binary.
    pub fn builtin() -> Result<Self, CatalogueError> {
        Self::from_json(BUILTIN_CATALOGUE)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogueError> {
        let file: CatalogueFile = serde_json::from_str(json)?;
        Self::from_parts(file.version, file.rules, REGISTRY)
    }

    // Joins rule metadata with a check registry and validates the result
    pub fn from_parts(
        version: String,
        metas: Vec<RuleMeta>,
        registry: &[(&str, Check)],
    ) -> Result<Self, CatalogueError> {
        let mut ids = HashSet::new();
        for meta in &metas {
            if !ids.insert(meta.id.as_str()) {
                return Err(CatalogueError::DuplicateId(meta.id.clone()));
            }
        }

        if let Some((id, _)) = registry.iter().find(|(id, _)| !ids.contains(id)) {
            return Err(CatalogueError::OrphanCheck(id.to_string()));
        }

        let rules = metas
            .into_iter()
            .map(|meta| {
                let check = registry
                    .iter()
                    .find(|(id, _)| *id == meta.id)
                    .map(|(_, check)| *check);

                match (meta.rule_type, check) {
                    (RuleType::Automated, None) => Err(CatalogueError::MissingCheck(meta.id)),
                    (RuleType::Manual, _) => Ok(Rule { meta, check: None }),
                    (RuleType::Automated, check) => Ok(Rule { meta, check }),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { version, rules })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn count(&self, rule_type: RuleType) -> usize {
        self.rules
            .iter()
            .filter(|rule| rule.meta.rule_type == rule_type)
            .count()
    }

    pub fn count_severity(&self, severity: Severity) -> usize {
        self.rules
            .iter()
            .filter(|rule| rule.meta.severity == severity)
            .count()
    }
}
