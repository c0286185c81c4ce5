//! Violation result records and the per-run result database.

use serde::{Deserialize, Serialize};

use verilith_core::Region;

use crate::error::DrcError;

/// Severity level of a rule's findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Severity {
    #[default]
    Error,
    Warning,
    Info,
}

/// One rule's bucket in the result database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResult {
    pub rule_id: String,
    pub description: String,
    pub severity: Severity,
    /// True when the rule's evaluation failed internally and this bucket
    /// is a placeholder rather than real findings.
    pub skipped: bool,
    pub geometry: Region,
}

impl RuleResult {
    pub fn violation_count(&self) -> usize {
        if self.skipped {
            0
        } else {
            self.geometry.count()
        }
    }
}

/// Run-level figures reported alongside the rule buckets.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunSummary {
    /// Top-cell-expanded shape count of the input design.
    pub polygon_count: usize,
    /// Area of the design extent in µm².
    pub chip_area_um2: f64,
    pub elapsed_seconds: f64,
    /// Internal rule-evaluation failures, distinct from design
    /// violations found.
    pub internal_errors: usize,
}

/// Accumulated violation buckets in rule declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultDatabase {
    pub design: String,
    pub top_cell: String,
    results: Vec<RuleResult>,
    pub summary: RunSummary,
}

impl ResultDatabase {
    pub fn new(design: &str, top_cell: &str) -> Self {
        Self {
            design: design.to_string(),
            top_cell: top_cell.to_string(),
            results: Vec::new(),
            summary: RunSummary::default(),
        }
    }

    /// Append a rule bucket. Duplicate rule ids are an authoring mistake.
    pub fn add(&mut self, result: RuleResult) -> Result<(), DrcError> {
        if self.results.iter().any(|r| r.rule_id == result.rule_id) {
            return Err(DrcError::config(format!(
                "duplicate rule id '{}'",
                result.rule_id
            )));
        }
        self.results.push(result);
        Ok(())
    }

    pub fn get(&self, rule_id: &str) -> Option<&RuleResult> {
        self.results.iter().find(|r| r.rule_id == rule_id)
    }

    /// Buckets in declaration order.
    pub fn results(&self) -> &[RuleResult] {
        &self.results
    }

    pub fn rule_count(&self) -> usize {
        self.results.len()
    }

    /// Total violation polygons across non-skipped buckets.
    pub fn total_violations(&self) -> usize {
        self.results.iter().map(|r| r.violation_count()).sum()
    }

    pub fn skipped_count(&self) -> usize {
        self.results.iter().filter(|r| r.skipped).count()
    }
}
