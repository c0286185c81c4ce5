//! Rule declaration surface: named checks evaluated against derived
//! layers through an immutable context.

use verilith_core::geometry::Coord;
use verilith_core::Region;

use crate::config::RunConfig;
use crate::connectivity::{Connectivity, LayerMap};
use crate::error::DrcError;
use crate::report::Severity;

/// Violation-to-polygon tolerance most rules report at: one database
/// unit, 0.001 µm.
pub const REPORT_TOLERANCE: Coord = 1;

/// Signature of a rule body: pure function of the evaluation context,
/// returning the violation geometry or the error that aborted this rule
/// (and only this rule).
pub type CheckFn = dyn Fn(&RuleContext) -> Result<Region, DrcError> + Send + Sync;

/// A named check with its report description.
pub struct Rule {
    id: String,
    description: String,
    severity: Severity,
    check: Box<CheckFn>,
}

impl Rule {
    pub fn new<F>(id: &str, description: &str, check: F) -> Self
    where
        F: Fn(&RuleContext) -> Result<Region, DrcError> + Send + Sync + 'static,
    {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            severity: Severity::Error,
            check: Box::new(check),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn evaluate(&self, ctx: &RuleContext) -> Result<Region, DrcError> {
        (self.check)(ctx).map_err(|e| e.in_rule(&self.id))
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("description", &self.description)
            .finish()
    }
}

/// Ordered rule list. Declaration order is the execution and report
/// order; that is an observable contract, since decks reuse intermediates
/// computed by earlier rules.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn add(&mut self, rule: Rule) -> Result<(), DrcError> {
        if self.rules.iter().any(|r| r.id == rule.id) {
            return Err(DrcError::config(format!("duplicate rule id '{}'", rule.id)));
        }
        self.rules.push(rule);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }
}

/// Everything a rule body may consult. Layers and configuration are
/// immutable; derived layers are plain local values inside the rule body,
/// released on scope exit (or earlier via [`Region::forget`]).
pub struct RuleContext<'a> {
    layers: &'a LayerMap,
    pub config: &'a RunConfig,
    connectivity: Option<&'a Connectivity>,
    chip: &'a Region,
}

impl<'a> RuleContext<'a> {
    pub fn new(
        layers: &'a LayerMap,
        config: &'a RunConfig,
        connectivity: Option<&'a Connectivity>,
        chip: &'a Region,
    ) -> Self {
        Self {
            layers,
            config,
            connectivity,
            chip,
        }
    }

    /// An input layer by name; unknown names are an authoring mistake.
    pub fn layer(&self, name: &str) -> Result<&Region, DrcError> {
        self.layers
            .get(name)
            .ok_or_else(|| DrcError::config(format!("unknown layer '{name}'")))
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(|s| s.as_str())
    }

    /// The design extent as a region (the deck's `CHIP`).
    pub fn chip(&self) -> &Region {
        self.chip
    }

    /// The built connectivity graph; an error when the run was configured
    /// without connectivity rules.
    pub fn connectivity(&self) -> Result<&'a Connectivity, DrcError> {
        self.connectivity
            .ok_or_else(|| DrcError::config("connectivity not available in this run"))
    }
}
