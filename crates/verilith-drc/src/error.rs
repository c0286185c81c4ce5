use thiserror::Error;

use verilith_core::GeometryError;

/// Errors raised during rule evaluation.
///
/// Nothing here crosses a rule boundary: the scheduler catches every
/// variant at rule granularity, logs it, and substitutes a SKIPPED result
/// bucket. Only load-time failures (a design that cannot be read) abort a
/// run, and those happen before the first rule.
#[derive(Error, Debug)]
pub enum DrcError {
    /// Geometric failure inside an operator (out-of-grid coordinates,
    /// degenerate input).
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// An authoring mistake in a rule: inverted thresholds, duplicate
    /// rule ids, connectivity misuse, unknown layers.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Wrapper recording which rule an inner failure belongs to.
    #[error("rule '{rule}' failed: {source}")]
    RuleEvaluation {
        rule: String,
        #[source]
        source: Box<DrcError>,
    },

    /// Low-memory condition; advisory, the mitigation is switching run
    /// mode rather than in-engine recovery.
    #[error("resource exhaustion: {0}")]
    ResourceExhaustion(String),
}

impl DrcError {
    pub fn config(msg: impl Into<String>) -> Self {
        DrcError::Configuration(msg.into())
    }

    /// Attach a rule id to an inner error at the scheduler boundary.
    pub fn in_rule(self, rule: &str) -> Self {
        DrcError::RuleEvaluation {
            rule: rule.to_string(),
            source: Box::new(self),
        }
    }
}
