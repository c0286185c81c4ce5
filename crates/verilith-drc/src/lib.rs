//! # Verilith DRC
//!
//! The rule evaluation engine: distance-metric checks (width, space,
//! separation, enclosure, overlap), edge and corner analysis,
//! connectivity extraction with net-filtered two-threshold spacing, and a
//! scheduler running ordered rule sets flat, hierarchy-reusing (deep) or
//! tiled across worker threads, with per-rule failure containment and an
//! exit protocol reporting internal errors, not design violations.

pub mod config;
pub mod connectivity;
pub mod edge_ops;
pub mod error;
pub mod metrics;
pub mod report;
pub mod rules;
pub mod scheduler;
pub mod telemetry;

pub use config::{MetalLevel, MetalTop, MimOption, RunConfig, RunMode};
pub use connectivity::{Connectivity, LayerMap, NetId};
pub use edge_ops::{EdgeSet, PointSet};
pub use error::DrcError;
pub use metrics::{DistanceMetric, EdgePair, EdgePairSet};
pub use report::{ResultDatabase, RuleResult, RunSummary, Severity};
pub use rules::{Rule, RuleContext, RuleSet, REPORT_TOLERANCE};
pub use scheduler::{CancelToken, DrcRunner, RunInput, RunOutcome};
