//! Firescope Geo - Geometry checks, repair and curve densification
//!
//! This crate holds the geometry algorithms and the `GeometryRepairer`
//! workflow that runs them against a `FeatureStore`.

pub mod curves;
pub mod models;
pub mod repair;
pub mod repairer;
pub mod validation;

pub use curves::{densify_geometry, detect_curves};
pub use repairer::{
    CheckSummary, DensifySummary, GeometryRepairer, RepairOptions, RepairReport, RepairSummary,
    StageOutcome,
};
pub use validation::{check_geometry, GeometryIssue, IssueKind};
