use firescope_core::models::{BoundingBox, FeatureId};
use firescope_geo::{GeometryIssue, RepairReport};
use serde::Serialize;

/// Output for check command
#[derive(Debug, Serialize)]
pub struct CheckOutput {
    pub feature_set: String,
    pub checked: usize,
    pub issues: Vec<GeometryIssue>,
}

/// Output for curves command
#[derive(Debug, Serialize)]
pub struct CurvesOutput {
    pub feature_set: String,
    pub count: usize,
    pub ids: Vec<FeatureId>,
}

/// Output for repair command
#[derive(Debug, Serialize)]
pub struct RepairOutput {
    pub report: RepairReport,
    /// File the repaired set was written to
    pub written_to: Option<String>,
}

/// Output for bbox command
#[derive(Debug, Serialize)]
pub struct BboxOutput {
    pub path: String,
    pub feature_set: String,
    pub features: usize,
    pub bbox: BoundingBox,
}

/// One configuration value and where it came from
#[derive(Debug, Serialize)]
pub struct ConfigEntry {
    pub value: String,
    pub source: String,
}
