use chrono::{DateTime, Utc};
use firescope_core::config::LayeredConfig;
use firescope_core::error::Result;
use firescope_core::models::TableName;
use firescope_core::ports::FeatureStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::curves::{densify_geometry, detect_curves};
use crate::models::{DensifyTolerance, FeatureId, ValidityMode};
use crate::repair::{repair_geometry, RepairOutcome};
use crate::validation::{check_feature, GeometryIssue};

/// Settings for a repair run
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RepairOptions {
    pub validity: ValidityMode,
    pub tolerance: DensifyTolerance,
}

impl RepairOptions {
    /// Options from the effective configuration
    pub fn from_config(config: &LayeredConfig) -> Self {
        Self { validity: config.geometry_validity.value, tolerance: config.densify_tolerance() }
    }
}

/// Result of the check stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckSummary {
    pub checked: usize,
    pub issues: Vec<GeometryIssue>,
}

/// Result of the repair stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepairSummary {
    pub repaired: Vec<FeatureId>,
    pub deleted: Vec<FeatureId>,
    /// Features whose repaired geometry could not be written back
    pub failed: Vec<FeatureId>,
}

/// Result of densifying a list of features
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DensifySummary {
    /// Features whose geometry was linearized and written back
    pub densified: Vec<FeatureId>,
    /// Features whose arcs could not be linearized or written back
    pub failed: Vec<FeatureId>,
    /// Curved features left in the set afterwards
    pub residual: BTreeSet<FeatureId>,
}

/// How one stage of `check_and_repair` ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum StageOutcome {
    Ok,
    CheckFailed(String),
    RepairFailed(String),
    CurveCheckFailed(String),
    ResidualCurves(usize),
}

impl StageOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, StageOutcome::Ok)
    }
}

impl std::fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageOutcome::Ok => write!(f, "ok"),
            StageOutcome::CheckFailed(e) => write!(f, "check failed: {}", e),
            StageOutcome::RepairFailed(e) => write!(f, "repair failed: {}", e),
            StageOutcome::CurveCheckFailed(e) => write!(f, "curve check failed: {}", e),
            StageOutcome::ResidualCurves(n) => write!(f, "{} curves remain", n),
        }
    }
}

/// Aggregated outcome of `GeometryRepairer::check_and_repair`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairReport {
    pub feature_set: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    pub check_outcome: StageOutcome,
    pub check: Option<CheckSummary>,

    pub repair_outcome: StageOutcome,
    pub repair: Option<RepairSummary>,

    pub curve_outcome: StageOutcome,
    /// Curved features found before densifying
    pub curves: BTreeSet<FeatureId>,
    pub densify: Option<DensifySummary>,
}

impl RepairReport {
    /// Outcomes of the check, repair and curve stages, in run order
    pub fn outcomes(&self) -> [&StageOutcome; 3] {
        [&self.check_outcome, &self.repair_outcome, &self.curve_outcome]
    }

    /// True when every stage ended `Ok`
    pub fn is_clean(&self) -> bool {
        self.outcomes().iter().all(|o| o.is_ok())
    }
}

/// Checks, repairs and densifies the geometries of a feature set
///
/// Every call goes through the `FeatureStore`, so the same workflow runs
/// against in-memory sets and database tables.
pub struct GeometryRepairer {
    store: Arc<dyn FeatureStore>,
    options: RepairOptions,
}

impl GeometryRepairer {
    /// Create a new repairer
    pub fn new(store: Arc<dyn FeatureStore>, options: RepairOptions) -> Self {
        Self { store, options }
    }

    /// Ids of curved features in a stored feature set
    pub async fn detect_curves(&self, set: &TableName) -> Result<BTreeSet<FeatureId>> {
        let features = self.store.list_features(set).await?;
        Ok(detect_curves(&set.to_string(), &features))
    }

    /// Validate every geometry of the set without changing anything
    pub async fn check(&self, set: &TableName) -> Result<CheckSummary> {
        let features = self.store.list_features(set).await?;

        let issues: Vec<GeometryIssue> =
            features.iter().flat_map(|f| check_feature(f, self.options.validity)).collect();
        for issue in &issues {
            tracing::warn!(
                feature_set = %set,
                feature_id = %issue.feature_id,
                "{} at {}: {}",
                issue.kind,
                issue.location,
                issue.reason
            );
        }

        Ok(CheckSummary { checked: features.len(), issues })
    }

    /// Repair geometries in place, deleting features that cannot be saved
    ///
    /// A failed write is logged and the pass moves on to the next feature.
    pub async fn repair(&self, set: &TableName) -> Result<RepairSummary> {
        let features = self.store.list_features(set).await?;
        let mut summary = RepairSummary::default();

        for feature in &features {
            let Some(geometry) = &feature.geometry else {
                tracing::warn!(feature_set = %set, feature_id = %feature.id, "Deleting null geometry");
                summary.deleted.push(feature.id);
                continue;
            };

            match repair_geometry(geometry, self.options.validity) {
                RepairOutcome::Unchanged => {}
                RepairOutcome::Repaired(fixed) => {
                    match self.store.update_geometry(set, feature.id, &fixed).await {
                        Ok(()) => {
                            tracing::debug!(
                                feature_set = %set,
                                feature_id = %feature.id,
                                "Geometry repaired"
                            );
                            summary.repaired.push(feature.id);
                        }
                        Err(e) => {
                            tracing::warn!(
                                feature_set = %set,
                                feature_id = %feature.id,
                                error = %e,
                                "Failed to write repaired geometry"
                            );
                            summary.failed.push(feature.id);
                        }
                    }
                }
                RepairOutcome::Unsalvageable(reason) => {
                    tracing::warn!(
                        feature_set = %set,
                        feature_id = %feature.id,
                        "Deleting geometry: {}",
                        reason
                    );
                    summary.deleted.push(feature.id);
                }
            }
        }

        if !summary.deleted.is_empty() {
            self.store.delete_features(set, &summary.deleted).await?;
        }

        tracing::info!(
            feature_set = %set,
            repaired = summary.repaired.len(),
            deleted = summary.deleted.len(),
            failed = summary.failed.len(),
            "Repair finished"
        );
        Ok(summary)
    }

    /// Linearize the curves of the listed features
    ///
    /// Only the listed features are loaded. A feature whose arcs cannot be
    /// linearized, or whose new geometry cannot be written, is logged and left
    /// as it is. The set is checked for curves again afterwards.
    pub async fn densify(
        &self,
        set: &TableName,
        ids: &[FeatureId],
        tolerance: &DensifyTolerance,
    ) -> Result<DensifySummary> {
        let features = self.store.get_features(set, ids).await?;
        let mut summary = DensifySummary::default();

        for feature in &features {
            let Some(geometry) = &feature.geometry else {
                continue;
            };

            match densify_geometry(geometry, tolerance) {
                Ok(linear) if &linear == geometry => {}
                Ok(linear) => match self.store.update_geometry(set, feature.id, &linear).await {
                    Ok(()) => {
                        tracing::info!(
                            feature_set = %set,
                            feature_id = %feature.id,
                            "{} has been densified",
                            feature.id
                        );
                        summary.densified.push(feature.id);
                    }
                    Err(e) => {
                        tracing::warn!(
                            feature_set = %set,
                            feature_id = %feature.id,
                            error = %e,
                            "Failed to write densified geometry"
                        );
                        summary.failed.push(feature.id);
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        feature_set = %set,
                        feature_id = %feature.id,
                        error = %e,
                        "Densify failed"
                    );
                    summary.failed.push(feature.id);
                }
            }
        }

        summary.residual = self.detect_curves(set).await?;
        if summary.residual.is_empty() {
            tracing::info!(feature_set = %set, "{} has no curves", set);
        }

        Ok(summary)
    }

    /// Run the check, repair and curve stages in order
    ///
    /// A stage failure is recorded in the report and the next stage still
    /// runs. Nothing is returned as an error.
    pub async fn check_and_repair(&self, set: &TableName) -> RepairReport {
        let started_at = Utc::now();

        tracing::info!(feature_set = %set, started_at = %Utc::now(), "Checking geometries");
        let (check_outcome, check) = match self.check(set).await {
            Ok(summary) => (StageOutcome::Ok, Some(summary)),
            Err(e) => {
                tracing::error!(feature_set = %set, error = %e, "Geometry check failed");
                (StageOutcome::CheckFailed(e.to_string()), None)
            }
        };

        tracing::info!(feature_set = %set, started_at = %Utc::now(), "Repairing geometries");
        let (repair_outcome, repair) = match self.repair(set).await {
            Ok(summary) => (StageOutcome::Ok, Some(summary)),
            Err(e) => {
                tracing::error!(feature_set = %set, error = %e, "Geometry repair failed");
                (StageOutcome::RepairFailed(e.to_string()), None)
            }
        };

        tracing::info!(feature_set = %set, started_at = %Utc::now(), "Checking for curves");
        let (curve_outcome, curves, densify) = match self.curve_stage(set).await {
            Ok((curves, Some(summary))) if !summary.residual.is_empty() => {
                tracing::warn!(
                    feature_set = %set,
                    residual = summary.residual.len(),
                    "Curves remain after densify"
                );
                (StageOutcome::ResidualCurves(summary.residual.len()), curves, Some(summary))
            }
            Ok((curves, densify)) => (StageOutcome::Ok, curves, densify),
            Err(e) => {
                tracing::error!(feature_set = %set, error = %e, "Curve check failed");
                (StageOutcome::CurveCheckFailed(e.to_string()), BTreeSet::new(), None)
            }
        };

        RepairReport {
            feature_set: set.to_string(),
            started_at,
            finished_at: Utc::now(),
            check_outcome,
            check,
            repair_outcome,
            repair,
            curve_outcome,
            curves,
            densify,
        }
    }

    async fn curve_stage(
        &self,
        set: &TableName,
    ) -> Result<(BTreeSet<FeatureId>, Option<DensifySummary>)> {
        let curves = self.detect_curves(set).await?;
        if curves.is_empty() {
            tracing::info!(feature_set = %set, "{} has no curves", set);
            return Ok((curves, None));
        }

        let ids: Vec<FeatureId> = curves.iter().copied().collect();
        let summary = self.densify(set, &ids, &self.options.tolerance).await?;
        Ok((curves, Some(summary)))
    }
}
