//! End-to-end runs of the geometry repair workflow

use async_trait::async_trait;
use firescope_core::error::{FirescopeError, Result};
use firescope_core::models::{
    CurveVertex, DensifyTolerance, Feature, FeatureId, FeatureSet, Geometry, TableName,
    ValidityMode,
};
use firescope_core::ports::FeatureStore;
use firescope_geo::{GeometryRepairer, IssueKind, RepairOptions, StageOutcome};
use firescope_store::MemoryFeatureStore;
use std::sync::Arc;

fn square(x: f64, y: f64) -> Geometry {
    Geometry::polygon(vec![vec![
        [x, y],
        [x + 10.0, y],
        [x + 10.0, y + 10.0],
        [x, y + 10.0],
        [x, y],
    ]])
}

/// Half disc with a straight base and an arc over the top
fn half_disc(cx: f64, cy: f64, r: f64) -> Geometry {
    Geometry::curve_polygon(vec![vec![
        CurveVertex::Vertex([cx - r, cy]),
        CurveVertex::Vertex([cx + r, cy]),
        CurveVertex::arc([cx - r, cy], [cx, cy + r]),
    ]])
}

async fn store_with(features: Vec<Feature>) -> (Arc<MemoryFeatureStore>, TableName) {
    let store = Arc::new(MemoryFeatureStore::new());
    let name = store.create_feature_set(&FeatureSet::new("fhsz_lra", 3310, features)).await.unwrap();
    (store, name)
}

#[tokio::test]
async fn test_three_polygons_one_curved() {
    let (store, name) = store_with(vec![
        Feature::new(FeatureId(1), square(0.0, 0.0)),
        Feature::new(FeatureId(2), half_disc(100.0, 100.0, 50.0)),
        Feature::new(FeatureId(3), square(20.0, 0.0)),
    ])
    .await;
    let repairer = GeometryRepairer::new(store.clone(), RepairOptions::default());

    let report = repairer.check_and_repair(&name).await;

    assert!(report.is_clean(), "{:?}", report.outcomes());
    assert_eq!(report.curves.iter().copied().collect::<Vec<_>>(), vec![FeatureId(2)]);
    let densify = report.densify.as_ref().unwrap();
    assert_eq!(densify.densified, vec![FeatureId(2)]);
    assert!(densify.failed.is_empty());
    assert!(densify.residual.is_empty());
    assert!(report.finished_at >= report.started_at);

    assert!(repairer.detect_curves(&name).await.unwrap().is_empty());
    assert_eq!(store.feature_count(&name).await.unwrap(), 3);

    let densified = store.get_features(&name, &[FeatureId(2)]).await.unwrap();
    assert!(matches!(densified[0].geometry, Some(Geometry::Polygon { .. })));
}

#[tokio::test]
async fn test_no_curves_means_no_mutation() {
    let features = vec![
        Feature::new(FeatureId(1), square(0.0, 0.0)),
        Feature::new(FeatureId(2), Geometry::line_string(vec![[0.0, 0.0], [5.0, 5.0]])),
    ];
    let (store, name) = store_with(features.clone()).await;
    let repairer = GeometryRepairer::new(store.clone(), RepairOptions::default());

    assert!(repairer.detect_curves(&name).await.unwrap().is_empty());
    let report = repairer.check_and_repair(&name).await;

    assert!(report.is_clean());
    assert!(report.densify.is_none());
    assert_eq!(report.check.as_ref().unwrap().checked, 2);
    assert_eq!(store.list_features(&name).await.unwrap(), features);
}

#[tokio::test]
async fn test_every_curved_feature_is_densified() {
    let features = (1..=6)
        .map(|i| Feature::new(FeatureId(i), half_disc(i as f64 * 1000.0, 0.0, 10.0 * i as f64)))
        .collect();
    let (store, name) = store_with(features).await;
    let repairer = GeometryRepairer::new(store, RepairOptions::default());

    let report = repairer.check_and_repair(&name).await;

    assert_eq!(report.curves.len(), 6);
    assert_eq!(report.curve_outcome, StageOutcome::Ok);
    assert!(repairer.detect_curves(&name).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_null_and_broken_geometries_are_removed() {
    let (store, name) = store_with(vec![
        Feature::new(FeatureId(1), square(0.0, 0.0)),
        Feature::null_shape(FeatureId(2)),
        Feature::new(FeatureId(3), Geometry::polygon(vec![vec![[0.0, 0.0], [1.0, 1.0]]])),
        Feature::new(
            FeatureId(4),
            Geometry::polygon(vec![vec![[0.0, 0.0], [0.0, 5.0], [5.0, 5.0], [5.0, 0.0]]]),
        ),
    ])
    .await;
    let repairer = GeometryRepairer::new(store.clone(), RepairOptions::default());

    let report = repairer.check_and_repair(&name).await;

    let check = report.check.as_ref().unwrap();
    assert!(check.issues.iter().any(|i| i.feature_id == FeatureId(2) && i.kind == IssueKind::NullGeometry));
    assert!(check.issues.iter().any(|i| i.feature_id == FeatureId(4) && i.kind == IssueKind::UnclosedRing));

    let repair = report.repair.as_ref().unwrap();
    assert_eq!(repair.deleted, vec![FeatureId(2), FeatureId(3)]);
    assert_eq!(repair.repaired, vec![FeatureId(4)]);

    assert_eq!(store.feature_count(&name).await.unwrap(), 2);
    let after = repairer.check(&name).await.unwrap();
    assert!(after.issues.is_empty(), "{:?}", after.issues);
}

#[tokio::test]
async fn test_undensifiable_curve_is_reported_as_residual() {
    let broken = Geometry::curve_polygon(vec![vec![
        CurveVertex::Vertex([0.0, 0.0]),
        CurveVertex::arc([0.0, 0.0], [0.0, 0.0]),
    ]]);
    let (store, name) = store_with(vec![
        Feature::new(FeatureId(1), half_disc(0.0, 0.0, 5.0)),
        Feature::new(FeatureId(2), broken),
    ])
    .await;
    let repairer = GeometryRepairer::new(store, RepairOptions::default());

    let report = repairer.check_and_repair(&name).await;

    assert_eq!(report.curve_outcome, StageOutcome::ResidualCurves(1));
    let densify = report.densify.unwrap();
    assert_eq!(densify.densified, vec![FeatureId(1)]);
    assert_eq!(densify.failed, vec![FeatureId(2)]);
    assert!(densify.residual.contains(&FeatureId(2)));
}

#[tokio::test]
async fn test_densify_only_touches_requested_ids() {
    let (store, name) = store_with(vec![
        Feature::new(FeatureId(1), half_disc(0.0, 0.0, 5.0)),
        Feature::new(FeatureId(2), half_disc(50.0, 0.0, 5.0)),
    ])
    .await;
    let repairer = GeometryRepairer::new(
        store,
        RepairOptions { validity: ValidityMode::Lenient, tolerance: DensifyTolerance::default() },
    );

    let summary =
        repairer.densify(&name, &[FeatureId(2)], &DensifyTolerance::default()).await.unwrap();
    assert_eq!(summary.densified, vec![FeatureId(2)]);
    assert_eq!(summary.residual.into_iter().collect::<Vec<_>>(), vec![FeatureId(1)]);

    // A second pass finds nothing left to do on the same feature
    let again =
        repairer.densify(&name, &[FeatureId(2)], &DensifyTolerance::default()).await.unwrap();
    assert!(again.densified.is_empty());
}

/// Store that can be told to fail reads, writes, or updates of chosen features
#[derive(Default)]
struct FailingStore {
    inner: MemoryFeatureStore,
    fail_reads: bool,
    fail_writes: bool,
    locked: Vec<FeatureId>,
}

fn unavailable() -> FirescopeError {
    FirescopeError::Database("connection reset".to_string())
}

#[async_trait]
impl FeatureStore for FailingStore {
    async fn create_feature_set(&self, set: &FeatureSet) -> Result<TableName> {
        self.inner.create_feature_set(set).await
    }

    async fn list_features(&self, set: &TableName) -> Result<Vec<Feature>> {
        if self.fail_reads {
            return Err(unavailable());
        }
        self.inner.list_features(set).await
    }

    async fn get_features(&self, set: &TableName, ids: &[FeatureId]) -> Result<Vec<Feature>> {
        if self.fail_reads {
            return Err(unavailable());
        }
        self.inner.get_features(set, ids).await
    }

    async fn update_geometry(
        &self,
        set: &TableName,
        id: FeatureId,
        geometry: &Geometry,
    ) -> Result<()> {
        if self.fail_writes {
            return Err(unavailable());
        }
        if self.locked.contains(&id) {
            return Err(FirescopeError::Database(format!("row {} is locked", id)));
        }
        self.inner.update_geometry(set, id, geometry).await
    }

    async fn delete_features(&self, set: &TableName, ids: &[FeatureId]) -> Result<usize> {
        if self.fail_writes {
            return Err(unavailable());
        }
        self.inner.delete_features(set, ids).await
    }

    async fn feature_count(&self, set: &TableName) -> Result<usize> {
        self.inner.feature_count(set).await
    }
}

#[tokio::test]
async fn test_every_stage_runs_when_reads_fail() {
    let store = FailingStore { fail_reads: true, ..Default::default() };
    let name = TableName::parse("fhsz_sra").unwrap();
    let repairer = GeometryRepairer::new(Arc::new(store), RepairOptions::default());

    let report = repairer.check_and_repair(&name).await;

    assert!(matches!(report.check_outcome, StageOutcome::CheckFailed(_)));
    assert!(matches!(report.repair_outcome, StageOutcome::RepairFailed(_)));
    assert!(matches!(report.curve_outcome, StageOutcome::CurveCheckFailed(_)));
    assert!(!report.is_clean());
}

#[tokio::test]
async fn test_failed_writes_do_not_stop_later_stages() {
    let inner = MemoryFeatureStore::new();
    let name = inner
        .create_feature_set(&FeatureSet::new(
            "fhsz_sra",
            3310,
            vec![
                Feature::null_shape(FeatureId(1)),
                Feature::new(FeatureId(2), half_disc(0.0, 0.0, 5.0)),
            ],
        ))
        .await
        .unwrap();
    let store = FailingStore { inner, fail_writes: true, ..Default::default() };
    let repairer = GeometryRepairer::new(Arc::new(store), RepairOptions::default());

    let report = repairer.check_and_repair(&name).await;

    assert_eq!(report.check_outcome, StageOutcome::Ok);
    assert!(matches!(report.repair_outcome, StageOutcome::RepairFailed(_)));
    assert_eq!(report.curve_outcome, StageOutcome::ResidualCurves(1));
    assert_eq!(report.curves.len(), 1);
    assert_eq!(report.densify.unwrap().failed, vec![FeatureId(2)]);
}

async fn locked_store(
    features: Vec<Feature>,
    locked: Vec<FeatureId>,
) -> (Arc<FailingStore>, TableName) {
    let inner = MemoryFeatureStore::new();
    let name =
        inner.create_feature_set(&FeatureSet::new("fhsz_sra", 3310, features)).await.unwrap();
    (Arc::new(FailingStore { inner, locked, ..Default::default() }), name)
}

#[tokio::test]
async fn test_one_locked_feature_does_not_stop_densify() {
    let (store, name) = locked_store(
        vec![
            Feature::new(FeatureId(1), half_disc(0.0, 0.0, 50.0)),
            Feature::new(FeatureId(2), half_disc(200.0, 0.0, 50.0)),
            Feature::new(FeatureId(3), half_disc(400.0, 0.0, 50.0)),
        ],
        vec![FeatureId(1)],
    )
    .await;
    let repairer = GeometryRepairer::new(store.clone(), RepairOptions::default());

    let report = repairer.check_and_repair(&name).await;

    assert_eq!(report.curve_outcome, StageOutcome::ResidualCurves(1));
    let densify = report.densify.as_ref().unwrap();
    assert_eq!(densify.densified, vec![FeatureId(2), FeatureId(3)]);
    assert_eq!(densify.failed, vec![FeatureId(1)]);
    assert_eq!(densify.residual.iter().copied().collect::<Vec<_>>(), vec![FeatureId(1)]);
    assert_eq!(
        repairer.detect_curves(&name).await.unwrap().into_iter().collect::<Vec<_>>(),
        vec![FeatureId(1)]
    );
}

#[tokio::test]
async fn test_one_locked_feature_does_not_stop_repair() {
    let unclosed = |x: f64| {
        Geometry::polygon(vec![vec![[x, 0.0], [x, 5.0], [x + 5.0, 5.0], [x + 5.0, 0.0]]])
    };
    let (store, name) = locked_store(
        vec![
            Feature::new(FeatureId(1), square(0.0, 0.0)),
            Feature::null_shape(FeatureId(4)),
            Feature::new(FeatureId(5), unclosed(10.0)),
            Feature::new(FeatureId(6), unclosed(20.0)),
        ],
        vec![FeatureId(5)],
    )
    .await;
    let repairer = GeometryRepairer::new(store.clone(), RepairOptions::default());

    let report = repairer.check_and_repair(&name).await;

    assert_eq!(report.repair_outcome, StageOutcome::Ok);
    let repair = report.repair.as_ref().unwrap();
    assert_eq!(repair.failed, vec![FeatureId(5)]);
    assert_eq!(repair.repaired, vec![FeatureId(6)]);
    assert_eq!(repair.deleted, vec![FeatureId(4)]);

    let remaining: Vec<FeatureId> =
        store.list_features(&name).await.unwrap().into_iter().map(|f| f.id).collect();
    assert_eq!(remaining, vec![FeatureId(1), FeatureId(5), FeatureId(6)]);

    let after = repairer.check(&name).await.unwrap();
    assert!(after.issues.iter().all(|issue| issue.feature_id == FeatureId(5)));
    assert!(!after.issues.is_empty());
}

#[tokio::test]
async fn test_report_serializes_outcomes() {
    let (store, name) = store_with(vec![Feature::new(FeatureId(1), square(0.0, 0.0))]).await;
    let repairer = GeometryRepairer::new(store, RepairOptions::default());

    let report = repairer.check_and_repair(&name).await;
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["feature_set"], "fhsz_lra");
    assert_eq!(json["curve_outcome"]["status"], "ok");
}
