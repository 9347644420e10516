use async_trait::async_trait;

use crate::error::Result;
use crate::models::{BoundedScan, BuildingRecord, Feature, FeatureId, FeatureSet, Geometry, TableName};

/// Port for cursor-style access to feature sets
#[async_trait]
pub trait FeatureStore: Send + Sync {
    /// Create (or replace) a feature set with the given features
    async fn create_feature_set(&self, set: &FeatureSet) -> Result<TableName>;

    /// Read every feature of a set, ordered by id
    async fn list_features(&self, set: &TableName) -> Result<Vec<Feature>>;

    /// Read only the features whose ids are listed, ordered by id
    async fn get_features(&self, set: &TableName, ids: &[FeatureId]) -> Result<Vec<Feature>>;

    /// Replace the geometry of one feature
    async fn update_geometry(&self, set: &TableName, id: FeatureId, geometry: &Geometry)
        -> Result<()>;

    /// Delete features by id, returning how many were removed
    async fn delete_features(&self, set: &TableName, ids: &[FeatureId]) -> Result<usize>;

    /// Number of features in a set
    async fn feature_count(&self, set: &TableName) -> Result<usize>;
}

/// Port for the analytical engine that materializes bounded extracts
#[async_trait]
pub trait TableEngine: Send + Sync {
    /// Materialize `scan` into `target`, replacing any existing table of that
    /// name. Returns the number of rows written.
    async fn replace_from_scan(&self, target: &TableName, scan: &BoundedScan) -> Result<u64>;

    /// Number of rows in a materialized table
    async fn count_rows(&self, table: &TableName) -> Result<u64>;

    /// Read back a materialized building table
    async fn read_buildings(&self, table: &TableName) -> Result<Vec<BuildingRecord>>;
}
