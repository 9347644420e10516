//! In-memory adapters for development and testing.
//!
//! These implementations use `RwLock::unwrap()` intentionally. Lock poisoning
//! only occurs when another thread panicked while holding the lock, which is
//! an unrecoverable state. For real extracts, use the PostgreSQL backend.

use async_trait::async_trait;
use firescope_core::error::{FirescopeError, Result};
use firescope_core::models::{
    BoundedScan, BuildingRecord, Feature, FeatureId, FeatureSet, Geometry, RemoteBuilding,
    TableName,
};
use firescope_core::ports::{FeatureStore, TableEngine};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// In-memory implementation of FeatureStore
#[derive(Debug, Clone, Default)]
pub struct MemoryFeatureStore {
    sets: Arc<RwLock<HashMap<TableName, FeatureSet>>>,
}

impl MemoryFeatureStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of a stored feature set, features ordered by id
    pub fn feature_set(&self, name: &TableName) -> Option<FeatureSet> {
        self.sets.read().unwrap().get(name).cloned()
    }

    fn not_found(name: &TableName) -> FirescopeError {
        FirescopeError::FeatureSetNotFound { name: name.to_string() }
    }
}

#[async_trait]
impl FeatureStore for MemoryFeatureStore {
    async fn create_feature_set(&self, set: &FeatureSet) -> Result<TableName> {
        let name = TableName::parse(&set.name)?;

        let mut seen = HashSet::new();
        if let Some(dup) = set.features.iter().find(|f| !seen.insert(f.id)) {
            return Err(FirescopeError::DuplicateFeature { set: set.name.clone(), id: dup.id.0 });
        }

        let mut stored = set.clone();
        stored.features.sort_by_key(|f| f.id);
        self.sets.write().unwrap().insert(name.clone(), stored);
        Ok(name)
    }

    async fn list_features(&self, set: &TableName) -> Result<Vec<Feature>> {
        let sets = self.sets.read().unwrap();
        let stored = sets.get(set).ok_or_else(|| Self::not_found(set))?;
        Ok(stored.features.clone())
    }

    async fn get_features(&self, set: &TableName, ids: &[FeatureId]) -> Result<Vec<Feature>> {
        let wanted: HashSet<FeatureId> = ids.iter().copied().collect();
        let sets = self.sets.read().unwrap();
        let stored = sets.get(set).ok_or_else(|| Self::not_found(set))?;
        Ok(stored.features.iter().filter(|f| wanted.contains(&f.id)).cloned().collect())
    }

    async fn update_geometry(
        &self,
        set: &TableName,
        id: FeatureId,
        geometry: &Geometry,
    ) -> Result<()> {
        let mut sets = self.sets.write().unwrap();
        let stored = sets.get_mut(set).ok_or_else(|| Self::not_found(set))?;
        let feature = stored
            .features
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| FirescopeError::FeatureNotFound { set: set.to_string(), id: id.0 })?;
        feature.geometry = Some(geometry.clone());
        Ok(())
    }

    async fn delete_features(&self, set: &TableName, ids: &[FeatureId]) -> Result<usize> {
        let doomed: HashSet<FeatureId> = ids.iter().copied().collect();
        let mut sets = self.sets.write().unwrap();
        let stored = sets.get_mut(set).ok_or_else(|| Self::not_found(set))?;
        let before = stored.features.len();
        stored.features.retain(|f| !doomed.contains(&f.id));
        Ok(before - stored.features.len())
    }

    async fn feature_count(&self, set: &TableName) -> Result<usize> {
        let sets = self.sets.read().unwrap();
        Ok(sets.get(set).ok_or_else(|| Self::not_found(set))?.features.len())
    }
}

/// In-memory implementation of TableEngine
///
/// Source datasets are registered up front under the reference string a
/// `RemoteDataset` displays as.
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    datasets: Arc<RwLock<HashMap<String, Vec<RemoteBuilding>>>>,
    tables: Arc<RwLock<HashMap<TableName, Vec<BuildingRecord>>>>,
}

impl MemoryEngine {
    /// Create a new engine with no datasets
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a source dataset available under `reference`
    pub fn register_dataset(&self, reference: impl Into<String>, rows: Vec<RemoteBuilding>) {
        self.datasets.write().unwrap().insert(reference.into(), rows);
    }

    /// Copy of a materialized table
    pub fn table(&self, name: &TableName) -> Option<Vec<BuildingRecord>> {
        self.tables.read().unwrap().get(name).cloned()
    }
}

#[async_trait]
impl TableEngine for MemoryEngine {
    async fn replace_from_scan(&self, target: &TableName, scan: &BoundedScan) -> Result<u64> {
        let reference = scan.source.to_string();
        let rows: Vec<BuildingRecord> = {
            let datasets = self.datasets.read().unwrap();
            let source = datasets
                .get(&reference)
                .ok_or(FirescopeError::DatasetNotFound { reference })?;
            source.iter().filter(|r| scan.keeps(r)).map(BuildingRecord::from).collect()
        };

        let count = rows.len() as u64;
        self.tables.write().unwrap().insert(target.clone(), rows);
        Ok(count)
    }

    async fn count_rows(&self, table: &TableName) -> Result<u64> {
        let tables = self.tables.read().unwrap();
        let rows = tables
            .get(table)
            .ok_or_else(|| FirescopeError::TableNotFound { name: table.to_string() })?;
        Ok(rows.len() as u64)
    }

    async fn read_buildings(&self, table: &TableName) -> Result<Vec<BuildingRecord>> {
        self.tables
            .read()
            .unwrap()
            .get(table)
            .cloned()
            .ok_or_else(|| FirescopeError::TableNotFound { name: table.to_string() })
    }
}
