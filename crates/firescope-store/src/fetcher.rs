//! Bounded extracts of a large remote building dataset into local tables.

use firescope_core::error::Result;
use firescope_core::models::{BoundedScan, BoundingBox, RemoteDataset, TableName};
use firescope_core::ports::TableEngine;
use serde::Serialize;
use std::sync::Arc;

/// What a fetch materialized
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchSummary {
    pub table: TableName,
    pub source: String,
    pub rows: u64,
    pub bbox: BoundingBox,
}

/// Copies the source rows lying strictly inside a bounding box into a
/// local table, replacing the table if it exists
pub struct BoundedRemoteFetcher {
    engine: Arc<dyn TableEngine>,
}

impl BoundedRemoteFetcher {
    pub fn new(engine: Arc<dyn TableEngine>) -> Self {
        Self { engine }
    }

    /// Materialize the rows of `source` strictly inside `bbox` into `target`
    ///
    /// The box is not validated; an inverted or zero-area box yields an empty
    /// table. Engine failures are returned unchanged.
    pub async fn fetch(
        &self,
        source: &RemoteDataset,
        bbox: &BoundingBox,
        target: &TableName,
    ) -> Result<FetchSummary> {
        if !bbox.is_proper() {
            tracing::debug!(bbox = %bbox, "Bounding box has no area, extract will be empty");
        }

        tracing::info!(source = %source, table = %target, bbox = %bbox, "Fetching buildings");
        let scan = BoundedScan::new(source.clone(), *bbox);
        let rows = self.engine.replace_from_scan(target, &scan).await?;
        tracing::info!(table = %target, rows, "{} created", target);

        Ok(FetchSummary { table: target.clone(), source: source.to_string(), rows, bbox: *bbox })
    }
}
