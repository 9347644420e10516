//! Building footprint records, as found in the source dataset and as
//! materialized into local tables.

use serde::{Deserialize, Serialize};

use super::bbox::BoundingBox;
use super::geometry::Geometry;
use super::table::RemoteDataset;

/// Columns of a materialized building table, in order
pub const BUILDING_COLUMNS: &[&str] = &[
    "id",
    "source",
    "subtype",
    "class",
    "level",
    "has_parts",
    "height",
    "is_underground",
    "num_floors",
    "num_floors_underground",
    "min_height",
    "min_floor",
    "facade_color",
    "facade_material",
    "roof_material",
    "roof_shape",
    "roof_direction",
    "roof_orientation",
    "roof_color",
    "roof_height",
    "geom",
];

/// Provenance entry of a source building
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SourceRef {
    pub property: Option<String>,
    pub dataset: Option<String>,
    pub record_id: Option<String>,
    pub update_time: Option<String>,
    pub confidence: Option<f64>,
}

/// Physical attributes shared by source and materialized buildings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BuildingAttributes {
    pub subtype: Option<String>,
    pub class: Option<String>,
    pub level: Option<i32>,
    pub has_parts: Option<bool>,
    pub height: Option<f64>,
    pub is_underground: Option<bool>,
    pub num_floors: Option<i32>,
    pub num_floors_underground: Option<i32>,
    pub min_height: Option<f64>,
    pub min_floor: Option<i32>,
    pub facade_color: Option<String>,
    pub facade_material: Option<String>,
    pub roof_material: Option<String>,
    pub roof_shape: Option<String>,
    pub roof_direction: Option<f64>,
    pub roof_orientation: Option<String>,
    pub roof_color: Option<String>,
    pub roof_height: Option<f64>,
}

/// A building row in the large source dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteBuilding {
    pub id: String,
    #[serde(default)]
    pub sources: Vec<SourceRef>,
    #[serde(flatten)]
    pub attributes: BuildingAttributes,
    /// Precomputed bounding box of `geometry`
    pub bbox: BoundingBox,
    pub geometry: Geometry,
}

/// A building row in a materialized local table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingRecord {
    pub id: String,
    /// `dataset` of the first provenance entry
    pub source: Option<String>,
    #[serde(flatten)]
    pub attributes: BuildingAttributes,
    pub geom: Geometry,
}

impl From<&RemoteBuilding> for BuildingRecord {
    fn from(remote: &RemoteBuilding) -> Self {
        Self {
            id: remote.id.clone(),
            source: remote.sources.first().and_then(|s| s.dataset.clone()),
            attributes: remote.attributes.clone(),
            geom: remote.geometry.clone(),
        }
    }
}

/// A strict-containment scan over a source dataset
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedScan {
    pub source: RemoteDataset,
    pub bbox: BoundingBox,
}

impl BoundedScan {
    pub fn new(source: RemoteDataset, bbox: BoundingBox) -> Self {
        Self { source, bbox }
    }

    /// Whether a source record passes the scan predicate
    pub fn keeps(&self, record: &RemoteBuilding) -> bool {
        self.bbox.strictly_contains(&record.bbox)
    }
}
