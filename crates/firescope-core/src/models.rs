pub mod bbox;
pub mod building;
pub mod feature;
pub mod geometry;
pub mod table;

pub use bbox::BoundingBox;
pub use building::{
    BoundedScan, BuildingAttributes, BuildingRecord, RemoteBuilding, SourceRef, BUILDING_COLUMNS,
};
pub use feature::{Feature, FeatureId, FeatureSet};
pub use geometry::{
    CurveVertex, DensifyTolerance, Geometry, GeometryType, ValidityMode, CURVE_MARKER,
};
pub use table::{RemoteDataset, TableName};
