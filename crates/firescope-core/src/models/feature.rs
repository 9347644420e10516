use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::geometry::Geometry;

/// Object identifier of a feature within its feature set
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(pub u64);

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Spatial feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Object identifier
    pub id: FeatureId,

    /// Geometry, `None` for null shapes
    pub geometry: Option<Geometry>,

    /// Attribute values
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
}

impl Feature {
    /// Create a new feature with geometry and no attributes
    pub fn new(id: FeatureId, geometry: Geometry) -> Self {
        Self { id, geometry: Some(geometry), properties: HashMap::new() }
    }

    /// Create a feature carrying a null shape
    pub fn null_shape(id: FeatureId) -> Self {
        Self { id, geometry: None, properties: HashMap::new() }
    }

    /// Attach an attribute value
    pub fn with_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}

/// A named collection of features sharing one CRS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    /// Feature set name (table name when stored in a database)
    pub name: String,

    /// CRS EPSG code
    pub crs: u32,

    pub features: Vec<Feature>,
}

impl FeatureSet {
    pub fn new(name: impl Into<String>, crs: u32, features: Vec<Feature>) -> Self {
        Self { name: name.into(), crs, features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
