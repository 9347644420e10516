//! Canonical geometry types used across all firescope crates.
//!
//! Linear geometries serialize exactly like GeoJSON. Geometries holding
//! circular arcs use Esri-style `curvePaths` / `curveRings` members, where an
//! arc is written as `{"c": [[end_x, end_y], [interior_x, interior_y]]}` and
//! starts at the preceding vertex.

use serde::{Deserialize, Serialize};

/// Substring that marks a curve-capable geometry in its JSON serialization.
pub const CURVE_MARKER: &str = "curve";

/// Geometry validation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ValidityMode {
    /// OGC rules: structural checks plus self-intersection and ring orientation
    #[default]
    Strict,
    /// Structural checks only
    Lenient,
}

/// Limits for replacing circular arcs with straight segments
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DensifyTolerance {
    /// Largest angle, in radians, one segment may subtend at the arc center
    pub max_angle: f64,
    /// Largest distance allowed between a segment and the true arc
    pub max_deviation: f64,
}

impl DensifyTolerance {
    /// 10 degrees
    pub const DEFAULT_MAX_ANGLE: f64 = 0.174533;
    pub const DEFAULT_MAX_DEVIATION: f64 = 10000.0;

    pub fn new(max_angle: f64, max_deviation: f64) -> Self {
        Self { max_angle, max_deviation }
    }
}

impl Default for DensifyTolerance {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ANGLE, Self::DEFAULT_MAX_DEVIATION)
    }
}

/// Geometry type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    CurveLineString,
    CurvePolygon,
}

impl std::fmt::Display for GeometryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One element of a curve-capable path or ring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CurveVertex {
    /// Plain vertex, joined to the previous one by a straight segment
    Vertex([f64; 2]),
    /// Circular arc from the previous vertex through `c[1]` to `c[0]`
    Arc { c: [[f64; 2]; 2] },
}

impl CurveVertex {
    /// Create an arc element ending at `end` and passing through `interior`
    pub fn arc(end: [f64; 2], interior: [f64; 2]) -> Self {
        CurveVertex::Arc { c: [end, interior] }
    }

    /// Point where this element ends
    pub fn end(&self) -> [f64; 2] {
        match self {
            CurveVertex::Vertex(p) => *p,
            CurveVertex::Arc { c } => c[0],
        }
    }
}

/// GeoJSON-compatible geometry representation with curve extensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point {
        coordinates: [f64; 2],
    },
    LineString {
        coordinates: Vec<[f64; 2]>,
    },
    Polygon {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    MultiPoint {
        coordinates: Vec<[f64; 2]>,
    },
    MultiLineString {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<[f64; 2]>>>,
    },
    CurveLineString {
        #[serde(rename = "curvePaths")]
        curve_paths: Vec<Vec<CurveVertex>>,
    },
    CurvePolygon {
        #[serde(rename = "curveRings")]
        curve_rings: Vec<Vec<CurveVertex>>,
    },
}

impl Geometry {
    /// Create a Point geometry
    pub fn point(x: f64, y: f64) -> Self {
        Geometry::Point { coordinates: [x, y] }
    }

    /// Create a LineString geometry
    pub fn line_string(coords: Vec<[f64; 2]>) -> Self {
        Geometry::LineString { coordinates: coords }
    }

    /// Create a Polygon geometry
    pub fn polygon(rings: Vec<Vec<[f64; 2]>>) -> Self {
        Geometry::Polygon { coordinates: rings }
    }

    /// Create a curve-capable polygon
    pub fn curve_polygon(rings: Vec<Vec<CurveVertex>>) -> Self {
        Geometry::CurvePolygon { curve_rings: rings }
    }

    /// Create a curve-capable line
    pub fn curve_line_string(paths: Vec<Vec<CurveVertex>>) -> Self {
        Geometry::CurveLineString { curve_paths: paths }
    }

    /// Get the geometry type
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Point { .. } => GeometryType::Point,
            Geometry::LineString { .. } => GeometryType::LineString,
            Geometry::Polygon { .. } => GeometryType::Polygon,
            Geometry::MultiPoint { .. } => GeometryType::MultiPoint,
            Geometry::MultiLineString { .. } => GeometryType::MultiLineString,
            Geometry::MultiPolygon { .. } => GeometryType::MultiPolygon,
            Geometry::CurveLineString { .. } => GeometryType::CurveLineString,
            Geometry::CurvePolygon { .. } => GeometryType::CurvePolygon,
        }
    }

    /// Whether the serialized form carries the curve marker
    pub fn has_curve_marker(&self) -> bool {
        serde_json::to_string(self).map(|json| json.contains(CURVE_MARKER)).unwrap_or(false)
    }

    /// All stored coordinates, including arc interior points
    pub fn vertices(&self) -> Vec<[f64; 2]> {
        match self {
            Geometry::Point { coordinates } => vec![*coordinates],
            Geometry::LineString { coordinates } | Geometry::MultiPoint { coordinates } => {
                coordinates.clone()
            }
            Geometry::Polygon { coordinates } | Geometry::MultiLineString { coordinates } => {
                coordinates.iter().flatten().copied().collect()
            }
            Geometry::MultiPolygon { coordinates } => {
                coordinates.iter().flatten().flatten().copied().collect()
            }
            Geometry::CurveLineString { curve_paths: parts }
            | Geometry::CurvePolygon { curve_rings: parts } => parts
                .iter()
                .flatten()
                .flat_map(|v| match v {
                    CurveVertex::Vertex(p) => vec![*p],
                    CurveVertex::Arc { c } => vec![c[1], c[0]],
                })
                .collect(),
        }
    }

    /// True when the geometry holds no coordinates at all
    pub fn is_empty(&self) -> bool {
        self.vertices().is_empty()
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_serialization() {
        let point = Geometry::point(-122.708061, 38.365655);
        let json = serde_json::to_string(&point).unwrap();
        assert!(json.contains("Point"));

        let parsed: Geometry = serde_json::from_str(&json).unwrap();
        assert_eq!(point, parsed);
    }

    #[test]
    fn test_curve_polygon_uses_esri_members() {
        let geom = Geometry::curve_polygon(vec![vec![
            CurveVertex::Vertex([0.0, 0.0]),
            CurveVertex::Vertex([10.0, 0.0]),
            CurveVertex::arc([0.0, 0.0], [5.0, 5.0]),
        ]]);
        let json = serde_json::to_string(&geom).unwrap();
        assert!(json.contains("\"curveRings\""));
        assert!(json.contains("{\"c\":[[0.0,0.0],[5.0,5.0]]}"));

        let parsed: Geometry = serde_json::from_str(&json).unwrap();
        assert_eq!(geom, parsed);
    }

    #[test]
    fn test_curve_marker_only_on_curve_variants() {
        let square = Geometry::polygon(vec![vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.0, 1.0],
            [0.0, 0.0],
        ]]);
        assert!(!square.has_curve_marker());

        let arc = Geometry::curve_line_string(vec![vec![
            CurveVertex::Vertex([0.0, 0.0]),
            CurveVertex::arc([2.0, 0.0], [1.0, 1.0]),
        ]]);
        assert!(arc.has_curve_marker());
    }

    #[test]
    fn test_vertices_include_arc_interior() {
        let arc = Geometry::curve_line_string(vec![vec![
            CurveVertex::Vertex([0.0, 0.0]),
            CurveVertex::arc([2.0, 0.0], [1.0, 1.0]),
        ]]);
        assert_eq!(arc.vertices(), vec![[0.0, 0.0], [1.0, 1.0], [2.0, 0.0]]);
    }
}
