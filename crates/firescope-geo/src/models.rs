//! Geometry models for firescope-geo.
//!
//! Re-exports the canonical types from `firescope-core` and converts rings
//! and lines to and from the `geo` crate. Curve geometries have no `geo`
//! counterpart and must be densified first.

pub use firescope_core::models::{
    CurveVertex, DensifyTolerance, Feature, FeatureId, Geometry, ValidityMode,
};

fn coord(c: &[f64; 2]) -> geo::Coord {
    geo::Coord { x: c[0], y: c[1] }
}

pub(crate) fn to_line_string(coords: &[[f64; 2]]) -> geo::LineString {
    geo::LineString::new(coords.iter().map(coord).collect())
}

pub(crate) fn to_polygon(rings: &[Vec<[f64; 2]>]) -> geo::Polygon {
    let mut rings = rings.iter().map(|ring| to_line_string(ring));
    let exterior = rings.next().unwrap_or_else(|| geo::LineString::new(vec![]));
    geo::Polygon::new(exterior, rings.collect())
}

fn from_line_string(line: &geo::LineString) -> Vec<[f64; 2]> {
    line.coords().map(|c| [c.x, c.y]).collect()
}

pub(crate) fn from_polygon(polygon: &geo::Polygon) -> Vec<Vec<[f64; 2]>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(from_line_string)
        .collect()
}
