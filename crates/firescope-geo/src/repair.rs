//! In-place geometry repair
//!
//! Fixes the structural problems reported by `check_geometry`. Self
//! intersections are reported but not rewritten. Curve geometries pass
//! through untouched; the densify stage linearizes them.

use geo::orient::{Direction, Orient};

use crate::models::{from_polygon, to_polygon, Geometry, ValidityMode};

/// Result of repairing one geometry
#[derive(Debug, Clone, PartialEq)]
pub enum RepairOutcome {
    /// Nothing needed fixing
    Unchanged,
    /// The geometry was rewritten
    Repaired(Geometry),
    /// Nothing usable survived; the feature should be deleted
    Unsalvageable(String),
}

/// Repair a geometry
///
/// Drops non-finite coordinates and repeated consecutive vertices, closes
/// rings and discards degenerate holes. In strict mode rings are also
/// re-oriented, exterior counter-clockwise and holes clockwise.
pub fn repair_geometry(geometry: &Geometry, mode: ValidityMode) -> RepairOutcome {
    let repaired = match geometry {
        Geometry::CurveLineString { .. } | Geometry::CurvePolygon { .. } => {
            return RepairOutcome::Unchanged
        }
        Geometry::Point { coordinates } => {
            if !is_finite(coordinates) {
                return RepairOutcome::Unsalvageable("Point has non-finite coordinates".to_string());
            }
            return RepairOutcome::Unchanged;
        }
        Geometry::MultiPoint { coordinates } => {
            let points: Vec<[f64; 2]> = coordinates.iter().copied().filter(is_finite).collect();
            if points.is_empty() {
                return RepairOutcome::Unsalvageable("MultiPoint has no finite points".to_string());
            }
            Geometry::MultiPoint { coordinates: points }
        }
        Geometry::LineString { coordinates } => match repair_line(coordinates) {
            Some(line) => Geometry::LineString { coordinates: line },
            None => {
                return RepairOutcome::Unsalvageable(
                    "LineString has fewer than 2 distinct points".to_string(),
                )
            }
        },
        Geometry::MultiLineString { coordinates } => {
            let lines: Vec<Vec<[f64; 2]>> =
                coordinates.iter().filter_map(|l| repair_line(l)).collect();
            if lines.is_empty() {
                return RepairOutcome::Unsalvageable(
                    "MultiLineString has no usable parts".to_string(),
                );
            }
            Geometry::MultiLineString { coordinates: lines }
        }
        Geometry::Polygon { coordinates } => match repair_polygon(coordinates, mode) {
            Some(rings) => Geometry::Polygon { coordinates: rings },
            None => {
                return RepairOutcome::Unsalvageable(
                    "Polygon exterior ring is degenerate".to_string(),
                )
            }
        },
        Geometry::MultiPolygon { coordinates } => {
            let polygons: Vec<Vec<Vec<[f64; 2]>>> =
                coordinates.iter().filter_map(|p| repair_polygon(p, mode)).collect();
            if polygons.is_empty() {
                return RepairOutcome::Unsalvageable(
                    "MultiPolygon has no usable polygons".to_string(),
                );
            }
            Geometry::MultiPolygon { coordinates: polygons }
        }
    };

    if &repaired == geometry {
        RepairOutcome::Unchanged
    } else {
        RepairOutcome::Repaired(repaired)
    }
}

fn is_finite(c: &[f64; 2]) -> bool {
    c[0].is_finite() && c[1].is_finite()
}

/// Finite coordinates without consecutive duplicates
fn clean_coords(coords: &[[f64; 2]]) -> Vec<[f64; 2]> {
    let mut cleaned: Vec<[f64; 2]> = coords.iter().copied().filter(is_finite).collect();
    cleaned.dedup();
    cleaned
}

fn repair_line(coords: &[[f64; 2]]) -> Option<Vec<[f64; 2]>> {
    let line = clean_coords(coords);
    (line.len() >= 2).then_some(line)
}

fn repair_ring(ring: &[[f64; 2]]) -> Option<Vec<[f64; 2]>> {
    let mut ring = clean_coords(ring);
    if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied()) {
        if first != last {
            ring.push(first);
        }
    }
    (ring.len() >= 4).then_some(ring)
}

/// Repaired rings of a polygon, `None` when the exterior is unusable
fn repair_polygon(rings: &[Vec<[f64; 2]>], mode: ValidityMode) -> Option<Vec<Vec<[f64; 2]>>> {
    let (exterior, holes) = rings.split_first()?;
    let mut repaired = vec![repair_ring(exterior)?];
    repaired.extend(holes.iter().filter_map(|hole| repair_ring(hole)));

    if mode == ValidityMode::Strict {
        repaired = from_polygon(&to_polygon(&repaired).orient(Direction::Default));
    }
    Some(repaired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CurveVertex;
    use crate::validation::check_geometry;

    #[test]
    fn test_valid_geometry_is_unchanged() {
        let polygon = Geometry::polygon(vec![vec![
            [0.0, 0.0],
            [10.0, 0.0],
            [10.0, 10.0],
            [0.0, 10.0],
            [0.0, 0.0],
        ]]);
        assert_eq!(repair_geometry(&polygon, ValidityMode::Strict), RepairOutcome::Unchanged);
    }

    #[test]
    fn test_closes_ring_and_drops_duplicates() {
        let polygon = Geometry::polygon(vec![vec![
            [0.0, 0.0],
            [10.0, 0.0],
            [10.0, 0.0],
            [10.0, 10.0],
            [f64::NAN, 3.0],
            [0.0, 10.0],
        ]]);

        let RepairOutcome::Repaired(fixed) = repair_geometry(&polygon, ValidityMode::Lenient)
        else {
            panic!("expected a repaired polygon");
        };
        assert_eq!(
            fixed,
            Geometry::polygon(vec![vec![
                [0.0, 0.0],
                [10.0, 0.0],
                [10.0, 10.0],
                [0.0, 10.0],
                [0.0, 0.0],
            ]])
        );
        assert!(check_geometry(&fixed, ValidityMode::Strict).is_valid());
    }

    #[test]
    fn test_strict_mode_reorients_rings() {
        let polygon = Geometry::polygon(vec![
            vec![[0.0, 0.0], [0.0, 10.0], [10.0, 10.0], [10.0, 0.0], [0.0, 0.0]],
            vec![[2.0, 2.0], [4.0, 2.0], [4.0, 4.0], [2.0, 4.0], [2.0, 2.0]],
        ]);
        assert!(!check_geometry(&polygon, ValidityMode::Strict).is_valid());

        let RepairOutcome::Repaired(fixed) = repair_geometry(&polygon, ValidityMode::Strict) else {
            panic!("expected a repaired polygon");
        };
        assert!(check_geometry(&fixed, ValidityMode::Strict).is_valid());

        assert_eq!(repair_geometry(&polygon, ValidityMode::Lenient), RepairOutcome::Unchanged);
    }

    #[test]
    fn test_degenerate_hole_is_dropped() {
        let polygon = Geometry::polygon(vec![
            vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0], [0.0, 0.0]],
            vec![[2.0, 2.0], [2.0, 2.0]],
        ]);
        let RepairOutcome::Repaired(Geometry::Polygon { coordinates }) =
            repair_geometry(&polygon, ValidityMode::Lenient)
        else {
            panic!("expected a repaired polygon");
        };
        assert_eq!(coordinates.len(), 1);
    }

    #[test]
    fn test_unsalvageable_geometries() {
        let sliver = Geometry::polygon(vec![vec![[0.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]);
        assert!(matches!(
            repair_geometry(&sliver, ValidityMode::Strict),
            RepairOutcome::Unsalvageable(_)
        ));

        let line = Geometry::line_string(vec![[1.0, 1.0], [1.0, 1.0]]);
        assert!(matches!(
            repair_geometry(&line, ValidityMode::Strict),
            RepairOutcome::Unsalvageable(_)
        ));

        let point = Geometry::point(f64::INFINITY, 0.0);
        assert!(matches!(
            repair_geometry(&point, ValidityMode::Strict),
            RepairOutcome::Unsalvageable(_)
        ));
    }

    #[test]
    fn test_multipolygon_keeps_usable_parts() {
        let multi = Geometry::MultiPolygon {
            coordinates: vec![
                vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
                vec![vec![[5.0, 5.0], [5.0, 5.0]]],
            ],
        };
        let RepairOutcome::Repaired(Geometry::MultiPolygon { coordinates }) =
            repair_geometry(&multi, ValidityMode::Lenient)
        else {
            panic!("expected a repaired multipolygon");
        };
        assert_eq!(coordinates.len(), 1);
    }

    #[test]
    fn test_curves_are_left_alone() {
        let curve = Geometry::curve_polygon(vec![vec![
            CurveVertex::Vertex([0.0, 0.0]),
            CurveVertex::Vertex([0.0, 0.0]),
            CurveVertex::arc([0.0, 0.0], [5.0, 5.0]),
        ]]);
        assert_eq!(repair_geometry(&curve, ValidityMode::Strict), RepairOutcome::Unchanged);
    }
}
