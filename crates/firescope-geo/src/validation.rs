use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::Winding;
use serde::{Deserialize, Serialize};

use crate::models::{to_line_string, Feature, FeatureId, Geometry, ValidityMode};

/// Kind of problem found in a geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueKind {
    NullGeometry,
    EmptyGeometry,
    NonFiniteCoordinate,
    TooFewPoints,
    UnclosedRing,
    RepeatedVertex,
    SelfIntersection,
    WrongOrientation,
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            IssueKind::NullGeometry => "null geometry",
            IssueKind::EmptyGeometry => "empty geometry",
            IssueKind::NonFiniteCoordinate => "non-finite coordinate",
            IssueKind::TooFewPoints => "too few points",
            IssueKind::UnclosedRing => "unclosed ring",
            IssueKind::RepeatedVertex => "repeated vertex",
            IssueKind::SelfIntersection => "self-intersection",
            IssueKind::WrongOrientation => "wrong orientation",
        };
        write!(f, "{}", label)
    }
}

/// Validation result with details
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
}

/// Validation error with location details
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub kind: IssueKind,
    pub location: String,
    pub reason: String,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error to the result
    pub fn add_error(&mut self, kind: IssueKind, location: impl Into<String>, reason: String) {
        self.errors.push(ValidationError { kind, location: location.into(), reason });
    }

    /// Append errors of a nested part, prefixing their location
    fn extend_nested(&mut self, prefix: &str, nested: ValidationResult) {
        for error in nested.errors {
            self.errors.push(ValidationError {
                location: format!("{}.{}", prefix, error.location),
                ..error
            });
        }
    }
}

/// Problem found on one feature of a feature set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryIssue {
    pub feature_id: FeatureId,
    pub kind: IssueKind,
    pub location: String,
    pub reason: String,
}

/// Check one feature, reporting a null geometry as an issue
pub fn check_feature(feature: &Feature, mode: ValidityMode) -> Vec<GeometryIssue> {
    let Some(geometry) = &feature.geometry else {
        return vec![GeometryIssue {
            feature_id: feature.id,
            kind: IssueKind::NullGeometry,
            location: "geometry".to_string(),
            reason: "Feature has no geometry".to_string(),
        }];
    };

    check_geometry(geometry, mode)
        .errors
        .into_iter()
        .map(|e| GeometryIssue {
            feature_id: feature.id,
            kind: e.kind,
            location: e.location,
            reason: e.reason,
        })
        .collect()
}

/// Check a geometry
///
/// Lenient mode runs the structural checks only. Strict mode adds ring
/// self-intersection and orientation (exterior counter-clockwise, holes
/// clockwise) for rings that pass the structural checks. Curve geometries are
/// checked for finite coordinates only.
pub fn check_geometry(geometry: &Geometry, mode: ValidityMode) -> ValidationResult {
    let mut result = ValidationResult::default();
    if geometry.is_empty() {
        result.add_error(
            IssueKind::EmptyGeometry,
            geometry.geometry_type().to_string(),
            "Geometry has no coordinates".to_string(),
        );
        return result;
    }

    match geometry {
        Geometry::Point { coordinates } => check_finite(&mut result, "Point", &[*coordinates]),
        Geometry::MultiPoint { coordinates } => check_finite(&mut result, "MultiPoint", coordinates),
        Geometry::LineString { coordinates } => {
            result = check_linestring(coordinates);
        }
        Geometry::MultiLineString { coordinates } => {
            for (i, line) in coordinates.iter().enumerate() {
                result.extend_nested(&format!("MultiLineString[{}]", i), check_linestring(line));
            }
        }
        Geometry::Polygon { coordinates } => {
            result = check_polygon(coordinates, mode);
        }
        Geometry::MultiPolygon { coordinates } => {
            for (i, polygon) in coordinates.iter().enumerate() {
                result.extend_nested(&format!("MultiPolygon[{}]", i), check_polygon(polygon, mode));
            }
        }
        Geometry::CurveLineString { .. } | Geometry::CurvePolygon { .. } => {
            check_finite(&mut result, &geometry.geometry_type().to_string(), &geometry.vertices())
        }
    }

    result
}

fn is_finite(c: &[f64; 2]) -> bool {
    c[0].is_finite() && c[1].is_finite()
}

fn check_finite(result: &mut ValidationResult, location: &str, coords: &[[f64; 2]]) {
    for (i, c) in coords.iter().enumerate() {
        if !is_finite(c) {
            result.add_error(
                IssueKind::NonFiniteCoordinate,
                format!("{}[{}]", location, i),
                format!("Coordinates must be finite, found ({}, {})", c[0], c[1]),
            );
        }
    }
}

fn check_repeated(result: &mut ValidationResult, location: &str, coords: &[[f64; 2]]) {
    if let Some(i) = coords.windows(2).position(|w| w[0] == w[1]) {
        result.add_error(
            IssueKind::RepeatedVertex,
            format!("{}[{}]", location, i + 1),
            "Consecutive vertices are identical".to_string(),
        );
    }
}

fn check_linestring(coords: &[[f64; 2]]) -> ValidationResult {
    let mut result = ValidationResult::default();

    if coords.len() < 2 {
        result.add_error(
            IssueKind::TooFewPoints,
            "LineString",
            format!("LineString must have at least 2 points, found {}", coords.len()),
        );
        return result;
    }

    check_finite(&mut result, "LineString", coords);
    check_repeated(&mut result, "LineString", coords);
    result
}

fn check_polygon(rings: &[Vec<[f64; 2]>], mode: ValidityMode) -> ValidationResult {
    let mut result = ValidationResult::default();

    if rings.is_empty() {
        result.add_error(
            IssueKind::EmptyGeometry,
            "Polygon",
            "Polygon has no exterior ring".to_string(),
        );
        return result;
    }

    for (i, ring) in rings.iter().enumerate() {
        let (location, exterior) = if i == 0 {
            ("Polygon exterior".to_string(), true)
        } else {
            (format!("Polygon interior[{}]", i - 1), false)
        };
        check_ring(&mut result, &location, ring, exterior, mode);
    }

    result
}

fn check_ring(
    result: &mut ValidationResult,
    location: &str,
    ring: &[[f64; 2]],
    exterior: bool,
    mode: ValidityMode,
) {
    let before = result.errors.len();

    if ring.len() < 4 {
        result.add_error(
            IssueKind::TooFewPoints,
            location,
            format!("Ring must have at least 4 points, found {}", ring.len()),
        );
    }
    if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
        if first != last {
            result.add_error(
                IssueKind::UnclosedRing,
                location,
                "Ring must be closed (first point == last point)".to_string(),
            );
        }
    }
    check_finite(result, location, ring);
    check_repeated(result, location, ring);

    // Topology checks need a structurally sound ring
    if mode == ValidityMode::Lenient || result.errors.len() > before {
        return;
    }

    if ring_self_intersects(ring) {
        result.add_error(
            IssueKind::SelfIntersection,
            location,
            "Ring intersects itself".to_string(),
        );
        return;
    }

    let line = to_line_string(ring);
    let oriented = if exterior { line.is_ccw() } else { line.is_cw() };
    if !oriented {
        result.add_error(
            IssueKind::WrongOrientation,
            location,
            if exterior {
                "Exterior ring must be counter-clockwise".to_string()
            } else {
                "Interior ring must be clockwise".to_string()
            },
        );
    }
}

/// True when two non-adjacent edges of a closed ring touch, or adjacent
/// edges overlap
pub(crate) fn ring_self_intersects(ring: &[[f64; 2]]) -> bool {
    let edges: Vec<geo::Line> = ring
        .windows(2)
        .filter(|w| w[0] != w[1])
        .map(|w| geo::Line::new(geo::coord! { x: w[0][0], y: w[0][1] }, geo::coord! { x: w[1][0], y: w[1][1] }))
        .collect();
    let n = edges.len();

    for i in 0..n {
        for j in (i + 1)..n {
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            match line_intersection(edges[i], edges[j]) {
                None => {}
                Some(LineIntersection::Collinear { .. }) => return true,
                Some(LineIntersection::SinglePoint { .. }) if !adjacent => return true,
                Some(LineIntersection::SinglePoint { .. }) => {}
            }
        }
    }
    false
}
