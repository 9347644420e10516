//! Curve detection and arc densification
//!
//! A curve-capable geometry stores circular arcs as three points: the
//! previous vertex, an interior point on the arc and the arc end. Densifying
//! replaces every arc by a chain of straight segments on the circle through
//! those three points.

use std::collections::BTreeSet;
use std::f64::consts::PI;

use firescope_core::error::{FirescopeError, Result};

use crate::models::{CurveVertex, DensifyTolerance, Feature, FeatureId, Geometry};

/// Upper bound on the segments generated for a single arc
pub const MAX_ARC_SEGMENTS: usize = 100_000;

/// Ids of features whose serialized geometry carries the curve marker
///
/// Logs a warning naming the set and listing the ids when any are found.
pub fn detect_curves(set_name: &str, features: &[Feature]) -> BTreeSet<FeatureId> {
    let curved: BTreeSet<FeatureId> = features
        .iter()
        .filter(|f| f.geometry.as_ref().is_some_and(Geometry::has_curve_marker))
        .map(|f| f.id)
        .collect();

    if !curved.is_empty() {
        let ids: Vec<String> = curved.iter().map(ToString::to_string).collect();
        tracing::warn!(
            feature_set = set_name,
            curves = curved.len(),
            "{} has {} curves: {}",
            set_name,
            curved.len(),
            ids.join(", ")
        );
    }

    curved
}

/// Replace every arc of a geometry with straight segments
///
/// Linear geometries are returned unchanged. Curve polygons become polygons
/// and curve lines become line strings (or multi line strings when they have
/// several paths).
pub fn densify_geometry(geometry: &Geometry, tolerance: &DensifyTolerance) -> Result<Geometry> {
    match geometry {
        Geometry::CurvePolygon { curve_rings } => {
            check_tolerance(tolerance)?;
            let rings = curve_rings
                .iter()
                .map(|ring| linearize_path(ring, tolerance))
                .collect::<Result<Vec<_>>>()?;
            Ok(Geometry::Polygon { coordinates: rings })
        }
        Geometry::CurveLineString { curve_paths } => {
            check_tolerance(tolerance)?;
            let mut paths = curve_paths
                .iter()
                .map(|path| linearize_path(path, tolerance))
                .collect::<Result<Vec<_>>>()?;
            if paths.len() == 1 {
                Ok(Geometry::LineString { coordinates: paths.remove(0) })
            } else {
                Ok(Geometry::MultiLineString { coordinates: paths })
            }
        }
        linear => Ok(linear.clone()),
    }
}

fn check_tolerance(tolerance: &DensifyTolerance) -> Result<()> {
    for (key, value) in [("max_angle", tolerance.max_angle), ("max_deviation", tolerance.max_deviation)]
    {
        if !(value.is_finite() && value > 0.0) {
            return Err(FirescopeError::InvalidTolerance { key: key.to_string(), value });
        }
    }
    Ok(())
}

fn degenerate(reason: impl Into<String>) -> FirescopeError {
    FirescopeError::InvalidGeometry { reason: reason.into() }
}

fn is_finite(p: &[f64; 2]) -> bool {
    p[0].is_finite() && p[1].is_finite()
}

/// Linear coordinates of one curve path or ring
fn linearize_path(path: &[CurveVertex], tolerance: &DensifyTolerance) -> Result<Vec<[f64; 2]>> {
    let Some(first) = path.first() else {
        return Ok(Vec::new());
    };
    let CurveVertex::Vertex(start) = first else {
        return Err(degenerate("Path starts with an arc instead of a vertex"));
    };

    let mut coords = vec![*start];
    let mut current = *start;
    for vertex in &path[1..] {
        match vertex {
            CurveVertex::Vertex(p) => coords.push(*p),
            CurveVertex::Arc { c: [end, interior] } => {
                coords.extend(arc_points(current, *interior, *end, tolerance)?);
            }
        }
        current = vertex.end();
    }

    for c in &coords {
        if !is_finite(c) {
            return Err(degenerate(format!("Non-finite coordinate ({}, {})", c[0], c[1])));
        }
    }
    Ok(coords)
}

/// Points approximating the arc from `start` through `interior` to `end`
///
/// `start` is excluded and `end` is always the last point, so consecutive
/// arcs chain without duplicate vertices. No segment subtends more than
/// `max_angle` at the arc center and no chord is further than
/// `max_deviation` from the arc. Collinear points give a single straight
/// segment. When `start == end` the arc is a full circle with `interior`
/// diametrically opposite the start, traversed counter-clockwise.
pub fn arc_points(
    start: [f64; 2],
    interior: [f64; 2],
    end: [f64; 2],
    tolerance: &DensifyTolerance,
) -> Result<Vec<[f64; 2]>> {
    if !(is_finite(&start) && is_finite(&interior) && is_finite(&end)) {
        return Err(degenerate("Arc has non-finite control points"));
    }

    let (center, sweep) = if start == end {
        let center = [(start[0] + interior[0]) / 2.0, (start[1] + interior[1]) / 2.0];
        (center, 2.0 * PI)
    } else {
        match circle_through(start, interior, end) {
            Some(center) => (center, sweep_angle(start, interior, end, center)),
            None => return Ok(vec![end]),
        }
    };

    let radius = (start[0] - center[0]).hypot(start[1] - center[1]);
    if !(radius.is_finite() && radius > 0.0) {
        return Err(degenerate("Arc has zero radius"));
    }

    let sagitta_step = 2.0 * (1.0 - tolerance.max_deviation / radius).clamp(-1.0, 1.0).acos();
    let step = tolerance.max_angle.min(sagitta_step);
    if !(step.is_finite() && step > 0.0) {
        return Err(degenerate(format!("Tolerance too small for arc radius {}", radius)));
    }

    let segments = (sweep.abs() / step).ceil().max(1.0);
    if segments > MAX_ARC_SEGMENTS as f64 {
        return Err(degenerate(format!(
            "Arc would need {} segments, limit is {}",
            segments, MAX_ARC_SEGMENTS
        )));
    }
    let segments = segments as usize;

    let start_angle = (start[1] - center[1]).atan2(start[0] - center[0]);
    let mut points: Vec<[f64; 2]> = (1..segments)
        .map(|k| {
            let angle = start_angle + sweep * k as f64 / segments as f64;
            [center[0] + radius * angle.cos(), center[1] + radius * angle.sin()]
        })
        .collect();
    points.push(end);
    Ok(points)
}

/// Center of the circle through three points, `None` when they are collinear
fn circle_through(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> Option<[f64; 2]> {
    // Work relative to `a` to keep the determinant well conditioned
    let (bx, by) = (b[0] - a[0], b[1] - a[1]);
    let (cx, cy) = (c[0] - a[0], c[1] - a[1]);
    let d = 2.0 * (bx * cy - by * cx);

    let scale = (bx * bx + by * by).max(cx * cx + cy * cy);
    if d.abs() <= f64::EPSILON * scale * 4.0 {
        return None;
    }

    let b2 = bx * bx + by * by;
    let c2 = cx * cx + cy * cy;
    let ux = (cy * b2 - by * c2) / d;
    let uy = (bx * c2 - cx * b2) / d;
    Some([a[0] + ux, a[1] + uy])
}

/// Signed sweep from `start` to `end` that passes through `interior`
fn sweep_angle(start: [f64; 2], interior: [f64; 2], end: [f64; 2], center: [f64; 2]) -> f64 {
    let angle = |p: [f64; 2]| (p[1] - center[1]).atan2(p[0] - center[0]);
    let ccw = |from: f64, to: f64| (to - from).rem_euclid(2.0 * PI);

    let cross = (interior[0] - start[0]) * (end[1] - start[1])
        - (interior[1] - start[1]) * (end[0] - start[0]);
    let (a0, a2) = (angle(start), angle(end));
    if cross > 0.0 {
        // start, interior, end turn counter-clockwise
        ccw(a0, a2)
    } else {
        -ccw(a2, a0)
    }
}
