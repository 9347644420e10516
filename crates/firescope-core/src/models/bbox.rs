//! Axis-aligned bounding boxes used to bound remote extracts.

use geo::BoundingRect;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use wkt::TryFromWkt;

use super::feature::FeatureSet;
use super::geometry::Geometry;
use crate::error::{FirescopeError, Result};

/// Axis-aligned rectangle in a single CRS
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,

    /// CRS EPSG code
    pub crs: u32,
}

impl BoundingBox {
    /// Create a box from its four extents. No ordering is enforced.
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64, crs: u32) -> Self {
        Self { xmin, ymin, xmax, ymax, crs }
    }

    /// Envelope of a geometry's stored coordinates
    pub fn envelope(geometry: &Geometry, crs: u32) -> Result<Self> {
        Self::from_points(geometry.vertices(), crs)
    }

    /// Envelope of every geometry in a feature set
    pub fn of_feature_set(set: &FeatureSet) -> Result<Self> {
        let points = set
            .features
            .iter()
            .filter_map(|f| f.geometry.as_ref())
            .flat_map(|g| g.vertices())
            .collect::<Vec<_>>();
        Self::from_points(points, set.crs).map_err(|_| FirescopeError::InvalidBoundingBox {
            reason: format!("feature set {} has no coordinates", set.name),
        })
    }

    /// Parse an envelope given as WKT, e.g. the output of `ST_AsText(ST_Envelope(geom))`
    pub fn from_wkt(wkt: &str, crs: u32) -> Result<Self> {
        let geometry = geo::Geometry::<f64>::try_from_wkt_str(wkt).map_err(|e| {
            FirescopeError::InvalidBoundingBox { reason: format!("failed to parse WKT: {}", e) }
        })?;
        let rect = geometry.bounding_rect().ok_or_else(|| FirescopeError::InvalidBoundingBox {
            reason: "WKT geometry is empty".to_string(),
        })?;
        Ok(Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y, crs))
    }

    fn from_points(points: Vec<[f64; 2]>, crs: u32) -> Result<Self> {
        let mut iter = points.into_iter().filter(|p| p[0].is_finite() && p[1].is_finite());
        let first = iter.next().ok_or_else(|| FirescopeError::InvalidBoundingBox {
            reason: "geometry has no finite coordinates".to_string(),
        })?;
        let bbox = iter.fold(Self::new(first[0], first[1], first[0], first[1], crs), |b, p| {
            Self::new(b.xmin.min(p[0]), b.ymin.min(p[1]), b.xmax.max(p[0]), b.ymax.max(p[1]), crs)
        });
        Ok(bbox)
    }

    /// True when `xmin < xmax` and `ymin < ymax`
    pub fn is_proper(&self) -> bool {
        self.xmin < self.xmax && self.ymin < self.ymax
    }

    /// True when `other` lies strictly inside this box on all four sides.
    ///
    /// Boxes touching or crossing the boundary are not contained.
    pub fn strictly_contains(&self, other: &BoundingBox) -> bool {
        other.xmin > self.xmin
            && other.xmax < self.xmax
            && other.ymin > self.ymin
            && other.ymax < self.ymax
    }

    /// Closed polygon ring tracing the box
    pub fn to_polygon(&self) -> Geometry {
        Geometry::polygon(vec![vec![
            [self.xmin, self.ymin],
            [self.xmax, self.ymin],
            [self.xmax, self.ymax],
            [self.xmin, self.ymax],
            [self.xmin, self.ymin],
        ]])
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}] (EPSG:{})",
            self.xmin, self.ymin, self.xmax, self.ymax, self.crs
        )
    }
}

/// Parses `xmin,ymin,xmax,ymax` in EPSG:4326
impl FromStr for BoundingBox {
    type Err = FirescopeError;

    fn from_str(s: &str) -> Result<Self> {
        let values = s
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| FirescopeError::InvalidBoundingBox {
                reason: format!("'{}' is not a list of numbers: {}", s, e),
            })?;

        match values.as_slice() {
            [xmin, ymin, xmax, ymax] => Ok(Self::new(*xmin, *ymin, *xmax, *ymax, 4326)),
            _ => Err(FirescopeError::InvalidBoundingBox {
                reason: format!("expected 4 values xmin,ymin,xmax,ymax, found {}", values.len()),
            }),
        }
    }
}
