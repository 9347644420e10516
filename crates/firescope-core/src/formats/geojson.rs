//! GeoJSON format reader implementation

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::error::{FirescopeError, Result};
use crate::formats::validation::FormatValidator;
use crate::formats::{name_from_path, FormatReader, FormatValidation};
use crate::models::{Feature, FeatureId, FeatureSet, Geometry};

/// GeoJSON format reader
pub struct GeoJsonReader;

#[async_trait]
impl FormatReader for GeoJsonReader {
    async fn read(&self, path: &Path) -> Result<FeatureSet> {
        let content = fs::read_to_string(path)?;
        parse_geojson(&content, name_from_path(path))
    }

    fn supported_extensions(&self) -> &[&str] {
        &["geojson"]
    }

    fn format_name(&self) -> &str {
        "GeoJSON"
    }

    async fn validate(&self, path: &Path) -> Result<FormatValidation> {
        let validation = FormatValidator::validate_file_exists(path);
        if !validation.is_valid() {
            return Ok(validation);
        }
        Ok(FormatValidator::merge_validations(vec![
            validation,
            FormatValidator::validate_json_structure(path),
        ]))
    }
}

/// Parse GeoJSON text into a feature set
pub(crate) fn parse_geojson(content: &str, name: String) -> Result<FeatureSet> {
    let geojson: geojson::GeoJson = content.parse().map_err(|e| FirescopeError::FormatError {
        format: "GeoJSON".to_string(),
        message: format!("Failed to parse GeoJSON: {}", e),
    })?;

    match geojson {
        geojson::GeoJson::FeatureCollection(fc) => {
            let crs = fc
                .foreign_members
                .as_ref()
                .and_then(|fm| fm.get("crs"))
                .and_then(extract_epsg_from_crs)
                .unwrap_or(4326);
            Ok(FeatureSet::new(name, crs, convert_features(&fc.features)))
        }
        geojson::GeoJson::Feature(feature) => {
            Ok(FeatureSet::new(name, 4326, convert_features(std::slice::from_ref(&feature))))
        }
        geojson::GeoJson::Geometry(geom) => {
            let geometry = convert_geometry(&geom.value).ok_or_else(|| {
                FirescopeError::FormatError {
                    format: "GeoJSON".to_string(),
                    message: "GeometryCollection is not supported".to_string(),
                }
            })?;
            Ok(FeatureSet::new(name, 4326, vec![Feature::new(FeatureId(1), geometry)]))
        }
    }
}

/// Convert features, keeping numeric ids when they are unique
fn convert_features(features: &[geojson::Feature]) -> Vec<Feature> {
    let numeric_ids: Vec<Option<u64>> = features
        .iter()
        .map(|f| match &f.id {
            Some(geojson::feature::Id::Number(n)) => n.as_u64(),
            _ => None,
        })
        .collect();
    let unique: HashSet<u64> = numeric_ids.iter().flatten().copied().collect();
    let keep_ids = unique.len() == features.len();

    features
        .iter()
        .enumerate()
        .map(|(idx, feature)| {
            let id = match (keep_ids, numeric_ids[idx]) {
                (true, Some(n)) => FeatureId(n),
                _ => FeatureId(idx as u64 + 1),
            };

            let mut properties: HashMap<String, serde_json::Value> = feature
                .properties
                .as_ref()
                .map(|props| props.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                .unwrap_or_default();
            if !keep_ids {
                if let Some(geojson::feature::Id::String(s)) = &feature.id {
                    properties.insert("fid".to_string(), serde_json::Value::String(s.clone()));
                }
            }

            let geometry = feature.geometry.as_ref().and_then(|g| {
                let converted = convert_geometry(&g.value);
                if converted.is_none() {
                    tracing::warn!(feature_id = %id, "Skipping unsupported GeometryCollection");
                }
                converted
            });

            Feature { id, geometry, properties }
        })
        .collect()
}

fn position(p: &[f64]) -> [f64; 2] {
    [p.first().copied().unwrap_or(f64::NAN), p.get(1).copied().unwrap_or(f64::NAN)]
}

fn positions(line: &[Vec<f64>]) -> Vec<[f64; 2]> {
    line.iter().map(|p| position(p)).collect()
}

fn rings(polygon: &[Vec<Vec<f64>>]) -> Vec<Vec<[f64; 2]>> {
    polygon.iter().map(|ring| positions(ring)).collect()
}

/// Convert a GeoJSON geometry value, dropping any Z values
fn convert_geometry(value: &geojson::Value) -> Option<Geometry> {
    match value {
        geojson::Value::Point(p) => Some(Geometry::Point { coordinates: position(p) }),
        geojson::Value::MultiPoint(points) => {
            Some(Geometry::MultiPoint { coordinates: positions(points) })
        }
        geojson::Value::LineString(line) => {
            Some(Geometry::LineString { coordinates: positions(line) })
        }
        geojson::Value::MultiLineString(lines) => {
            Some(Geometry::MultiLineString { coordinates: rings(lines) })
        }
        geojson::Value::Polygon(polygon) => Some(Geometry::Polygon { coordinates: rings(polygon) }),
        geojson::Value::MultiPolygon(polygons) => Some(Geometry::MultiPolygon {
            coordinates: polygons.iter().map(|p| rings(p)).collect(),
        }),
        geojson::Value::GeometryCollection(_) => None,
    }
}

/// Extract EPSG code from a legacy GeoJSON CRS object
fn extract_epsg_from_crs(crs: &serde_json::Value) -> Option<u32> {
    // "EPSG:3310" or "urn:ogc:def:crs:EPSG::3310"
    crs.get("properties")
        .and_then(|props| props.get("name"))
        .and_then(|name| name.as_str())
        .and_then(|name| name.split(':').last())
        .and_then(|code| code.parse().ok())
}
