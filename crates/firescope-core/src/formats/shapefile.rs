//! Shapefile format reader implementation
//!
//! Reads the `.shp`/`.shx`/`.dbf` triple with pure Rust and takes the CRS from
//! the optional `.prj`. Z and M values are dropped. Shapefiles cannot store
//! arcs, so sets read from here never carry curves.

use async_trait::async_trait;
use shapefile::dbase::FieldValue as DbaseFieldValue;
use shapefile::{Reader as ShapefileReader, Shape};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{FirescopeError, Result};
use crate::formats::validation::FormatValidator;
use crate::formats::{name_from_path, FormatReader, FormatValidation};
use crate::models::{Feature, FeatureId, FeatureSet, Geometry};

/// Shapefile format reader
pub struct ShapefileFormatReader;

#[async_trait]
impl FormatReader for ShapefileFormatReader {
    async fn read(&self, path: &Path) -> Result<FeatureSet> {
        let base = shapefile_base(path)?;

        let mut reader = ShapefileReader::from_path(path).map_err(|e| shp_error(e.to_string()))?;
        let crs = read_prj_epsg(&base)?.unwrap_or_else(|| {
            tracing::warn!(path = %path.display(), "No EPSG code found in .prj, assuming EPSG:4326");
            4326
        });

        let mut features = Vec::new();
        for (idx, result) in reader.iter_shapes_and_records().enumerate() {
            let (shape, record) =
                result.map_err(|e| shp_error(format!("Failed to read feature: {}", e)))?;

            let properties: HashMap<String, serde_json::Value> = record
                .into_iter()
                .map(|(name, value)| (name, convert_dbase_value(&value)))
                .collect();

            features.push(Feature {
                id: FeatureId(idx as u64 + 1),
                geometry: convert_shape(&shape)?,
                properties,
            });
        }

        Ok(FeatureSet::new(name_from_path(path), crs, features))
    }

    fn supported_extensions(&self) -> &[&str] {
        &["shp"]
    }

    fn format_name(&self) -> &str {
        "Shapefile"
    }

    async fn validate(&self, path: &Path) -> Result<FormatValidation> {
        let validation = FormatValidator::validate_file_exists(path);
        if !validation.is_valid() {
            return Ok(validation);
        }

        let base = match shapefile_base(path) {
            Ok(b) => b,
            Err(e) => {
                let mut validation = validation;
                validation.errors.push(e.to_string());
                return Ok(validation);
            }
        };

        Ok(FormatValidator::merge_validations(vec![
            validation,
            FormatValidator::validate_component_files(&base, &["shp", "shx", "dbf"], &["prj"]),
        ]))
    }
}

fn shp_error(message: String) -> FirescopeError {
    FirescopeError::FormatError { format: "Shapefile".to_string(), message }
}

/// Path without the `.shp` extension
fn shapefile_base(path: &Path) -> Result<PathBuf> {
    let is_shp = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("shp"))
        .unwrap_or(false);
    if !is_shp {
        return Err(FirescopeError::InvalidPath {
            path: path.to_path_buf(),
            reason: "Not a Shapefile (.shp)".to_string(),
        });
    }
    Ok(path.with_extension(""))
}

/// EPSG code from the `.prj` next to the shapefile, if any
fn read_prj_epsg(base: &Path) -> Result<Option<u32>> {
    let prj_path = base.with_extension("prj");
    if !prj_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&prj_path)
        .map_err(|e| shp_error(format!("Failed to read .prj file: {}", e)))?;
    Ok(parse_epsg_from_prj(&content))
}

/// Find `AUTHORITY["EPSG","3310"]` (last one wins, i.e. the outermost CRS) or `EPSG:3310`
fn parse_epsg_from_prj(prj: &str) -> Option<u32> {
    const AUTHORITY: &str = "AUTHORITY[\"EPSG\",\"";
    if let Some(start) = prj.rfind(AUTHORITY) {
        let code = &prj[start + AUTHORITY.len()..];
        if let Some(end) = code.find('"') {
            if let Ok(epsg) = code[..end].parse() {
                return Some(epsg);
            }
        }
    }

    prj.find("EPSG:").and_then(|start| {
        prj[start + 5..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect::<String>()
            .parse()
            .ok()
    })
}

fn lines_geometry(mut parts: Vec<Vec<[f64; 2]>>) -> Geometry {
    if parts.len() == 1 {
        Geometry::LineString { coordinates: parts.remove(0) }
    } else {
        Geometry::MultiLineString { coordinates: parts }
    }
}

/// Convert a shape into a 2D geometry, `None` for null shapes
fn convert_shape(shape: &Shape) -> Result<Option<Geometry>> {
    let geometry = match shape {
        Shape::NullShape => return Ok(None),
        Shape::Point(p) => Geometry::point(p.x, p.y),
        Shape::PointM(p) => Geometry::point(p.x, p.y),
        Shape::PointZ(p) => Geometry::point(p.x, p.y),
        Shape::Polyline(line) => lines_geometry(
            line.parts().iter().map(|part| part.iter().map(|p| [p.x, p.y]).collect()).collect(),
        ),
        Shape::PolylineM(line) => lines_geometry(
            line.parts().iter().map(|part| part.iter().map(|p| [p.x, p.y]).collect()).collect(),
        ),
        Shape::PolylineZ(line) => lines_geometry(
            line.parts().iter().map(|part| part.iter().map(|p| [p.x, p.y]).collect()).collect(),
        ),
        Shape::Polygon(polygon) => Geometry::polygon(
            polygon
                .rings()
                .iter()
                .map(|ring| ring.points().iter().map(|p| [p.x, p.y]).collect())
                .collect(),
        ),
        Shape::PolygonM(polygon) => Geometry::polygon(
            polygon
                .rings()
                .iter()
                .map(|ring| ring.points().iter().map(|p| [p.x, p.y]).collect())
                .collect(),
        ),
        Shape::PolygonZ(polygon) => Geometry::polygon(
            polygon
                .rings()
                .iter()
                .map(|ring| ring.points().iter().map(|p| [p.x, p.y]).collect())
                .collect(),
        ),
        Shape::Multipoint(mp) => {
            Geometry::MultiPoint { coordinates: mp.points().iter().map(|p| [p.x, p.y]).collect() }
        }
        Shape::MultipointM(mp) => {
            Geometry::MultiPoint { coordinates: mp.points().iter().map(|p| [p.x, p.y]).collect() }
        }
        Shape::MultipointZ(mp) => {
            Geometry::MultiPoint { coordinates: mp.points().iter().map(|p| [p.x, p.y]).collect() }
        }
        Shape::Multipatch(_) => {
            return Err(shp_error("Multipatch geometry type is not supported".to_string()))
        }
    };
    Ok(Some(geometry))
}

fn number(value: f64) -> serde_json::Value {
    serde_json::Number::from_f64(value)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

/// Convert dBase field value to JSON value
fn convert_dbase_value(value: &DbaseFieldValue) -> serde_json::Value {
    match value {
        DbaseFieldValue::Character(Some(s)) => serde_json::Value::String(s.trim().to_string()),
        DbaseFieldValue::Numeric(Some(n)) => number(*n),
        DbaseFieldValue::Logical(Some(b)) => serde_json::Value::Bool(*b),
        DbaseFieldValue::Float(Some(f)) => number(*f as f64),
        DbaseFieldValue::Integer(i) => serde_json::Value::Number((*i).into()),
        DbaseFieldValue::Double(d) => number(*d),
        DbaseFieldValue::Currency(c) => number(*c),
        DbaseFieldValue::Memo(s) => serde_json::Value::String(s.clone()),
        DbaseFieldValue::Date(Some(date)) => serde_json::Value::String(format!(
            "{:04}-{:02}-{:02}",
            date.year(),
            date.month(),
            date.day()
        )),
        _ => serde_json::Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_validation_missing_file() {
        let validation =
            ShapefileFormatReader.validate(Path::new("/nonexistent/FHSZLRA.shp")).await.unwrap();
        assert!(!validation.is_valid());
    }

    #[tokio::test]
    async fn test_validation_missing_components() {
        let dir = tempfile::tempdir().unwrap();
        let shp = dir.path().join("FHSZLRA25.shp");
        fs::write(&shp, b"").unwrap();

        let validation = ShapefileFormatReader.validate(&shp).await.unwrap();
        assert!(validation.errors.iter().any(|e| e.contains(".shx")));
        assert!(validation.errors.iter().any(|e| e.contains(".dbf")));
        assert!(validation.has_warnings());
    }

    #[test]
    fn test_parse_epsg_from_prj() {
        let albers = r#"PROJCS["NAD83 / California Albers",GEOGCS["NAD83",AUTHORITY["EPSG","4269"]],AUTHORITY["EPSG","3310"]]"#;
        assert_eq!(parse_epsg_from_prj(albers), Some(3310));
        assert_eq!(parse_epsg_from_prj("EPSG:3857"), Some(3857));
        assert_eq!(parse_epsg_from_prj(r#"PROJCS["NAD_1983_California_Teale_Albers"]"#), None);
    }

    #[test]
    fn test_shapefile_base_requires_shp() {
        assert!(shapefile_base(Path::new("a.dbf")).is_err());
        assert_eq!(shapefile_base(Path::new("dir/a.SHP")).unwrap(), PathBuf::from("dir/a"));
    }
}
