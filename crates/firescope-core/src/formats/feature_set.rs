//! Native feature-set JSON
//!
//! ```json
//! {"name": "fhsz_sra", "crs": 3310, "features": [{"id": 1, "geometry": {...}, "properties": {}}]}
//! ```
//!
//! Geometries use the canonical serialization, so curve rings survive a
//! read/write cycle. A `.json` file holding a GeoJSON `FeatureCollection` is
//! read through the GeoJSON path instead.

use async_trait::async_trait;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{FirescopeError, Result};
use crate::formats::geojson::parse_geojson;
use crate::formats::validation::FormatValidator;
use crate::formats::{name_from_path, FormatReader, FormatValidation};
use crate::models::{Feature, FeatureSet};

/// Reader for native feature-set files
pub struct FeatureSetReader;

#[derive(Deserialize)]
struct FeatureSetFile {
    name: Option<String>,
    crs: Option<u32>,
    features: Vec<Feature>,
}

#[async_trait]
impl FormatReader for FeatureSetReader {
    async fn read(&self, path: &Path) -> Result<FeatureSet> {
        let content = fs::read_to_string(path)?;
        let value: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| FirescopeError::FormatError {
                format: "FeatureSet".to_string(),
                message: format!("Invalid JSON: {}", e),
            })?;

        if matches!(
            value.get("type").and_then(|t| t.as_str()),
            Some("FeatureCollection") | Some("Feature")
        ) {
            return parse_geojson(&content, name_from_path(path));
        }

        let file: FeatureSetFile =
            serde_json::from_value(value).map_err(|e| FirescopeError::FormatError {
                format: "FeatureSet".to_string(),
                message: format!("Failed to parse feature set: {}", e),
            })?;

        Ok(FeatureSet::new(
            file.name.unwrap_or_else(|| name_from_path(path)),
            file.crs.unwrap_or(4326),
            file.features,
        ))
    }

    fn supported_extensions(&self) -> &[&str] {
        &["json"]
    }

    fn format_name(&self) -> &str {
        "FeatureSet"
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

/// Write a feature set as pretty-printed native JSON
pub fn write_feature_set(path: &Path, set: &FeatureSet) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(set)?;
    fs::write(path, json)?;
    Ok(())
}
