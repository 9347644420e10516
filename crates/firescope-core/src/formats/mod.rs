//! Feature-set file formats
//!
//! Each format implements `FormatReader`; `FormatRegistry` picks a reader by
//! file extension. Only the native JSON format can be written back, since it
//! is the only one able to carry curve geometries.

use async_trait::async_trait;
use std::path::Path;

use crate::error::{FirescopeError, Result};
use crate::models::FeatureSet;

pub mod feature_set;
pub mod geojson;
pub mod shapefile;
pub mod validation;

pub use feature_set::{write_feature_set, FeatureSetReader};
pub use geojson::GeoJsonReader;
pub use shapefile::ShapefileFormatReader;

/// Format reader trait that all format implementations must implement
#[async_trait]
pub trait FormatReader: Send + Sync {
    /// Read a feature set from the given path
    async fn read(&self, path: &Path) -> Result<FeatureSet>;

    /// Get supported file extensions (e.g., ["shp"])
    fn supported_extensions(&self) -> &[&str];

    /// Get human-readable format name
    fn format_name(&self) -> &str;

    /// Validate file structure without a full read
    async fn validate(&self, _path: &Path) -> Result<FormatValidation> {
        Ok(FormatValidation::default())
    }
}

/// Result of format validation
#[derive(Debug, Clone, Default)]
pub struct FormatValidation {
    /// Validation errors that prevent reading
    pub errors: Vec<String>,

    /// Warnings that don't prevent reading but indicate potential issues
    pub warnings: Vec<String>,
}

impl FormatValidation {
    /// Check if validation passed (no errors)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Check if there are any warnings
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Central registry for format readers
pub struct FormatRegistry {
    readers: Vec<Box<dyn FormatReader>>,
}

impl FormatRegistry {
    /// Create a new empty format registry
    pub fn new() -> Self {
        Self { readers: Vec::new() }
    }

    /// Registry holding every built-in reader
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(FeatureSetReader));
        registry.register(Box::new(GeoJsonReader));
        registry.register(Box::new(ShapefileFormatReader));
        registry
    }

    /// Register a format reader
    pub fn register(&mut self, reader: Box<dyn FormatReader>) {
        self.readers.push(reader);
    }

    /// Detect format and return appropriate reader
    pub fn detect_format(&self, path: &Path) -> Result<&dyn FormatReader> {
        let extension = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            FirescopeError::UnsupportedFormat {
                extension: "none".to_string(),
                supported: self.supported_formats(),
            }
        })?;

        self.readers
            .iter()
            .find(|r| {
                r.supported_extensions().iter().any(|ext| ext.eq_ignore_ascii_case(extension))
            })
            .map(|r| r.as_ref())
            .ok_or_else(|| FirescopeError::UnsupportedFormat {
                extension: extension.to_string(),
                supported: self.supported_formats(),
            })
    }

    /// Validate then read a file with the matching reader
    pub async fn read(&self, path: &Path) -> Result<FeatureSet> {
        let reader = self.detect_format(path)?;
        let validation = reader.validate(path).await?;
        if !validation.is_valid() {
            return Err(FirescopeError::FormatError {
                format: reader.format_name().to_string(),
                message: validation.errors.join("; "),
            });
        }
        for warning in &validation.warnings {
            tracing::warn!(path = %path.display(), "{}", warning);
        }
        reader.read(path).await
    }

    /// Get list of all supported format extensions
    pub fn supported_formats(&self) -> Vec<String> {
        self.readers.iter().flat_map(|r| r.supported_extensions()).map(|s| s.to_string()).collect()
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Feature set name derived from a file name
pub(crate) fn name_from_path(path: &Path) -> String {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or("unnamed").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        let registry = FormatRegistry::with_defaults();

        let reader = registry.detect_format(Path::new("fhsz.geojson")).unwrap();
        assert_eq!(reader.format_name(), "GeoJSON");

        let reader = registry.detect_format(Path::new("FHSZLRA25.SHP")).unwrap();
        assert_eq!(reader.format_name(), "Shapefile");

        let reader = registry.detect_format(Path::new("fhsz_sra.json")).unwrap();
        assert_eq!(reader.format_name(), "FeatureSet");
    }

    #[test]
    fn test_unsupported_format() {
        let registry = FormatRegistry::with_defaults();
        let result = registry.detect_format(Path::new("FHSZSRA_23_3.gdb"));
        assert!(matches!(result, Err(FirescopeError::UnsupportedFormat { .. })));

        assert!(registry.detect_format(Path::new("no_extension")).is_err());
    }

    #[test]
    fn test_format_validation_with_warnings() {
        let validation =
            FormatValidation { errors: vec![], warnings: vec!["No .prj file".to_string()] };
        assert!(validation.is_valid());
        assert!(validation.has_warnings());
    }

    #[tokio::test]
    async fn test_registry_read_reports_validation_errors() {
        let registry = FormatRegistry::with_defaults();
        let result = registry.read(Path::new("/nonexistent/fhsz.geojson")).await;
        assert!(matches!(result, Err(FirescopeError::FormatError { .. })));
    }
}
