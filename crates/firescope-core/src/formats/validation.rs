use crate::formats::FormatValidation;
use std::path::Path;

pub struct FormatValidator;

impl FormatValidator {
    /// Validate that a file exists and is readable
    pub fn validate_file_exists(path: &Path) -> FormatValidation {
        let mut validation = FormatValidation::default();

        if !path.exists() {
            validation.errors.push(format!("File not found: {}", path.display()));
            return validation;
        }
        if let Err(e) = std::fs::metadata(path) {
            validation.errors.push(format!("Cannot access file: {}", e));
        }

        validation
    }

    /// Validate that required component files exist for multi-file formats
    pub fn validate_component_files(
        base_path: &Path,
        required_extensions: &[&str],
        optional_extensions: &[&str],
    ) -> FormatValidation {
        let mut validation = FormatValidation::default();

        for ext in required_extensions {
            let component_path = base_path.with_extension(ext);
            if !component_path.exists() {
                validation
                    .errors
                    .push(format!("Missing required file: {}", component_path.display()));
            }
        }

        for ext in optional_extensions {
            let component_path = base_path.with_extension(ext);
            if !component_path.exists() {
                validation
                    .warnings
                    .push(format!("Optional file not found: {}", component_path.display()));
            }
        }

        validation
    }

    /// Validate that a file parses as JSON
    pub fn validate_json_structure(path: &Path) -> FormatValidation {
        let mut validation = FormatValidation::default();

        match std::fs::read_to_string(path) {
            Ok(content) => {
                if let Err(e) = serde_json::from_str::<serde_json::Value>(&content) {
                    validation.errors.push(format!("Invalid JSON: {}", e));
                }
            }
            Err(e) => validation.errors.push(format!("Cannot read file: {}", e)),
        }

        validation
    }

    /// Merge multiple validation results
    pub fn merge_validations(validations: Vec<FormatValidation>) -> FormatValidation {
        let mut merged = FormatValidation::default();
        for validation in validations {
            merged.errors.extend(validation.errors);
            merged.warnings.extend(validation.warnings);
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_file() {
        let validation = FormatValidator::validate_file_exists(Path::new("/nonexistent/a.json"));
        assert!(!validation.is_valid());
    }

    #[test]
    fn test_component_files() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("fhsz");
        fs::write(base.with_extension("shp"), b"").unwrap();

        let validation =
            FormatValidator::validate_component_files(&base, &["shp", "shx", "dbf"], &["prj"]);
        assert_eq!(validation.errors.len(), 2);
        assert_eq!(validation.warnings.len(), 1);
    }

    #[test]
    fn test_json_structure() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.json");
        let bad = dir.path().join("bad.json");
        fs::write(&good, "{\"a\": 1}").unwrap();
        fs::write(&bad, "{\"a\": ").unwrap();

        assert!(FormatValidator::validate_json_structure(&good).is_valid());
        assert!(!FormatValidator::validate_json_structure(&bad).is_valid());
    }
}
