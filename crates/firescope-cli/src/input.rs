//! Resolving a command's feature-set input into a stored table

use crate::cli::{InputArgs, StorageBackend};
use crate::errors;
use crate::storage::Storage;
use anyhow::{Context, Result};
use firescope_core::formats::FormatRegistry;
use firescope_core::models::{FeatureSet, TableName};
use std::path::{Path, PathBuf};

/// PostgreSQL identifier length limit
const MAX_NAME_LEN: usize = 63;

/// A feature set ready to be worked on through the storage port
pub struct ResolvedInput {
    pub table: TableName,
    /// File the set was loaded from, `None` for an existing table
    pub path: Option<PathBuf>,
    pub crs: Option<u32>,
}

/// Backend that serves this input
///
/// File inputs are always worked on in memory, so they never touch database
/// tables. Only `--table` inputs use the requested backend.
pub fn backend_for(input: &InputArgs, requested: StorageBackend) -> StorageBackend {
    if input.path.is_some() {
        if requested == StorageBackend::Postgres {
            tracing::debug!("File input is loaded into memory, not into PostgreSQL");
        }
        return StorageBackend::Memory;
    }
    requested
}

/// Load the file into storage, or point at an existing table
pub async fn resolve(input: &InputArgs, storage: &Storage) -> Result<ResolvedInput> {
    match (&input.path, &input.table) {
        (Some(path), _) => {
            let mut set = read_feature_set(path).await?;
            set.name = table_name_for(&set.name);

            let table = storage
                .features
                .create_feature_set(&set)
                .await
                .with_context(|| format!("Failed to store feature set {}", set.name))?;
            tracing::info!(
                path = %path.display(),
                feature_set = %table,
                features = set.len(),
                "Feature set loaded"
            );

            Ok(ResolvedInput { table, path: Some(path.clone()), crs: Some(set.crs) })
        }
        (None, Some(table)) => {
            if storage.is_memory() {
                return Err(errors::table_needs_postgres(table).into());
            }
            Ok(ResolvedInput { table: TableName::parse(table)?, path: None, crs: None })
        }
        (None, None) => anyhow::bail!("Either a feature-set file or --table is required"),
    }
}

/// Read a feature-set file with the reader matching its extension
pub async fn read_feature_set(path: &Path) -> Result<FeatureSet> {
    if !path.exists() {
        return Err(errors::input_not_found(&path.display().to_string()).into());
    }
    let registry = FormatRegistry::with_defaults();
    registry
        .read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// Valid table name derived from a free-form set name
pub fn table_name_for(raw: &str) -> String {
    let mut name: String = raw
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();

    if name.is_empty() {
        name.push_str("feature_set");
    } else if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name.truncate(MAX_NAME_LEN);
    name
}

/// Default location of a repaired copy: `<stem>.repaired.json` beside the input
pub fn repaired_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("feature_set");
    input.with_file_name(format!("{}.repaired.json", stem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_for() {
        assert_eq!(table_name_for("fhsz_sra"), "fhsz_sra");
        assert_eq!(table_name_for("FHSZ SRA-2024"), "fhsz_sra_2024");
        assert_eq!(table_name_for("2024 zones"), "_2024_zones");
        assert_eq!(table_name_for("  "), "feature_set");
        assert_eq!(table_name_for(&"x".repeat(80)).len(), MAX_NAME_LEN);
        assert!(TableName::parse(&table_name_for("Région Sud")).is_ok());
    }

    #[test]
    fn test_file_input_stays_in_memory() {
        let file = InputArgs { path: Some(PathBuf::from("fhsz_sra.json")), table: None };
        assert_eq!(backend_for(&file, StorageBackend::Postgres), StorageBackend::Memory);
        assert_eq!(backend_for(&file, StorageBackend::Memory), StorageBackend::Memory);

        let table = InputArgs { path: None, table: Some("fhsz_sra".to_string()) };
        assert_eq!(backend_for(&table, StorageBackend::Postgres), StorageBackend::Postgres);
    }

    #[test]
    fn test_repaired_path() {
        assert_eq!(
            repaired_path(Path::new("data/fhsz_lra.geojson")),
            PathBuf::from("data/fhsz_lra.repaired.json")
        );
    }
}
