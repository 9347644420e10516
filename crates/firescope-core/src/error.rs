//! Error types for firescope

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FirescopeError {
    // Feature set errors
    #[error("Feature set not found: {name}")]
    FeatureSetNotFound { name: String },

    #[error("Feature {id} not found in {set}")]
    FeatureNotFound { set: String, id: u64 },

    #[error("Duplicate feature id {id} in {set}")]
    DuplicateFeature { set: String, id: u64 },

    #[error("Invalid geometry: {reason}")]
    InvalidGeometry { reason: String },

    #[error("Invalid densify tolerance {key}={value}: must be finite and greater than 0")]
    InvalidTolerance { key: String, value: f64 },

    // Table errors
    #[error("Table not found: {name}")]
    TableNotFound { name: String },

    #[error("Invalid identifier '{value}': {reason}")]
    InvalidIdentifier { value: String, reason: String },

    #[error("Remote dataset not found: {reference}")]
    DatasetNotFound { reference: String },

    #[error("Remote dataset {reference} is not supported by the {engine} engine")]
    UnsupportedDataset { reference: String, engine: String },

    // Bounding box errors
    #[error("Invalid bounding box: {reason}")]
    InvalidBoundingBox { reason: String },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // Format errors
    #[error("Invalid path {}: {reason}", .path.display())]
    InvalidPath { path: PathBuf, reason: String },

    #[error("Unsupported format: .{extension} (supported: {})", .supported.join(", "))]
    UnsupportedFormat { extension: String, supported: Vec<String> },

    #[error("{format} error: {message}")]
    FormatError { format: String, message: String },

    // Engine errors
    #[error("Database error: {0}")]
    Database(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for FirescopeError {
    fn from(e: serde_json::Error) -> Self {
        FirescopeError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FirescopeError>;
