use crate::error::{FirescopeError, Result};
use crate::models::{DensifyTolerance, ValidityMode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ConfigSource::Default => "default",
            ConfigSource::File => "file",
            ConfigSource::Environment => "environment",
            ConfigSource::Cli => "cli",
        };
        write!(f, "{}", label)
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered configuration for firescope
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub densify_max_angle: ConfigValue<f64>,
    pub densify_max_deviation: ConfigValue<f64>,
    pub geometry_validity: ConfigValue<ValidityMode>,
    pub extensions: ConfigValue<Vec<String>>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            densify_max_angle: ConfigValue::new(
                DensifyTolerance::DEFAULT_MAX_ANGLE,
                ConfigSource::Default,
            ),
            densify_max_deviation: ConfigValue::new(
                DensifyTolerance::DEFAULT_MAX_DEVIATION,
                ConfigSource::Default,
            ),
            geometry_validity: ConfigValue::new(ValidityMode::Strict, ConfigSource::Default),
            extensions: ConfigValue::new(vec!["postgis".to_string()], ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| FirescopeError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| FirescopeError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(densify) = file_config.densify {
            if let Some(angle) = densify.max_angle {
                self.densify_max_angle
                    .update(parse_tolerance("densify.max_angle", angle)?, ConfigSource::File);
            }
            if let Some(deviation) = densify.max_deviation {
                self.densify_max_deviation.update(
                    parse_tolerance("densify.max_deviation", deviation)?,
                    ConfigSource::File,
                );
            }
        }

        if let Some(geometry_validity) = file_config.geometry_validity {
            self.geometry_validity.update(geometry_validity, ConfigSource::File);
        }

        if let Some(extensions) = file_config.extensions {
            self.extensions.update(extensions, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // FIRESCOPE_DENSIFY_MAX_ANGLE
        if let Ok(angle_str) = env::var("FIRESCOPE_DENSIFY_MAX_ANGLE") {
            match angle_str.parse::<f64>().map_err(|_| ()).and_then(|v| {
                parse_tolerance("densify_max_angle", v).map_err(|_| ())
            }) {
                Ok(angle) => self.densify_max_angle.update(angle, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid FIRESCOPE_DENSIFY_MAX_ANGLE value '{}': expected positive radians",
                    angle_str
                ),
            }
        }

        // FIRESCOPE_DENSIFY_MAX_DEVIATION
        if let Ok(deviation_str) = env::var("FIRESCOPE_DENSIFY_MAX_DEVIATION") {
            match deviation_str.parse::<f64>().map_err(|_| ()).and_then(|v| {
                parse_tolerance("densify_max_deviation", v).map_err(|_| ())
            }) {
                Ok(deviation) => {
                    self.densify_max_deviation.update(deviation, ConfigSource::Environment)
                }
                Err(_) => tracing::warn!(
                    "Invalid FIRESCOPE_DENSIFY_MAX_DEVIATION value '{}': expected positive distance",
                    deviation_str
                ),
            }
        }

        // FIRESCOPE_GEOMETRY_VALIDITY
        if let Ok(validity_str) = env::var("FIRESCOPE_GEOMETRY_VALIDITY") {
            match parse_validity_mode(&validity_str) {
                Ok(validity) => self.geometry_validity.update(validity, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid FIRESCOPE_GEOMETRY_VALIDITY value '{}': expected strict or lenient",
                    validity_str
                ),
            }
        }

        // FIRESCOPE_EXTENSIONS
        if let Ok(extensions) = env::var("FIRESCOPE_EXTENSIONS") {
            let list = parse_extension_list(&extensions);
            self.extensions.update(list, ConfigSource::Environment);
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) -> Result<()> {
        if let Some(angle) = overrides.densify_max_angle {
            self.densify_max_angle
                .update(parse_tolerance("max_angle", angle)?, ConfigSource::Cli);
        }

        if let Some(deviation) = overrides.densify_max_deviation {
            self.densify_max_deviation
                .update(parse_tolerance("max_deviation", deviation)?, ConfigSource::Cli);
        }

        if let Some(geometry_validity) = overrides.geometry_validity {
            self.geometry_validity.update(geometry_validity, ConfigSource::Cli);
        }

        Ok(())
    }

    /// Effective densify tolerance
    pub fn densify_tolerance(&self) -> DensifyTolerance {
        DensifyTolerance::new(self.densify_max_angle.value, self.densify_max_deviation.value)
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "densify_max_angle".to_string(),
            (
                format!(
                    "{} rad ({:.1}°)",
                    self.densify_max_angle.value,
                    self.densify_max_angle.value.to_degrees()
                ),
                self.densify_max_angle.source,
            ),
        );

        map.insert(
            "densify_max_deviation".to_string(),
            (self.densify_max_deviation.value.to_string(), self.densify_max_deviation.source),
        );

        map.insert(
            "geometry_validity".to_string(),
            (format!("{:?}", self.geometry_validity.value), self.geometry_validity.source),
        );

        map.insert(
            "extensions".to_string(),
            (self.extensions.value.join(","), self.extensions.source),
        );

        map
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    densify: Option<FileDensifyConfig>,
    geometry_validity: Option<ValidityMode>,
    extensions: Option<Vec<String>>,
}

/// `[densify]` table of the config file
#[derive(Debug, Deserialize, Serialize)]
struct FileDensifyConfig {
    max_angle: Option<f64>,
    max_deviation: Option<f64>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub densify_max_angle: Option<f64>,
    pub densify_max_deviation: Option<f64>,
    pub geometry_validity: Option<ValidityMode>,
}

/// Check that a densify tolerance is usable
pub fn parse_tolerance(key: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(FirescopeError::InvalidTolerance { key: key.to_string(), value })
    }
}

/// Parse validity mode from string
pub fn parse_validity_mode(s: &str) -> Result<ValidityMode> {
    match s.to_lowercase().as_str() {
        "strict" | "ogc" => Ok(ValidityMode::Strict),
        "lenient" | "esri" => Ok(ValidityMode::Lenient),
        _ => Err(FirescopeError::ConfigInvalid {
            key: "geometry_validity".to_string(),
            reason: format!("Invalid validity mode: {}. Use strict or lenient", s),
        }),
    }
}

/// Split a comma separated extension list, dropping blanks
pub fn parse_extension_list(s: &str) -> Vec<String> {
    s.split(',').map(str::trim).filter(|e| !e.is_empty()).map(str::to_string).collect()
}
