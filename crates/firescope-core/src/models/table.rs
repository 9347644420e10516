//! Validated SQL identifiers and remote dataset references.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{FirescopeError, Result};

/// PostgreSQL truncates identifiers beyond this many bytes
const MAX_IDENTIFIER_LEN: usize = 63;

/// A table name, optionally schema-qualified (`schema.table`).
///
/// Every part matches `[A-Za-z_][A-Za-z0-9_]*`, so the name can be quoted into
/// SQL without escaping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableName {
    schema: Option<String>,
    name: String,
}

impl TableName {
    pub fn parse(value: &str) -> Result<Self> {
        let parts: Vec<&str> = value.split('.').collect();
        match parts.as_slice() {
            [name] => {
                validate_part(value, name)?;
                Ok(Self { schema: None, name: name.to_string() })
            }
            [schema, name] => {
                validate_part(value, schema)?;
                validate_part(value, name)?;
                Ok(Self { schema: Some(schema.to_string()), name: name.to_string() })
            }
            _ => Err(FirescopeError::InvalidIdentifier {
                value: value.to_string(),
                reason: "expected 'table' or 'schema.table'".to_string(),
            }),
        }
    }

    /// Unqualified table name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Double-quoted form for embedding in SQL
    pub fn quoted(&self) -> String {
        match &self.schema {
            Some(schema) => format!("\"{}\".\"{}\"", schema, self.name),
            None => format!("\"{}\"", self.name),
        }
    }
}

fn validate_part(value: &str, part: &str) -> Result<()> {
    let invalid = |reason: &str| FirescopeError::InvalidIdentifier {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let mut chars = part.chars();
    match chars.next() {
        None => return Err(invalid("identifier parts cannot be empty")),
        Some(c) if !(c.is_ascii_alphabetic() || c == '_') => {
            return Err(invalid("identifiers must start with a letter or underscore"))
        }
        Some(_) => {}
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid("identifiers may only contain letters, digits and underscores"));
    }
    if part.len() > MAX_IDENTIFIER_LEN {
        return Err(invalid("identifier longer than 63 characters"));
    }
    Ok(())
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl FromStr for TableName {
    type Err = FirescopeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TableName {
    type Error = FirescopeError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<TableName> for String {
    fn from(value: TableName) -> Self {
        value.to_string()
    }
}

/// Reference to the large dataset a bounded extract reads from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemoteDataset {
    /// Relation visible to the engine (table, view or foreign table)
    Relation(TableName),
    /// Opaque location such as `azure://release/2025-03-19.0/theme=buildings/type=building/*`
    Uri(String),
}

impl RemoteDataset {
    /// Relation names parse as `Relation`, anything else is kept as a URI
    pub fn parse(reference: &str) -> Self {
        match TableName::parse(reference) {
            Ok(table) => RemoteDataset::Relation(table),
            Err(_) => RemoteDataset::Uri(reference.to_string()),
        }
    }
}

impl std::fmt::Display for RemoteDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteDataset::Relation(table) => write!(f, "{}", table),
            RemoteDataset::Uri(uri) => write!(f, "{}", uri),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_and_qualified() {
        let plain = TableName::parse("bldgs_sonoma").unwrap();
        assert_eq!(plain.name(), "bldgs_sonoma");
        assert_eq!(plain.quoted(), "\"bldgs_sonoma\"");

        let qualified = TableName::parse("overture.building").unwrap();
        assert_eq!(qualified.schema(), Some("overture"));
        assert_eq!(qualified.quoted(), "\"overture\".\"building\"");
        assert_eq!(qualified.to_string(), "overture.building");
    }

    #[test]
    fn test_rejects_injection_attempts() {
        assert!(TableName::parse("bldgs; DROP TABLE x").is_err());
        assert!(TableName::parse("\"quoted\"").is_err());
        assert!(TableName::parse("1table").is_err());
        assert!(TableName::parse("").is_err());
        assert!(TableName::parse("a.b.c").is_err());
        assert!(TableName::parse(&"x".repeat(64)).is_err());
    }

    #[test]
    fn test_remote_dataset_parse() {
        assert!(matches!(RemoteDataset::parse("overture.building"), RemoteDataset::Relation(_)));
        assert!(matches!(
            RemoteDataset::parse("azure://release/2025-03-19.0/theme=buildings/type=building/*"),
            RemoteDataset::Uri(_)
        ));
    }

    #[test]
    fn test_serde_validates() {
        let parsed: TableName = serde_json::from_str("\"fhsz_lra\"").unwrap();
        assert_eq!(parsed.name(), "fhsz_lra");
        assert!(serde_json::from_str::<TableName>("\"bad name\"").is_err());
    }
}
