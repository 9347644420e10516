//! Config command implementation

use crate::config_loader::load_config;
use crate::output::OutputWriter;
use crate::output_types::ConfigEntry;
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;
use tabled::Tabled;

#[derive(Tabled)]
struct ConfigRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Source")]
    source: String,
}

pub fn execute(config_path: Option<&Path>, output: &OutputWriter) -> Result<()> {
    let config = load_config(config_path)?;

    // Sort by key for consistent output
    let mut entries: BTreeMap<String, ConfigEntry> = config
        .to_inspection_map()
        .into_iter()
        .map(|(key, (value, source))| (key, ConfigEntry { value, source: source.to_string() }))
        .collect();

    let database_url = match std::env::var("DATABASE_URL") {
        // Hide credentials
        Ok(url) => format!("...@{}", url.split('@').next_back().unwrap_or_default()),
        Err(_) => "(not set)".to_string(),
    };
    entries.insert(
        "database_url".to_string(),
        ConfigEntry { value: database_url, source: "environment".to_string() },
    );

    if output.is_json() {
        output.result(entries)?;
        return Ok(());
    }

    output.section("Configuration Values");
    let rows: Vec<ConfigRow> = entries
        .into_iter()
        .map(|(key, entry)| ConfigRow { key, value: entry.value, source: entry.source })
        .collect();
    output.table(rows);

    output.section("Configuration Precedence");
    output.info("CLI arguments > Environment variables > Config file > Defaults");

    Ok(())
}
