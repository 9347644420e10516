//! Check command implementation

use crate::cli::{CheckArgs, StorageBackend};
use crate::config_loader::load_config_with_overrides;
use crate::input;
use crate::output::OutputWriter;
use crate::output_types::CheckOutput;
use crate::storage::Storage;
use anyhow::Result;
use firescope_core::config::CliConfigOverrides;
use firescope_geo::{CheckSummary, GeometryRepairer, RepairOptions};
use std::path::Path;
use tabled::Tabled;

#[derive(Tabled)]
struct IssueRow {
    #[tabled(rename = "Feature")]
    feature_id: String,
    #[tabled(rename = "Issue")]
    kind: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

pub async fn execute(
    args: CheckArgs,
    backend: StorageBackend,
    config_path: Option<&Path>,
    output: &OutputWriter,
) -> Result<()> {
    let config = load_config_with_overrides(
        config_path,
        CliConfigOverrides { geometry_validity: args.validity, ..Default::default() },
    )?;
    let options = RepairOptions::from_config(&config);

    let storage = Storage::open(input::backend_for(&args.input, backend), &config).await?;
    let result = run(&args, &storage, options).await;
    storage.close().await;
    let (feature_set, summary) = result?;

    if output.is_json() {
        output.result(CheckOutput {
            feature_set,
            checked: summary.checked,
            issues: summary.issues,
        })?;
        return Ok(());
    }

    output.section(format!("Geometry Check: {}", feature_set));
    output.kv("Validity", format!("{:?}", options.validity));
    output.kv("Features checked", summary.checked);
    output.kv("Issues", summary.issues.len());

    if summary.issues.is_empty() {
        output.success("All geometries are valid");
    } else {
        let rows = summary
            .issues
            .into_iter()
            .map(|issue| IssueRow {
                feature_id: issue.feature_id.to_string(),
                kind: issue.kind.to_string(),
                location: issue.location,
                reason: issue.reason,
            })
            .collect();
        output.table(rows);
        output.info("Run 'firescope repair' to fix what can be fixed");
    }

    Ok(())
}

async fn run(
    args: &CheckArgs,
    storage: &Storage,
    options: RepairOptions,
) -> Result<(String, CheckSummary)> {
    let input = input::resolve(&args.input, storage).await?;
    let repairer = GeometryRepairer::new(storage.features.clone(), options);
    let summary = repairer.check(&input.table).await?;
    Ok((input.table.to_string(), summary))
}
