//! Repair command implementation

use crate::cli::{RepairArgs, StorageBackend};
use crate::config_loader::load_config_with_overrides;
use crate::input::{self, ResolvedInput};
use crate::output::OutputWriter;
use crate::output_types::RepairOutput;
use crate::storage::Storage;
use anyhow::{bail, Context, Result};
use firescope_core::config::CliConfigOverrides;
use firescope_core::formats::write_feature_set;
use firescope_core::models::FeatureSet;
use firescope_geo::{GeometryRepairer, RepairOptions, RepairReport};
use std::path::{Path, PathBuf};

pub async fn execute(
    args: RepairArgs,
    backend: StorageBackend,
    config_path: Option<&Path>,
    output: &OutputWriter,
) -> Result<()> {
    let config = load_config_with_overrides(
        config_path,
        CliConfigOverrides {
            densify_max_angle: args.max_angle,
            densify_max_deviation: args.max_deviation,
            geometry_validity: args.validity,
        },
    )?;
    let options = RepairOptions::from_config(&config);
    tracing::debug!(
        validity = ?options.validity,
        max_angle = options.tolerance.max_angle,
        max_deviation = options.tolerance.max_deviation,
        "Repair options"
    );

    let storage = Storage::open(input::backend_for(&args.input, backend), &config).await?;
    let result = run(&args, &storage, options).await;
    storage.close().await;
    let (report, written) = result?;

    if output.is_json() {
        output.result(RepairOutput {
            report: report.clone(),
            written_to: written.as_ref().map(|p| p.display().to_string()),
        })?;
    } else {
        print_report(&report, output);
        if let Some(path) = &written {
            output.success(format!("Repaired feature set written to {}", path.display()));
        }
    }

    if !report.is_clean() {
        let failed: Vec<String> = report
            .outcomes()
            .iter()
            .filter(|o| !o.is_ok())
            .map(|o| o.to_string())
            .collect();
        bail!("Repair of {} did not finish cleanly: {}", report.feature_set, failed.join("; "));
    }

    Ok(())
}

async fn run(
    args: &RepairArgs,
    storage: &Storage,
    options: RepairOptions,
) -> Result<(RepairReport, Option<PathBuf>)> {
    let input = input::resolve(&args.input, storage).await?;
    let repairer = GeometryRepairer::new(storage.features.clone(), options);
    let report = repairer.check_and_repair(&input.table).await;

    let target = match (&input.path, &args.output) {
        (_, Some(output)) => Some(output.clone()),
        (Some(path), None) => Some(input::repaired_path(path)),
        _ => None,
    };

    if let Some(target) = &target {
        write_back(storage, &input, target).await?;
    } else if input.path.is_none() {
        tracing::info!(feature_set = %input.table, "Table updated in place");
    }

    Ok((report, target))
}

/// Write the stored state of the set to a native feature-set file
async fn write_back(storage: &Storage, input: &ResolvedInput, target: &Path) -> Result<()> {
    let features = storage
        .features
        .list_features(&input.table)
        .await
        .context("Failed to read repaired features")?;

    let set = FeatureSet::new(input.table.name(), input.crs.unwrap_or(4326), features);
    write_feature_set(target, &set)
        .with_context(|| format!("Failed to write {}", target.display()))?;
    tracing::info!(path = %target.display(), features = set.len(), "Feature set written");
    Ok(())
}

fn print_report(report: &RepairReport, output: &OutputWriter) {
    output.section(format!("Geometry Repair: {}", report.feature_set));
    output.kv("Started", report.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    output.kv("Finished", report.finished_at.format("%Y-%m-%d %H:%M:%S UTC"));

    output.section("Check");
    output.kv("Outcome", &report.check_outcome);
    if let Some(check) = &report.check {
        output.kv("Features checked", check.checked);
        output.kv("Issues", check.issues.len());
    }

    output.section("Repair");
    output.kv("Outcome", &report.repair_outcome);
    if let Some(repair) = &report.repair {
        output.kv("Repaired", repair.repaired.len());
        output.kv("Deleted", repair.deleted.len());
        if !repair.failed.is_empty() {
            let ids: Vec<String> = repair.failed.iter().map(|id| id.to_string()).collect();
            output.warning(format!("Could not write repairs for: {}", ids.join(", ")));
        }
    }

    output.section("Curves");
    output.kv("Outcome", &report.curve_outcome);
    output.kv("Curved features", report.curves.len());
    if let Some(densify) = &report.densify {
        output.kv("Densified", densify.densified.len());
        if !densify.failed.is_empty() {
            let ids: Vec<String> = densify.failed.iter().map(|id| id.to_string()).collect();
            output.warning(format!("Could not densify: {}", ids.join(", ")));
        }
    }
}
