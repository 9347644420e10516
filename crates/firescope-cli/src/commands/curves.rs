use crate::cli::{CurvesArgs, StorageBackend};
use crate::config_loader::load_config;
use crate::input;
use crate::output::OutputWriter;
use crate::output_types::CurvesOutput;
use crate::storage::Storage;
use anyhow::Result;
use firescope_core::models::FeatureId;
use firescope_geo::{GeometryRepairer, RepairOptions};
use std::path::Path;

pub async fn execute(
    args: CurvesArgs,
    backend: StorageBackend,
    config_path: Option<&Path>,
    output: &OutputWriter,
) -> Result<()> {
    let config = load_config(config_path)?;
    let storage = Storage::open(input::backend_for(&args.input, backend), &config).await?;

    let result = async {
        let input = input::resolve(&args.input, &storage).await?;
        let repairer =
            GeometryRepairer::new(storage.features.clone(), RepairOptions::from_config(&config));
        let curves = repairer.detect_curves(&input.table).await?;
        anyhow::Ok((input.table.to_string(), curves))
    }
    .await;
    storage.close().await;
    let (feature_set, curves) = result?;

    let ids: Vec<FeatureId> = curves.into_iter().collect();
    if output.is_json() {
        output.result(CurvesOutput { feature_set, count: ids.len(), ids })?;
    } else if ids.is_empty() {
        output.success(format!("{} has no curves", feature_set));
    } else {
        output.section(format!("Curved features: {}", feature_set));
        output.kv("Count", ids.len());
        output.kv("Ids", ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", "));
        output.info("Run 'firescope repair' to densify them");
    }

    Ok(())
}
