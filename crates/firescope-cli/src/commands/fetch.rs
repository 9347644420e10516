//! Fetch command implementation

use crate::cli::{FetchArgs, StorageBackend};
use crate::config_loader::load_config;
use crate::errors;
use crate::input::read_feature_set;
use crate::output::OutputWriter;
use crate::storage::Storage;
use anyhow::{bail, Result};
use firescope_core::models::{BoundingBox, RemoteDataset, TableName};
use firescope_store::BoundedRemoteFetcher;
use std::path::Path;

/// CRS of the remote building dataset
const SOURCE_CRS: u32 = 4326;

pub async fn execute(
    args: FetchArgs,
    backend: StorageBackend,
    config_path: Option<&Path>,
    output: &OutputWriter,
) -> Result<()> {
    if backend != StorageBackend::Postgres {
        return Err(errors::postgres_required("fetch").into());
    }

    let source = RemoteDataset::parse(&args.source);
    let target = TableName::parse(&args.table)?;
    let bbox = bounds(&args).await?;
    if bbox.crs != SOURCE_CRS {
        output.warning(format!(
            "Bounding box is in EPSG:{} but buildings are in EPSG:{}; no reprojection is done",
            bbox.crs, SOURCE_CRS
        ));
    }

    let config = load_config(config_path)?;
    let storage = Storage::open(backend, &config).await?;
    let result = async {
        let fetcher = BoundedRemoteFetcher::new(storage.engine()?);
        anyhow::Ok(fetcher.fetch(&source, &bbox, &target).await?)
    }
    .await;
    storage.close().await;
    let summary = result?;

    if output.is_json() {
        output.result(&summary)?;
    } else {
        output.section("Bounded Extract");
        output.kv("Source", &summary.source);
        output.kv("Bounding box", summary.bbox);
        output.kv("Rows", summary.rows);
        output.success(format!("{} created", summary.table));
    }

    Ok(())
}

/// Bounding box from whichever of the bound arguments was given
async fn bounds(args: &FetchArgs) -> Result<BoundingBox> {
    if let Some(bbox) = &args.bbox {
        return Ok(bbox.parse::<BoundingBox>()?);
    }
    if let Some(wkt) = &args.envelope_wkt {
        return Ok(BoundingBox::from_wkt(wkt, SOURCE_CRS)?);
    }
    if let Some(path) = &args.boundary {
        let set = read_feature_set(path).await?;
        return Ok(BoundingBox::of_feature_set(&set)?);
    }
    bail!("One of --bbox, --envelope-wkt or --boundary is required")
}
