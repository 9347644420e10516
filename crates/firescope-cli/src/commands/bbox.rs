use crate::cli::BboxArgs;
use crate::input::read_feature_set;
use crate::output::OutputWriter;
use crate::output_types::BboxOutput;
use anyhow::Result;
use firescope_core::models::BoundingBox;

pub async fn execute(args: BboxArgs, output: &OutputWriter) -> Result<()> {
    let set = read_feature_set(&args.path).await?;
    let bbox = BoundingBox::of_feature_set(&set)?;

    if output.is_json() {
        output.result(BboxOutput {
            path: args.path.display().to_string(),
            feature_set: set.name.clone(),
            features: set.len(),
            bbox,
        })?;
    } else {
        output.section(format!("Envelope: {}", set.name));
        output.kv("Features", set.len());
        output.kv("CRS", format!("EPSG:{}", bbox.crs));
        output.kv("Bounding box", format!("{},{},{},{}", bbox.xmin, bbox.ymin, bbox.xmax, bbox.ymax));
    }

    Ok(())
}
