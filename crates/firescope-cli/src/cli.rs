use clap::{Args, Parser, Subcommand};
use firescope_core::config::parse_validity_mode;
use firescope_core::models::ValidityMode;
use std::path::PathBuf;

/// Firescope - Wildfire exposure geometry tooling
#[derive(Parser, Debug)]
#[command(name = "firescope")]
#[command(about = "Geometry repair and bounded building extracts", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Storage backend to use (memory or postgres)
    #[arg(long, global = true, default_value = "memory")]
    pub storage: StorageBackend,

    /// Configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StorageBackend {
    /// In-memory storage (default, feature-set files only)
    Memory,
    /// PostgreSQL with PostGIS, tables updated in place
    Postgres,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate geometries without changing them
    Check(CheckArgs),

    /// List features holding curved geometries
    Curves(CurvesArgs),

    /// Check, repair and densify a feature set
    Repair(RepairArgs),

    /// Copy buildings inside a bounding box into a local table
    Fetch(FetchArgs),

    /// Print the envelope of a feature-set file
    Bbox(BboxArgs),

    /// Show the effective configuration
    Config,
}

/// Where a feature set comes from: a file or an existing table
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct InputArgs {
    /// Feature-set file (native JSON, GeoJSON or Shapefile)
    pub path: Option<PathBuf>,

    /// Existing feature-set table (postgres storage)
    #[arg(long, value_name = "NAME")]
    pub table: Option<String>,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Geometry validity mode (strict or lenient)
    #[arg(long, value_parser = parse_validity)]
    pub validity: Option<ValidityMode>,
}

#[derive(Args, Debug)]
pub struct CurvesArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Args, Debug)]
pub struct RepairArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Where to write the repaired feature set (file input only)
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Largest angle one densified segment may span, in radians
    #[arg(long)]
    pub max_angle: Option<f64>,

    /// Largest distance between a densified segment and its arc
    #[arg(long)]
    pub max_deviation: Option<f64>,

    /// Geometry validity mode (strict or lenient)
    #[arg(long, value_parser = parse_validity)]
    pub validity: Option<ValidityMode>,
}

#[derive(Args, Debug)]
#[command(group(clap::ArgGroup::new("bounds").required(true).args(["bbox", "envelope_wkt", "boundary"])))]
pub struct FetchArgs {
    /// Source relation holding the remote buildings (e.g. overture.buildings)
    #[arg(long)]
    pub source: String,

    /// Table to create with the extract
    #[arg(long)]
    pub table: String,

    /// Bounding box as xmin,ymin,xmax,ymax in EPSG:4326
    #[arg(long, allow_hyphen_values = true)]
    pub bbox: Option<String>,

    /// Envelope given as WKT, e.g. POLYGON((...))
    #[arg(long, value_name = "WKT")]
    pub envelope_wkt: Option<String>,

    /// Feature-set file whose envelope bounds the extract
    #[arg(long, value_name = "FILE")]
    pub boundary: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct BboxArgs {
    /// Feature-set file
    pub path: PathBuf,
}

fn parse_validity(s: &str) -> Result<ValidityMode, String> {
    parse_validity_mode(s).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_repair_accepts_path_and_overrides() {
        let cli = Cli::try_parse_from([
            "firescope",
            "repair",
            "fhsz_sra.json",
            "--max-angle",
            "0.1",
            "--validity",
            "esri",
            "--json",
        ])
        .unwrap();

        assert!(cli.json);
        let Commands::Repair(args) = cli.command else {
            panic!("expected repair command");
        };
        assert_eq!(args.input.path, Some(PathBuf::from("fhsz_sra.json")));
        assert_eq!(args.max_angle, Some(0.1));
        assert_eq!(args.validity, Some(ValidityMode::Lenient));
    }

    #[test]
    fn test_input_requires_exactly_one_source() {
        assert!(Cli::try_parse_from(["firescope", "check"]).is_err());
        assert!(
            Cli::try_parse_from(["firescope", "check", "a.json", "--table", "fhsz"]).is_err()
        );
        assert!(Cli::try_parse_from(["firescope", "curves", "--table", "fhsz"]).is_ok());
    }

    #[test]
    fn test_fetch_requires_one_bound() {
        let base = ["firescope", "fetch", "--source", "overture.buildings", "--table", "bldgs"];
        assert!(Cli::try_parse_from(base).is_err());

        let cli = Cli::try_parse_from(
            base.iter().copied().chain(["--bbox", "-123.1,38.2,-122.3,38.9"]),
        )
        .unwrap();
        let Commands::Fetch(args) = cli.command else {
            panic!("expected fetch command");
        };
        assert_eq!(args.bbox.as_deref(), Some("-123.1,38.2,-122.3,38.9"));

        assert!(Cli::try_parse_from(
            base.iter().copied().chain(["--bbox", "0,0,1,1", "--envelope-wkt", "POINT(0 0)"]),
        )
        .is_err());
    }
}
