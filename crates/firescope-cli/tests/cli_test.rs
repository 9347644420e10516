//! Integration tests for the firescope binary
//!
//! These run the compiled binary against feature-set files with the
//! in-memory backend and check its JSON output.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const CONFIG_VARS: [&str; 5] = [
    "FIRESCOPE_DENSIFY_MAX_ANGLE",
    "FIRESCOPE_DENSIFY_MAX_DEVIATION",
    "FIRESCOPE_GEOMETRY_VALIDITY",
    "FIRESCOPE_EXTENSIONS",
    "DATABASE_URL",
];

fn firescope(args: &[&str]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_firescope"));
    for var in CONFIG_VARS {
        command.env_remove(var);
    }
    command.env("RUST_LOG", "warn").args(args).output().expect("Failed to execute command")
}

fn json_stdout(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("Output should be valid JSON")
}

/// Two squares, one clockwise, and a half disc with an arc on top
fn write_zones(dir: &Path) -> String {
    let set = serde_json::json!({
        "name": "fhsz_sra",
        "crs": 3310,
        "features": [
            {"id": 1, "geometry": {"type": "Polygon", "coordinates": [[[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0], [0.0, 0.0]]]}},
            {"id": 2, "geometry": {"type": "CurvePolygon", "curveRings": [[[90.0, 100.0], [110.0, 100.0], {"c": [[90.0, 100.0], [100.0, 110.0]]}]]}},
            {"id": 3, "geometry": {"type": "Polygon", "coordinates": [[[20.0, 0.0], [20.0, 10.0], [30.0, 10.0], [30.0, 0.0], [20.0, 0.0]]]}, "properties": {"haz_class": "Very High"}}
        ]
    });
    let path = dir.join("fhsz_sra.json");
    fs::write(&path, serde_json::to_string_pretty(&set).unwrap()).unwrap();
    path.display().to_string()
}

#[test]
fn test_bbox_prints_envelope() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_zones(dir.path());

    let output = firescope(&["bbox", &path, "--json"]);
    assert!(output.status.success());

    let parsed = json_stdout(&output);
    assert_eq!(parsed["status"], "success");
    let bbox = &parsed["data"]["bbox"];
    assert_eq!(bbox["xmin"], 0.0);
    assert_eq!(bbox["ymax"], 110.0);
    assert_eq!(bbox["crs"], 3310);
    assert_eq!(parsed["data"]["features"], 3);
}

#[test]
fn test_curves_lists_curved_feature() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_zones(dir.path());

    let output = firescope(&["curves", &path, "--json"]);
    assert!(output.status.success());

    let parsed = json_stdout(&output);
    assert_eq!(parsed["data"]["count"], 1);
    assert_eq!(parsed["data"]["ids"], serde_json::json!([2]));
}

#[test]
fn test_check_reports_orientation_only_when_strict() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_zones(dir.path());

    let strict = json_stdout(&firescope(&["check", &path, "--json"]));
    let issues = strict["data"]["issues"].as_array().unwrap();
    assert!(issues.iter().any(|i| i["feature_id"] == 3));

    let lenient = json_stdout(&firescope(&["check", &path, "--validity", "lenient", "--json"]));
    assert_eq!(lenient["data"]["checked"], 3);
    assert!(lenient["data"]["issues"].as_array().unwrap().is_empty());
}

#[test]
fn test_repair_writes_linear_copy() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_zones(dir.path());

    let output = firescope(&["repair", &path, "--json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let parsed = json_stdout(&output);
    let report = &parsed["data"]["report"];
    assert_eq!(report["curve_outcome"]["status"], "ok");
    assert_eq!(report["densify"]["densified"], serde_json::json!([2]));
    assert_eq!(report["repair"]["repaired"], serde_json::json!([3]));

    let written = dir.path().join("fhsz_sra.repaired.json");
    assert_eq!(parsed["data"]["written_to"], written.display().to_string());

    let content = fs::read_to_string(&written).unwrap();
    assert!(!content.contains("curve"));

    let again = json_stdout(&firescope(&["curves", &written.display().to_string(), "--json"]));
    assert_eq!(again["data"]["count"], 0);

    let original = fs::read_to_string(&path).unwrap();
    assert!(original.contains("curveRings"), "input file must be left untouched");
}

#[test]
fn test_file_repair_never_needs_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_zones(dir.path());

    // DATABASE_URL is unset, so any connection attempt would fail
    let output = firescope(&["--storage", "postgres", "repair", &path, "--json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let written = dir.path().join("fhsz_sra.repaired.json");
    let parsed = json_stdout(&output);
    assert_eq!(parsed["data"]["written_to"], written.display().to_string());
    assert!(!fs::read_to_string(&written).unwrap().contains("curve"));

    let curves = firescope(&["--storage", "postgres", "curves", &path, "--json"]);
    assert!(curves.status.success());
    assert_eq!(json_stdout(&curves)["data"]["count"], 1);
}

#[test]
fn test_repair_honors_output_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_zones(dir.path());
    let target = dir.path().join("out").join("zones.json");

    let output = firescope(&["repair", &path, "--output", &target.display().to_string()]);
    assert!(output.status.success());

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&target).unwrap()).unwrap();
    assert_eq!(written["name"], "fhsz_sra");
    assert_eq!(written["crs"], 3310);
    assert_eq!(written["features"].as_array().unwrap().len(), 3);
}

#[test]
fn test_repair_rejects_bad_tolerance() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_zones(dir.path());

    let output = firescope(&["repair", &path, "--max-deviation", "0"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("max_deviation"));
}

#[test]
fn test_table_input_needs_postgres() {
    let output = firescope(&["curves", "--table", "fhsz_sra"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("memory storage"));
}

#[test]
fn test_fetch_needs_postgres() {
    let output = firescope(&[
        "fetch",
        "--source",
        "overture.buildings",
        "--table",
        "bldgs_sonoma",
        "--bbox",
        "-123.1,38.2,-122.3,38.9",
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("PostgreSQL"));
}

#[test]
fn test_config_shows_sources() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("firescope.toml");
    fs::write(&config_path, "geometry_validity = \"Lenient\"\n\n[densify]\nmax_angle = 0.05\n")
        .unwrap();

    let output = firescope(&["config", "--config", &config_path.display().to_string(), "--json"]);
    assert!(output.status.success());

    let data = &json_stdout(&output)["data"];
    assert_eq!(data["densify_max_angle"]["source"], "file");
    assert_eq!(data["geometry_validity"]["source"], "file");
    assert_eq!(data["densify_max_deviation"]["source"], "default");
    assert_eq!(data["database_url"]["value"], "(not set)");
}
