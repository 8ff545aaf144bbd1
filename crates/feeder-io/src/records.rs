//! YAML/JSON input files to [`InputRecords`].

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use feeder_core::InputRecords;

pub fn records_from_yaml_str(data: &str) -> Result<InputRecords> {
    serde_yaml::from_str(data).context("parsing network yaml")
}

pub fn records_from_json_str(data: &str) -> Result<InputRecords> {
    serde_json::from_str(data).context("parsing network json")
}

/// Read a network file. The format comes from the extension (`.yaml`,
/// `.yml`, `.json`); anything else is tried as YAML and then as JSON.
pub fn load_records(path: &Path) -> Result<InputRecords> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading network file '{}'", path.display()))?;
    let records = match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
            records_from_yaml_str(&data)
        }
        Some(ext) if ext.eq_ignore_ascii_case("json") => records_from_json_str(&data),
        _ => serde_yaml::from_str(&data)
            .or_else(|_| serde_json::from_str(&data))
            .context("parsing network file"),
    };
    records.with_context(|| format!("loading '{}'", path.display()))
}
