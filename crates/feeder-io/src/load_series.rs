//! Load time series from CSV files.
//!
//! A Load may name a `csv` file instead of listing its series inline:
//!
//! ```csv
//! kws1,kvars1,kws2
//! 5.6,1.2,4.0
//! 6.1,1.4,4.2
//! ```
//!
//! Each column named after a series field (`kws1` ... `kvars3`) fills that
//! series, one row per time step.

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use feeder_core::input::LoadInput;
use feeder_core::InputRecords;

/// Fill the series of every Load that only references a CSV file. Relative
/// paths are resolved against `base_dir`. Returns the number of loads read.
pub fn resolve_load_series(records: &mut InputRecords, base_dir: &Path) -> Result<usize> {
    let mut resolved = 0;
    for load in records.loads.iter_mut() {
        let has_series = (1..=3).any(|phase| load.kws(phase).is_some());
        let Some(csv) = load.csv.clone() else {
            continue;
        };
        if has_series {
            tracing::warn!(csv = %csv, bus = ?load.bus, "load has inline kws; ignoring its csv");
            continue;
        }
        let path = base_dir.join(&csv);
        read_series(load, &path).with_context(|| {
            format!(
                "reading load series for bus {} from '{}'",
                load.bus.as_deref().unwrap_or("?"),
                path.display()
            )
        })?;
        resolved += 1;
    }
    Ok(resolved)
}

fn read_series(load: &mut LoadInput, path: &Path) -> Result<()> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .context("opening load CSV")?;
    let headers = reader.headers().context("reading CSV header")?.clone();

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); headers.len()];
    for (row, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("reading CSV row {}", row + 1))?;
        for (col, field) in record.iter().enumerate() {
            let value: f64 = field
                .parse()
                .with_context(|| format!("parsing '{}' in row {}, column {}", field, row + 1, col + 1))?;
            columns
                .get_mut(col)
                .ok_or_else(|| anyhow!("row {} has more fields than the header", row + 1))?
                .push(value);
        }
    }

    let mut filled = 0;
    for (name, values) in headers.iter().zip(columns) {
        if load.set_series(name, values) {
            filled += 1;
        } else {
            tracing::warn!(column = name, path = %path.display(), "ignoring unknown load CSV column");
        }
    }
    if filled == 0 {
        bail!("no kws1..kvars3 columns found");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn csv_load(bus: &str, csv: &str) -> LoadInput {
        LoadInput {
            bus: Some(bus.into()),
            csv: Some(csv.into()),
            ..LoadInput::default()
        }
    }

    #[test]
    fn test_resolve_relative_csv() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b3.csv"), "kws1, kvars1,note\n5.6,1.2,1\n6.0,1.5,2\n").unwrap();

        let mut records = InputRecords {
            loads: vec![csv_load("b3", "b3.csv")],
            ..InputRecords::default()
        };
        assert_eq!(resolve_load_series(&mut records, dir.path()).unwrap(), 1);
        let load = &records.loads[0];
        assert_eq!(load.kws1, Some(vec![5.6, 6.0]));
        assert_eq!(load.kvars1, Some(vec![1.2, 1.5]));
        assert_eq!(load.kws2, None);
    }

    #[test]
    fn test_inline_series_wins() {
        let mut load = csv_load("b3", "missing.csv");
        load.kws1 = Some(vec![1.0]);
        let mut records = InputRecords {
            loads: vec![load],
            ..InputRecords::default()
        };
        assert_eq!(resolve_load_series(&mut records, Path::new(".")).unwrap(), 0);
    }

    #[test]
    fn test_bad_csv_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("x.csv"), "power\n1.0\n").unwrap();
        fs::write(dir.path().join("y.csv"), "kws1\nabc\n").unwrap();

        for name in ["x.csv", "y.csv", "z.csv"] {
            let mut records = InputRecords {
                loads: vec![csv_load("b3", name)],
                ..InputRecords::default()
            };
            let err = resolve_load_series(&mut records, dir.path()).unwrap_err();
            assert!(format!("{err:#}").contains("b3"), "{name}: {err:#}");
        }
    }
}
