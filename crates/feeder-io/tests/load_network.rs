//! Loading networks from files on disk

use std::fs;

use feeder_core::{Diagnostics, FeederError, LoadKind};
use feeder_io::{load_network, load_network_with_diagnostics};
use tempfile::tempdir;

const NETWORK: &str = r#"
Network:
  substation_bus: 0
  Sbase: 1.0e6
  Vbase: 4160
Conductor:
  - name: ohl
    busses: [0, 1]
    r1: 0.3
    x1: 0.6
    length: 100
  - busses: [1, 2]
    template: ohl
    length: 100
  - busses: [1, 3]
    template: ohl
    length: 50
Load:
  - bus: 2
    csv: series/bus2.csv
  - bus: 3
"#;

#[test]
fn network_with_csv_loads() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("series")).unwrap();
    fs::write(
        dir.path().join("series/bus2.csv"),
        "kws1,kvars1\n10,2\n12,3\n14,4\n",
    )
    .unwrap();
    let path = dir.path().join("feeder.yaml");
    fs::write(&path, NETWORK).unwrap();

    let mut diag = Diagnostics::new();
    let mut net = load_network_with_diagnostics(&path, &mut diag).unwrap();
    assert_eq!(net.ntimesteps, 3);
    assert_eq!(
        net.load_value("2", LoadKind::Reactive, 1).unwrap(),
        vec![2.0, 3.0, 4.0]
    );
    assert_eq!(net.load_busses(), vec!["2"]);
    assert_eq!(diag.warning_count(), 1);
    assert_eq!(diag.stats.as_ref().unwrap().dropped_loads, 1);

    // bus 3 lost its load, so its branch goes
    assert_eq!(net.trim_tree(), 1);
    assert_eq!(net.reduce_tree(), 1);
    assert_eq!(net.edges(), vec![("0".to_string(), "2".to_string())]);
}

#[test]
fn missing_csv_names_the_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("feeder.yaml");
    fs::write(&path, NETWORK).unwrap();
    let err = load_network(&path).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("bus2.csv"), "{message}");
}

#[test]
fn build_errors_keep_their_source() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("feeder.json");
    fs::write(
        &path,
        r#"{"Network": {"substation_bus": "a"}, "Conductor": [{"busses": ["a", "b"], "r1": 0.1, "x1": 0.1}]}"#,
    )
    .unwrap();
    let err = load_network(&path).unwrap_err();
    let source = err.downcast_ref::<FeederError>().unwrap();
    assert!(matches!(source, FeederError::Validation { .. }));
    assert!(err.to_string().contains("feeder.json"));
}
