//! # feeder-io: Network Files to feeder-core Networks
//!
//! Reads YAML or JSON network files into [`feeder_core::InputRecords`],
//! fills Load time series from referenced CSV files, and builds a
//! [`feeder_core::Network`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut diag = feeder_core::Diagnostics::new();
//!     let network = feeder_io::load_network_with_diagnostics(Path::new("ieee13.yaml"), &mut diag)?;
//!
//!     println!("{}", network.stats());
//!     println!("{}", diag.summary());
//!     Ok(())
//! }
//! ```
//!
//! ## File Layout
//!
//! One top-level key per entity kind, each holding one record or a list:
//!
//! ```yaml
//! Network:
//!   substation_bus: "650"
//!   Sbase: 1.0e6
//!   Vbase: 2400
//! Conductor:
//!   - busses: ["650", "632"]
//!     r1: 0.301
//!     x1: 0.627
//!     length: 2000
//! Load:
//!   - bus: "632"
//!     csv: loads/632.csv
//! ```
//!
//! ## Error Handling
//!
//! All functions return `anyhow::Result` with the file and entity that failed
//! in the error context; errors from network assembly keep their
//! [`feeder_core::FeederError`] source.

use std::path::Path;

use anyhow::{Context, Result};
use feeder_core::{Diagnostics, Network};

pub mod load_series;
pub mod records;

pub use load_series::resolve_load_series;
pub use records::{load_records, records_from_json_str, records_from_yaml_str};

/// Read a network file, its load CSV files, and build the network.
pub fn load_network(path: &Path) -> Result<Network> {
    let mut diag = Diagnostics::new();
    load_network_with_diagnostics(path, &mut diag)
}

/// Like [`load_network`], collecting dropped loads and build statistics in
/// `diag`.
pub fn load_network_with_diagnostics(path: &Path, diag: &mut Diagnostics) -> Result<Network> {
    let mut records = load_records(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let resolved = resolve_load_series(&mut records, base_dir)?;
    if resolved > 0 {
        tracing::debug!(resolved, "read load series from csv");
    }
    Network::from_records_with_diagnostics(records, diag)
        .with_context(|| format!("building network from '{}'", path.display()))
}
