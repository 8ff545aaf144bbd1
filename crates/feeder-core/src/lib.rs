//! # feeder-core: Distribution Feeder Network Model
//!
//! Builds a typed, graph-based model of a (radial) power distribution feeder
//! from flat input records, and provides the queries and simplification
//! passes that power flow and optimal power flow models are written against.
//!
//! ## Design Philosophy
//!
//! Networks are modeled as **directed graphs** keyed by bus name where:
//! - **Vertices**: busses, each with its attached entities (load, shunt
//!   admittance, regulated terminal of a voltage regulator)
//! - **Edges**: conductors, transformers and voltage regulators, directed
//!   from the substation side to the load side
//!
//! At most one edge joins a pair of busses. Entities are validated once, when
//! the network is assembled; every lookup after that is by bus name.
//!
//! ## Quick Start
//!
//! ```rust
//! use feeder_core::input::{ConductorInput, InputRecords, LoadInput, NetworkInput};
//! use feeder_core::{LoadKind, Network};
//!
//! let line = |from: &str, to: &str, r1: f64, length: f64| ConductorInput {
//!     busses: Some(vec![from.into(), to.into()]),
//!     r1: Some(r1),
//!     x1: Some(0.1),
//!     length: Some(length),
//!     ..ConductorInput::default()
//! };
//!
//! let mut network = Network::from_records(InputRecords {
//!     network: Some(NetworkInput::with_substation("b1")),
//!     conductors: Some(vec![line("b1", "b2", 0.1, 100.0), line("b2", "b3", 0.2, 50.0)]),
//!     loads: vec![LoadInput {
//!         bus: Some("b3".into()),
//!         kws1: Some(vec![5.6]),
//!         ..LoadInput::default()
//!     }],
//!     ..InputRecords::default()
//! })?;
//!
//! assert_eq!(network.load_value("b3", LoadKind::Real, 2)?, vec![0.0]);
//!
//! // b2 only passes power through: merge b1-b2-b3 into one conductor
//! network.reduce_tree();
//! let r = feeder_core::rij("b1", "b3", &network)?.scalar().unwrap_or_default();
//! assert!((r - 20.0).abs() < 1e-9);
//! # Ok::<(), feeder_core::FeederError>(())
//! ```
//!
//! ## Modules
//!
//! - [`input`] - Raw input records as read from YAML/JSON
//! - [`entities`] - Typed edges and bus attachments
//! - [`impedance`] - Phase matrices and per-unit edge impedance
//! - [`topology`] - The bus graph
//! - [`graph_utils`] - Traversals and graph queries
//! - [`reduce`] - Bus merging and trimming passes
//! - [`diagnostics`] - Recoverable issues and build statistics
//!
//! File reading lives in the `feeder-io` crate.

pub mod builder;
pub mod diagnostics;
pub mod entities;
pub mod error;
pub mod graph_utils;
pub mod impedance;
pub mod input;
pub mod network;
pub mod reduce;
pub mod topology;

pub use builder::NetworkBuilder;
pub use diagnostics::{BuildStats, DiagnosticIssue, Diagnostics, Severity};
pub use entities::{
    BusAttachment, BusData, BusKind, Conductor, Edge, EdgeKind, Load, LoadKind, PhaseModel,
    RegulatorControl, RegulatorTerminal, ShuntAdmittance, Transformer, VoltageRegulator,
};
pub use error::{FeederError, FeederResult};
pub use graph_utils::*;
pub use impedance::{
    rij, rij_per_unit, xij, xij_per_unit, zij_per_unit, Impedance, PhaseMatrix, MAX_PHASES,
};
pub use input::{InputRecords, SourceVoltage};
pub use network::{Network, NetworkStats, VARIABLE_NAMES};
pub use petgraph::stable_graph::NodeIndex;
pub use topology::Topology;
