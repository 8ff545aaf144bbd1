//! The [`Network`] aggregate: the bus graph plus network-wide parameters.

use std::collections::HashMap;
use std::fmt;

use petgraph::Direction;
use serde::Serialize;

use crate::builder::NetworkBuilder;
use crate::diagnostics::Diagnostics;
use crate::entities::{BusData, BusKind, Conductor, Edge, EdgeKind, LoadKind, PhaseModel};
use crate::input::{InputRecords, SourceVoltage};
use crate::topology::Topology;
use crate::{graph_utils, FeederError, FeederResult};

/// Canonical decision-variable names used by models built on a [`Network`].
/// Results extraction looks variables up by these names, remapped through
/// [`Network::var_name_map`].
pub const VARIABLE_NAMES: &[&str] = &[
    "voltage_magnitude_squared",
    "voltage_angle",
    "current_magnitude_squared",
    "real_sending_end_power",
    "reactive_sending_end_power",
    "real_net_injection",
    "reactive_net_injection",
    "real_substation_power",
    "reactive_substation_power",
];

/// Distribution network model.
///
/// Build one with [`Network::from_records`]; the graph is then queried by bus
/// name and reshaped by the reduction passes in [`crate::reduce`].
#[derive(Debug, Clone)]
pub struct Network {
    pub graph: Topology,
    pub substation_bus: String,
    pub sbase: f64,
    pub vbase: f64,
    /// `vbase^2 / sbase`
    pub zbase: f64,
    pub v0: SourceVoltage,
    pub ntimesteps: usize,
    pub v_lolim: f64,
    pub v_uplim: f64,
    /// Custom model variable names keyed by an entry of [`VARIABLE_NAMES`]
    pub var_name_map: HashMap<String, String>,
    pub phase_model: PhaseModel,
}

impl Network {
    /// Assemble a network from input records.
    ///
    /// Requires a `Network` record with `substation_bus` and at least one
    /// `Conductor`. Loads without any power specification are dropped; use
    /// [`Network::from_records_with_diagnostics`] to see them.
    pub fn from_records(records: InputRecords) -> FeederResult<Self> {
        NetworkBuilder::new().build(records)
    }

    pub fn from_records_with_diagnostics(
        records: InputRecords,
        diag: &mut Diagnostics,
    ) -> FeederResult<Self> {
        NetworkBuilder::with_diagnostics(diag).build(records)
    }

    /// Attachments of a bus.
    pub fn bus(&self, bus: &str) -> FeederResult<&BusData> {
        self.graph
            .bus(bus)
            .ok_or_else(|| FeederError::NotFound(format!("bus '{bus}'")))
    }

    /// Edge joining busses `i` and `j`, in either direction.
    pub fn edge(&self, i: &str, j: &str) -> FeederResult<&Edge> {
        self.graph
            .edge_between(i, j)
            .ok_or_else(|| FeederError::NotFound(format!("edge between busses '{i}' and '{j}'")))
    }

    pub fn busses(&self) -> Vec<String> {
        self.graph.busses()
    }

    /// (from, to) bus names of every edge.
    pub fn edges(&self) -> Vec<(String, String)> {
        self.graph.edges()
    }

    pub fn edge_entities(&self) -> impl Iterator<Item = &Edge> {
        self.graph.edge_entities()
    }

    pub fn conductors(&self) -> impl Iterator<Item = &Conductor> {
        self.graph.edge_entities().filter_map(Edge::as_conductor)
    }

    fn busses_with(&self, keep: impl Fn(&BusData) -> bool) -> Vec<String> {
        self.graph
            .bus_data()
            .filter(|bus| keep(bus))
            .map(|bus| bus.name.clone())
            .collect()
    }

    pub fn load_busses(&self) -> Vec<String> {
        self.busses_with(|bus| bus.has(BusKind::Load))
    }

    /// Busses whose load has a non-zero real power value.
    pub fn real_load_busses(&self) -> Vec<String> {
        self.busses_with(|bus| bus.load().is_some_and(|load| load.has_real_power()))
    }

    pub fn voltage_regulator_busses(&self) -> Vec<String> {
        self.busses_with(|bus| bus.has(BusKind::VoltageRegulator))
    }

    pub fn shunt_busses(&self) -> Vec<String> {
        self.busses_with(|bus| bus.has(BusKind::ShuntAdmittance))
    }

    /// Load time series at `bus` for `phase` (1..=3; use 1 in single phase
    /// networks).
    ///
    /// A bus without a load, or a phase without a series, has no load: the
    /// result is `ntimesteps` zeros. Only an unknown bus is an error.
    pub fn load_value(&self, bus: &str, kind: LoadKind, phase: usize) -> FeederResult<Vec<f64>> {
        let series = self
            .bus(bus)?
            .load()
            .and_then(|load| load.series(kind, phase));
        Ok(series.unwrap_or_else(|| vec![0.0; self.ntimesteps]))
    }

    /// Model variable name for a canonical name, honoring `var_name_map`.
    pub fn variable_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.var_name_map
            .get(name)
            .map(String::as_str)
            .unwrap_or(name)
    }

    /// Get network statistics summary.
    pub fn stats(&self) -> NetworkStats {
        let mut stats = NetworkStats {
            num_busses: self.graph.bus_count(),
            num_edges: self.graph.edge_count(),
            ntimesteps: self.ntimesteps,
            ..NetworkStats::default()
        };

        for edge in self.graph.edge_entities() {
            match edge.kind() {
                EdgeKind::Conductor => stats.num_conductors += 1,
                EdgeKind::Transformer => stats.num_transformers += 1,
                EdgeKind::VoltageRegulator => stats.num_voltage_regulators += 1,
            }
        }

        for bus in self.graph.bus_data() {
            if bus.shunt().is_some() {
                stats.num_shunts += 1;
            }
            if let Some(load) = bus.load() {
                stats.num_loads += 1;
                for phase in 1..=crate::impedance::MAX_PHASES {
                    let sum = |kind| load.series(kind, phase).map_or(0.0, |s| s.iter().sum());
                    stats.total_kw += sum(LoadKind::Real);
                    stats.total_kvar += sum(LoadKind::Reactive);
                }
            }
        }

        stats
    }

    /// Validate the network for topology issues that break radial models.
    ///
    /// Populates the provided `Diagnostics` with any warnings/errors found.
    pub fn validate_into(&self, diag: &mut Diagnostics) {
        let stats = self.stats();

        if stats.num_busses == 0 {
            diag.add_error("structure", "Network has no busses");
            return;
        }

        let Some(source) = self.graph.index_of(&self.substation_bus) else {
            diag.add_error_with_entity(
                "structure",
                "substation bus is not in the graph",
                &self.substation_bus,
            );
            return;
        };

        if self.graph.degree_of(source, Direction::Incoming) > 0 {
            diag.add_error_with_entity(
                "structure",
                "substation bus has incoming edges",
                &self.substation_bus,
            );
        }

        for bus in graph_utils::busses_with_multiple_inneighbors(self) {
            diag.add_warning_with_entity(
                "topology",
                "bus has more than one inneighbor; the network is not radial",
                &bus,
            );
        }

        if let Ok(mut below) = graph_utils::all_outneighbors(self, &self.substation_bus) {
            below.push(self.substation_bus.clone());
            let reached: std::collections::HashSet<String> = below.into_iter().collect();
            for bus in self.graph.busses() {
                if !reached.contains(&bus) {
                    diag.add_warning_with_entity(
                        "topology",
                        "bus is not reachable from the substation",
                        &bus,
                    );
                }
            }
        }

        if stats.num_loads == 0 {
            diag.add_warning("structure", "Network has no loads");
        }
    }
}

/// Entity counts and load totals of a network.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NetworkStats {
    pub num_busses: usize,
    pub num_edges: usize,
    pub num_conductors: usize,
    pub num_transformers: usize,
    pub num_voltage_regulators: usize,
    pub num_loads: usize,
    pub num_shunts: usize,
    pub ntimesteps: usize,
    /// Real load summed over phases and time steps
    pub total_kw: f64,
    /// Reactive load summed over phases and time steps
    pub total_kvar: f64,
}

impl fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} busses, {} edges ({} conductors, {} transformers, {} regulators), {} loads ({:.1} kW over {} steps), {} shunts",
            self.num_busses,
            self.num_edges,
            self.num_conductors,
            self.num_transformers,
            self.num_voltage_regulators,
            self.num_loads,
            self.total_kw,
            self.ntimesteps,
            self.num_shunts
        )
    }
}
