//! Assembles a [`Network`] from [`InputRecords`].
//!
//! Each entity kind is first built from its records and checked as a batch
//! (templates, phase matrices, unusable loads), then edges go into the
//! topology and bus entities onto the busses the edges created. Every failure
//! aborts the build except a Load with no power specification, which is
//! dropped and reported through [`Diagnostics`].
//!
//! # Example
//! ```ignore
//! let mut diag = Diagnostics::new();
//! let network = NetworkBuilder::with_diagnostics(&mut diag).build(records)?;
//! println!("{}", diag.summary());
//! ```

use std::collections::HashMap;

use crate::diagnostics::{BuildStats, Diagnostics};
use crate::entities::{
    check_conductors, check_loads, check_transformers, check_voltage_regulators, BusAttachment,
    Conductor, Edge, Load, RegulatorTerminal, ShuntAdmittance, Transformer, VoltageRegulator,
};
use crate::input::InputRecords;
use crate::topology::Topology;
use crate::{FeederError, FeederResult, Network};

/// Builder for constructing a Network from input records.
///
/// Diagnostics tracking is optional; without it dropped loads are only
/// logged.
pub struct NetworkBuilder<'a> {
    diag: Option<&'a mut Diagnostics>,
}

impl Default for NetworkBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> NetworkBuilder<'a> {
    /// Create a new NetworkBuilder without diagnostics
    pub fn new() -> Self {
        Self { diag: None }
    }

    /// Create a new NetworkBuilder with diagnostics tracking
    pub fn with_diagnostics(diag: &'a mut Diagnostics) -> Self {
        Self { diag: Some(diag) }
    }

    pub fn build(self, records: InputRecords) -> FeederResult<Network> {
        let mut local = Diagnostics::new();
        let result = build_network(records, &mut local);
        if let Some(diag) = self.diag {
            diag.merge(local);
        }
        result
    }
}

fn build_network(records: InputRecords, diag: &mut Diagnostics) -> FeederResult<Network> {
    let params = records
        .network
        .ok_or_else(|| FeederError::MissingInput("Network".into()))?;
    let substation_bus = params
        .substation_bus
        .ok_or_else(|| FeederError::MissingInput("Network.substation_bus".into()))?;
    let conductor_records = records
        .conductors
        .filter(|c| !c.is_empty())
        .ok_or_else(|| FeederError::MissingInput("Conductor".into()))?;
    for (name, value) in [("Sbase", params.sbase), ("Vbase", params.vbase)] {
        if !(value.is_finite() && value > 0.0) {
            return Err(FeederError::validation(
                "Network",
                format!("{name} must be a positive number, got {value}"),
            ));
        }
    }

    let mut conductors = conductor_records
        .into_iter()
        .enumerate()
        .map(|(i, rec)| Conductor::from_input(rec, i))
        .collect::<FeederResult<Vec<_>>>()?;
    let phase_model = check_conductors(&mut conductors)?;

    let mut transformers = records
        .transformers
        .into_iter()
        .enumerate()
        .map(|(i, rec)| Transformer::from_input(rec, i))
        .collect::<FeederResult<Vec<_>>>()?;
    check_transformers(&mut transformers, phase_model)?;

    let mut regulators = records
        .voltage_regulators
        .into_iter()
        .enumerate()
        .map(|(i, rec)| VoltageRegulator::from_input(rec, i))
        .collect::<FeederResult<Vec<_>>>()?;
    check_voltage_regulators(&mut regulators, phase_model)?;

    let loads = records
        .loads
        .into_iter()
        .enumerate()
        .map(|(i, rec)| Load::from_input(rec, i))
        .collect::<FeederResult<Vec<_>>>()?;
    let total_loads = loads.len();
    let loads = check_loads(loads, diag);

    let shunts = records
        .shunt_admittances
        .into_iter()
        .enumerate()
        .map(|(i, rec)| ShuntAdmittance::from_input(rec, i))
        .collect::<FeederResult<Vec<_>>>()?;

    let mut stats = BuildStats {
        conductors: conductors.len(),
        transformers: transformers.len(),
        voltage_regulators: regulators.len(),
        loads: loads.len(),
        shunts: shunts.len(),
        dropped_loads: total_loads - loads.len(),
        ..BuildStats::default()
    };

    let mut graph = Topology::new();
    for conductor in conductors {
        graph.add_edge(Edge::Conductor(conductor))?;
    }
    for transformer in transformers {
        graph.add_edge(Edge::Transformer(transformer))?;
    }
    for regulator in regulators {
        let terminal = RegulatorTerminal {
            from_bus: regulator.busses.0.clone(),
            control: regulator.control,
        };
        let regulated = regulator.busses.1.clone();
        graph.add_edge(Edge::VoltageRegulator(regulator))?;
        attach(&mut graph, &regulated, BusAttachment::VoltageRegulator(terminal))?;
    }

    let ntimesteps = resolve_ntimesteps(&loads, params.ntimesteps)?;
    for load in loads {
        if let (true, Some(csv)) = (load.is_unresolved_csv(), &load.csv) {
            return Err(FeederError::unresolved(format!("Load {}", load.bus), csv.clone()));
        }
        let bus = load.bus.clone();
        attach(&mut graph, &bus, BusAttachment::Load(load))?;
    }
    for shunt in shunts {
        let bus = shunt.bus.clone();
        attach(&mut graph, &bus, BusAttachment::ShuntAdmittance(shunt))?;
    }

    if !graph.contains(&substation_bus) {
        return Err(FeederError::unresolved("Network.substation_bus", substation_bus));
    }
    if graph.in_degree(&substation_bus) > 0 {
        return Err(FeederError::structural(
            substation_bus,
            "substation bus must have no incoming edges",
        ));
    }

    stats.busses = graph.bus_count();
    tracing::info!(
        substation = %substation_bus,
        ntimesteps,
        ?phase_model,
        "assembled network: {stats}"
    );
    diag.stats = Some(stats);

    Ok(Network {
        graph,
        substation_bus,
        sbase: params.sbase,
        vbase: params.vbase,
        zbase: params.vbase * params.vbase / params.sbase,
        v0: params.v0,
        ntimesteps,
        v_lolim: params.v_lolim,
        v_uplim: params.v_uplim,
        var_name_map: HashMap::new(),
        phase_model,
    })
}

/// Attach to a bus some edge already created.
fn attach(graph: &mut Topology, bus: &str, attachment: BusAttachment) -> FeederResult<()> {
    let kind = attachment.kind();
    match graph.bus_mut(bus) {
        Some(data) => data.attach(attachment),
        None => Err(FeederError::unresolved(format!("{kind:?} at bus {bus}"), bus)),
    }
}

/// Every load series has the same length, which becomes the number of time
/// steps (1 when no load has a series). A `Ntimesteps` given in the Network
/// record must agree.
fn resolve_ntimesteps(loads: &[Load], declared: Option<usize>) -> FeederResult<usize> {
    let mut found: Option<(usize, &str)> = None;
    for load in loads {
        let Some(len) = load.series_len()? else {
            continue;
        };
        match found {
            None => found = Some((len, load.bus.as_str())),
            Some((n, first)) if n != len => {
                return Err(FeederError::validation(
                    format!("Load {}", load.bus),
                    format!("has {len} time steps but Load {first} has {n}"),
                ))
            }
            Some(_) => {}
        }
    }
    match (found, declared) {
        (Some((n, _)), Some(d)) if n != d => Err(FeederError::validation(
            "Network",
            format!("Ntimesteps is {d} but the load series have {n} values"),
        )),
        (Some((n, _)), _) => Ok(n),
        (None, Some(d)) => Ok(d),
        (None, None) => Ok(1),
    }
}
