//! Typed network entities.
//!
//! Edges ([`Edge`]) are two-terminal power transfer devices: conductors,
//! transformers and voltage regulators. Bus attachments ([`BusAttachment`])
//! live on a bus: loads, shunt admittances and the regulated terminal of a
//! voltage regulator. Each kind is built from its raw input record and then
//! checked as a batch (template resolution, multiphase matrices, dropping
//! unusable loads) before it is placed in the topology.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::impedance::{Impedance, PhaseMatrix, MAX_PHASES};
use crate::{FeederError, FeederResult};

mod conductor;
mod load;
mod regulator;
mod shunt;
mod transformer;

pub use conductor::{check_conductors, Conductor};
pub use load::{check_loads, Load, LoadKind};
pub use regulator::{check_voltage_regulators, RegulatorControl, VoltageRegulator};
pub use shunt::ShuntAdmittance;
pub use transformer::{check_transformers, Transformer};

/// Whether a network is modeled per phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PhaseModel {
    SinglePhase,
    MultiPhase,
}

/// Edge kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum EdgeKind {
    Conductor,
    Transformer,
    VoltageRegulator,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Conductor => "Conductor",
            EdgeKind::Transformer => "Transformer",
            EdgeKind::VoltageRegulator => "VoltageRegulator",
        }
    }
}

/// A device connecting two busses. Exactly one per bus pair.
#[derive(Debug, Clone, PartialEq)]
pub enum Edge {
    Conductor(Conductor),
    Transformer(Transformer),
    VoltageRegulator(VoltageRegulator),
}

impl Edge {
    pub fn kind(&self) -> EdgeKind {
        match self {
            Edge::Conductor(_) => EdgeKind::Conductor,
            Edge::Transformer(_) => EdgeKind::Transformer,
            Edge::VoltageRegulator(_) => EdgeKind::VoltageRegulator,
        }
    }

    /// (from, to) busses; the direction is the power flow reference direction.
    pub fn busses(&self) -> (&str, &str) {
        let (a, b) = match self {
            Edge::Conductor(c) => &c.busses,
            Edge::Transformer(t) => &t.busses,
            Edge::VoltageRegulator(v) => &v.busses,
        };
        (a.as_str(), b.as_str())
    }

    pub fn phases(&self) -> Option<&[usize]> {
        match self {
            Edge::Conductor(c) => c.phases.as_deref(),
            Edge::Transformer(t) => t.phases.as_deref(),
            Edge::VoltageRegulator(v) => v.phases.as_deref(),
        }
    }

    /// Absolute series resistance (user units).
    pub fn resistance(&self) -> Impedance {
        match self {
            Edge::Conductor(c) => c.resistance(),
            Edge::Transformer(t) => t.resistance(),
            Edge::VoltageRegulator(v) => v.resistance(),
        }
    }

    /// Absolute series reactance (user units).
    pub fn reactance(&self) -> Impedance {
        match self {
            Edge::Conductor(c) => c.reactance(),
            Edge::Transformer(t) => t.reactance(),
            Edge::VoltageRegulator(v) => v.reactance(),
        }
    }

    pub fn resistance_per_unit(&self, zbase: f64) -> Impedance {
        self.resistance().scaled(1.0 / zbase)
    }

    pub fn reactance_per_unit(&self, zbase: f64) -> Impedance {
        self.reactance().scaled(1.0 / zbase)
    }

    pub fn as_conductor(&self) -> Option<&Conductor> {
        match self {
            Edge::Conductor(c) => Some(c),
            _ => None,
        }
    }

    /// Human-readable label, e.g. "Conductor b1-b2".
    pub fn label(&self) -> String {
        let (a, b) = self.busses();
        format!("{} {}-{}", self.kind().as_str(), a, b)
    }
}

/// Bus attachment kind tag; the key of a bus's attachment map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum BusKind {
    Load,
    ShuntAdmittance,
    VoltageRegulator,
}

/// The regulated side of a voltage regulator, stored on its second bus.
#[derive(Debug, Clone, PartialEq)]
pub struct RegulatorTerminal {
    /// Bus on the source side of the regulator
    pub from_bus: String,
    pub control: RegulatorControl,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BusAttachment {
    Load(Load),
    ShuntAdmittance(ShuntAdmittance),
    VoltageRegulator(RegulatorTerminal),
}

impl BusAttachment {
    pub fn kind(&self) -> BusKind {
        match self {
            BusAttachment::Load(_) => BusKind::Load,
            BusAttachment::ShuntAdmittance(_) => BusKind::ShuntAdmittance,
            BusAttachment::VoltageRegulator(_) => BusKind::VoltageRegulator,
        }
    }
}

/// Vertex weight: the bus name and what is attached to it.
#[derive(Debug, Clone, PartialEq)]
pub struct BusData {
    pub name: String,
    pub attachments: BTreeMap<BusKind, BusAttachment>,
}

impl BusData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attachments: BTreeMap::new(),
        }
    }

    pub fn load(&self) -> Option<&Load> {
        match self.attachments.get(&BusKind::Load) {
            Some(BusAttachment::Load(load)) => Some(load),
            _ => None,
        }
    }

    pub fn shunt(&self) -> Option<&ShuntAdmittance> {
        match self.attachments.get(&BusKind::ShuntAdmittance) {
            Some(BusAttachment::ShuntAdmittance(shunt)) => Some(shunt),
            _ => None,
        }
    }

    pub fn regulator(&self) -> Option<&RegulatorTerminal> {
        match self.attachments.get(&BusKind::VoltageRegulator) {
            Some(BusAttachment::VoltageRegulator(terminal)) => Some(terminal),
            _ => None,
        }
    }

    pub fn has(&self, kind: BusKind) -> bool {
        self.attachments.contains_key(&kind)
    }

    /// True when nothing is attached; such a bus may be merged or trimmed.
    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty()
    }

    /// Attach an entity. Fails if the bus already carries one of that kind.
    pub fn attach(&mut self, attachment: BusAttachment) -> FeederResult<()> {
        let kind = attachment.kind();
        if self.attachments.contains_key(&kind) {
            return Err(FeederError::validation(
                format!("{:?} at bus {}", kind, self.name),
                "only one entity of each kind may be attached to a bus",
            ));
        }
        self.attachments.insert(kind, attachment);
        Ok(())
    }
}

/// Validate a two-bus reference and return it as an ordered pair.
pub(crate) fn bus_pair(entity: &str, busses: Option<Vec<String>>) -> FeederResult<(String, String)> {
    let busses = busses.ok_or_else(|| FeederError::validation(entity, "busses is required"))?;
    match <[String; 2]>::try_from(busses) {
        Ok([a, b]) if a != b => Ok((a, b)),
        Ok([a, _]) => Err(FeederError::validation(
            entity,
            format!("busses must be two distinct busses, got '{a}' twice"),
        )),
        Err(busses) => Err(FeederError::validation(
            entity,
            format!("busses must name exactly two busses, got {}", busses.len()),
        )),
    }
}

/// Phase lists hold distinct phase numbers in 1..=3.
pub(crate) fn check_phases(entity: &str, phases: Option<Vec<usize>>) -> FeederResult<Option<Vec<usize>>> {
    let Some(phases) = phases else {
        return Ok(None);
    };
    if phases.is_empty() || phases.len() > MAX_PHASES {
        return Err(FeederError::validation(
            entity,
            format!("phases must list 1 to {MAX_PHASES} phases"),
        ));
    }
    for (k, &p) in phases.iter().enumerate() {
        if !(1..=MAX_PHASES).contains(&p) {
            return Err(FeederError::validation(
                entity,
                format!("phase {p} is outside 1..={MAX_PHASES}"),
            ));
        }
        if phases[..k].contains(&p) {
            return Err(FeederError::validation(entity, format!("phase {p} is repeated")));
        }
    }
    Ok(Some(phases))
}

/// Phases of a transformer-like edge must agree with the conductors: set in a
/// multiphase network, unset in a single phase one.
pub(crate) fn check_phase_model(
    entity: &str,
    phases: Option<&[usize]>,
    model: PhaseModel,
) -> FeederResult<()> {
    match (model, phases) {
        (PhaseModel::MultiPhase, None) => Err(FeederError::validation(
            entity,
            "phases are required when any conductor in the network has phases",
        )),
        (PhaseModel::SinglePhase, Some(_)) => Err(FeederError::validation(
            entity,
            "phases are set but no conductor has phases; the network is single phase",
        )),
        _ => Ok(()),
    }
}

/// Give a transformer-like edge diagonal phase matrices built from its
/// scalar impedance when it has phases and no explicit matrices.
pub(crate) fn fill_diagonal_matrices(
    phases: Option<&[usize]>,
    resistance: Option<f64>,
    reactance: Option<f64>,
) -> Option<(PhaseMatrix, PhaseMatrix)> {
    phases.map(|phases| {
        (
            PhaseMatrix::diagonal(resistance.unwrap_or(0.0), phases),
            PhaseMatrix::diagonal(reactance.unwrap_or(0.0), phases),
        )
    })
}
