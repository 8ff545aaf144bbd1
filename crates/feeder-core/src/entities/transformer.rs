use crate::impedance::{Impedance, PhaseMatrix};
use crate::input::TransformerInput;
use crate::FeederResult;

use super::{bus_pair, check_phase_model, check_phases, fill_diagonal_matrices, PhaseModel};

/// Two-winding transformer.
///
/// `high_kv`/`low_kv` are kept for reference only; models built on the
/// network work in per-unit voltage. Series impedance is zero unless given.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformer {
    pub busses: (String, String),
    pub high_kv: Option<f64>,
    pub low_kv: Option<f64>,
    pub phases: Option<Vec<usize>>,
    pub resistance: Option<f64>,
    pub reactance: Option<f64>,
    pub rmatrix: Option<PhaseMatrix>,
    pub xmatrix: Option<PhaseMatrix>,
}

impl Transformer {
    pub fn from_input(input: TransformerInput, index: usize) -> FeederResult<Self> {
        let entity = format!("Transformer #{index}");
        let busses = bus_pair(&entity, input.busses)?;
        let entity = format!("Transformer {}-{}", busses.0, busses.1);
        let phases = check_phases(&entity, input.phases)?;
        Ok(Self {
            busses,
            high_kv: input.high_kv,
            low_kv: input.low_kv,
            phases,
            resistance: input.resistance,
            reactance: input.reactance,
            rmatrix: None,
            xmatrix: None,
        })
    }

    fn entity(&self) -> String {
        format!("Transformer {}-{}", self.busses.0, self.busses.1)
    }

    pub fn resistance(&self) -> Impedance {
        match &self.rmatrix {
            Some(m) => Impedance::Matrix(m.clone()),
            None => Impedance::Scalar(self.resistance.unwrap_or(0.0)),
        }
    }

    pub fn reactance(&self) -> Impedance {
        match &self.xmatrix {
            Some(m) => Impedance::Matrix(m.clone()),
            None => Impedance::Scalar(self.reactance.unwrap_or(0.0)),
        }
    }
}

/// Fill phase matrices of multiphase transformers, assuming zero mutual
/// impedance. Every transformer must have phases exactly when `model` is
/// multiphase.
pub fn check_transformers(transformers: &mut [Transformer], model: PhaseModel) -> FeederResult<()> {
    for t in transformers.iter_mut() {
        check_phase_model(&t.entity(), t.phases.as_deref(), model)?;
        if let Some((r, x)) = fill_diagonal_matrices(t.phases.as_deref(), t.resistance, t.reactance)
        {
            t.rmatrix = Some(r);
            t.xmatrix = Some(x);
        }
    }
    Ok(())
}
