use crate::impedance::{Impedance, PhaseMatrix};
use crate::input::VoltageRegulatorInput;
use crate::{FeederError, FeederResult};

use super::{bus_pair, check_phase_model, check_phases, fill_diagonal_matrices, PhaseModel};

/// How a regulator sets the voltage of its second bus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegulatorControl {
    /// "Perfect" regulator: the regulated bus is fixed at this per-unit voltage.
    FixedVoltage(f64),
    /// Voltage across the regulator is scaled by this ratio.
    TurnRatio(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoltageRegulator {
    pub busses: (String, String),
    pub high_kv: Option<f64>,
    pub low_kv: Option<f64>,
    pub phases: Option<Vec<usize>>,
    pub resistance: Option<f64>,
    pub reactance: Option<f64>,
    pub rmatrix: Option<PhaseMatrix>,
    pub xmatrix: Option<PhaseMatrix>,
    pub control: RegulatorControl,
}

impl VoltageRegulator {
    /// Exactly one of `vreg_pu` and `turn_ratio` must be set.
    pub fn from_input(input: VoltageRegulatorInput, index: usize) -> FeederResult<Self> {
        let entity = format!("VoltageRegulator #{index}");
        let busses = bus_pair(&entity, input.busses)?;
        let entity = format!("VoltageRegulator {}-{}", busses.0, busses.1);
        let control = match (input.vreg_pu, input.turn_ratio) {
            (Some(v), None) => RegulatorControl::FixedVoltage(v),
            (None, Some(ratio)) => RegulatorControl::TurnRatio(ratio),
            (None, None) => {
                return Err(FeederError::validation(
                    &entity,
                    "one of vreg_pu or turn_ratio is required",
                ))
            }
            (Some(_), Some(_)) => {
                return Err(FeederError::validation(
                    &entity,
                    "vreg_pu and turn_ratio are mutually exclusive",
                ))
            }
        };
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
            control,
        })
    }

    fn entity(&self) -> String {
        format!("VoltageRegulator {}-{}", self.busses.0, self.busses.1)
    }

    pub fn vreg_pu(&self) -> Option<f64> {
        match self.control {
            RegulatorControl::FixedVoltage(v) => Some(v),
            RegulatorControl::TurnRatio(_) => None,
        }
    }

    pub fn turn_ratio(&self) -> Option<f64> {
        match self.control {
            RegulatorControl::TurnRatio(r) => Some(r),
            RegulatorControl::FixedVoltage(_) => None,
        }
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

/// Give multiphase regulators phase matrices from their scalar impedance.
/// Every regulator must have phases exactly when `model` is multiphase.
pub fn check_voltage_regulators(
    regulators: &mut [VoltageRegulator],
    model: PhaseModel,
) -> FeederResult<()> {
    for reg in regulators.iter_mut() {
        check_phase_model(&reg.entity(), reg.phases.as_deref(), model)?;
        if let Some((r, x)) =
            fill_diagonal_matrices(reg.phases.as_deref(), reg.resistance, reg.reactance)
        {
            reg.rmatrix = Some(r);
            reg.xmatrix = Some(x);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(vreg_pu: Option<f64>, turn_ratio: Option<f64>) -> VoltageRegulatorInput {
        VoltageRegulatorInput {
            busses: Some(vec!["2".into(), "3".into()]),
            vreg_pu,
            turn_ratio,
            ..VoltageRegulatorInput::default()
        }
    }

    #[test]
    fn regulator_without_setpoint_fails() {
        let err = VoltageRegulator::from_input(input(None, None), 0).unwrap_err();
        assert!(matches!(err, FeederError::Validation { .. }));
        assert!(err.to_string().contains("2-3"));
    }

    #[test]
    fn regulator_with_both_setpoints_fails() {
        assert!(VoltageRegulator::from_input(input(Some(1.05), Some(1.1)), 0).is_err());
    }

    #[test]
    fn regulator_control_is_exclusive() {
        let fixed = VoltageRegulator::from_input(input(Some(1.05), None), 0).unwrap();
        assert_eq!(fixed.vreg_pu(), Some(1.05));
        assert_eq!(fixed.turn_ratio(), None);

        let ratio = VoltageRegulator::from_input(input(None, Some(1.1)), 0).unwrap();
        assert_eq!(ratio.control, RegulatorControl::TurnRatio(1.1));
        assert_eq!(ratio.resistance().scalar(), Some(0.0));
    }

    #[test]
    fn multiphase_regulator_gets_matrices() {
        let mut rec = input(Some(1.0), None);
        rec.phases = Some(vec![1, 2]);
        rec.reactance = Some(0.01);
        let mut batch = vec![VoltageRegulator::from_input(rec, 0).unwrap()];
        check_voltage_regulators(&mut batch, PhaseModel::MultiPhase).unwrap();
        let x = batch[0].reactance();
        assert_eq!(x.matrix().unwrap().get(2, 2), 0.01);
        assert_eq!(x.matrix().unwrap().get(3, 3), 0.0);
    }

    #[test]
    fn single_phase_regulator_in_multiphase_network_fails() {
        let mut batch = vec![VoltageRegulator::from_input(input(Some(1.0), None), 0).unwrap()];
        let err = check_voltage_regulators(&mut batch, PhaseModel::MultiPhase).unwrap_err();
        assert!(matches!(err, FeederError::Validation { .. }));
        assert!(err.to_string().contains("VoltageRegulator 2-3"), "{err}");
        assert!(batch[0].rmatrix.is_none());

        check_voltage_regulators(&mut batch, PhaseModel::SinglePhase).unwrap();
        assert_eq!(batch[0].resistance().scalar(), Some(0.0));
    }
}
