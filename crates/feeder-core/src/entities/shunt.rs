use crate::input::ShuntAdmittanceInput;
use crate::{FeederError, FeederResult};

/// Shunt admittance to ground at a bus
#[derive(Debug, Clone, PartialEq)]
pub struct ShuntAdmittance {
    pub bus: String,
    /// Conductance in siemens
    pub g: f64,
    /// Susceptance in siemens
    pub b: f64,
}

impl ShuntAdmittance {
    pub fn from_input(input: ShuntAdmittanceInput, index: usize) -> FeederResult<Self> {
        let entity = match &input.bus {
            Some(bus) => format!("ShuntAdmittance {bus}"),
            None => format!("ShuntAdmittance #{index}"),
        };
        let missing = |field: &str| FeederError::validation(&entity, format!("{field} is required"));
        Ok(Self {
            bus: input.bus.clone().ok_or_else(|| missing("bus"))?,
            g: input.g.ok_or_else(|| missing("g"))?,
            b: input.b.ok_or_else(|| missing("b"))?,
        })
    }

    /// Admittance normalized by the admittance base `1 / Zbase`.
    pub fn per_unit(&self, zbase: f64) -> (f64, f64) {
        (self.g * zbase, self.b * zbase)
    }
}
