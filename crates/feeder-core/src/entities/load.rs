use serde::Serialize;

use crate::diagnostics::Diagnostics;
use crate::impedance::MAX_PHASES;
use crate::input::LoadInput;
use crate::{FeederError, FeederResult};

/// Real (`kws`) or reactive (`kvars`) load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadKind {
    Real,
    Reactive,
}

/// Time series load at one bus, per phase.
///
/// A usable load gives at least one of: a real power series (optionally
/// with a reactive series or a `q_to_p` ratio) or a `csv` time series
/// reference. Series always hold one value per time step, even for a single
/// time step.
#[derive(Debug, Clone, PartialEq)]
pub struct Load {
    pub bus: String,
    pub kws: [Option<Vec<f64>>; MAX_PHASES],
    pub kvars: [Option<Vec<f64>>; MAX_PHASES],
    pub q_to_p: Option<f64>,
    pub csv: Option<String>,
}

impl Load {
    pub fn from_input(input: LoadInput, index: usize) -> FeederResult<Self> {
        let bus = input.bus.ok_or_else(|| {
            FeederError::validation(format!("Load #{index}"), "bus is required")
        })?;
        Ok(Self {
            bus,
            kws: [input.kws1, input.kws2, input.kws3],
            kvars: [input.kvars1, input.kvars2, input.kvars3],
            q_to_p: input.q_to_p,
            csv: input.csv,
        })
    }

    /// True when the load has one of the accepted specification shapes.
    pub fn is_defined(&self) -> bool {
        self.kws.iter().any(Option::is_some) || self.csv.is_some()
    }

    /// True when power comes only from an external series not yet read in.
    pub fn is_unresolved_csv(&self) -> bool {
        self.csv.is_some() && self.kws.iter().all(Option::is_none)
    }

    /// Series for a phase (1..=3). Reactive power falls back to
    /// `kws * q_to_p` when no `kvars` series is given.
    pub fn series(&self, kind: LoadKind, phase: usize) -> Option<Vec<f64>> {
        if !(1..=MAX_PHASES).contains(&phase) {
            return None;
        }
        let k = phase - 1;
        match kind {
            LoadKind::Real => self.kws[k].clone(),
            LoadKind::Reactive => self.kvars[k].clone().or_else(|| {
                let ratio = self.q_to_p?;
                self.kws[k]
                    .as_ref()
                    .map(|kws| kws.iter().map(|p| p * ratio).collect())
            }),
        }
    }

    /// Number of time steps, if the load has any series. All series of one
    /// load must have the same length.
    pub fn series_len(&self) -> FeederResult<Option<usize>> {
        let mut len = None;
        for series in self.kws.iter().chain(self.kvars.iter()).flatten() {
            match len {
                None => len = Some(series.len()),
                Some(n) if n != series.len() => {
                    return Err(FeederError::validation(
                        format!("Load {}", self.bus),
                        format!("series lengths differ ({} and {})", n, series.len()),
                    ))
                }
                Some(_) => {}
            }
        }
        Ok(len)
    }

    /// True when any real power value is non-zero.
    pub fn has_real_power(&self) -> bool {
        self.kws.iter().flatten().flatten().any(|p| *p != 0.0)
    }

    /// Phases (1..=3) with a real power series.
    pub fn phases(&self) -> Vec<usize> {
        (1..=MAX_PHASES)
            .filter(|p| self.kws[p - 1].is_some())
            .collect()
    }
}

/// Drop loads that have no way to define their power, recording a warning
/// for each. One malformed load does not abort the network build.
pub fn check_loads(loads: Vec<Load>, diag: &mut Diagnostics) -> Vec<Load> {
    loads
        .into_iter()
        .filter(|load| {
            if load.is_defined() {
                return true;
            }
            tracing::warn!(bus = %load.bus, "load has no kws, q_to_p or csv; dropping it");
            diag.add_warning_with_entity(
                "load",
                "no kws, kws with kvars or q_to_p, or csv given; load dropped",
                &format!("Load {}", load.bus),
            );
            false
        })
        .collect()
}
