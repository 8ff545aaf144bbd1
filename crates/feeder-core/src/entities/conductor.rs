use crate::impedance::{Impedance, PhaseMatrix};
use crate::input::ConductorInput;
use crate::{FeederError, FeederResult};

use super::{bus_pair, check_phases, PhaseModel};

/// A line segment between two busses.
///
/// Impedance inputs are per unit length: `r1`/`x1` for single-phase models;
/// sequence impedances (`r0`, `x0`, `r1`, `x1`) or phase matrices for
/// multiphase models. A conductor may name a `template` conductor to reuse its
/// per-length impedance with its own `length`.
#[derive(Debug, Clone, PartialEq)]
pub struct Conductor {
    pub name: Option<String>,
    pub busses: (String, String),
    pub phases: Option<Vec<usize>>,
    pub r0: Option<f64>,
    pub x0: Option<f64>,
    pub r1: Option<f64>,
    pub x1: Option<f64>,
    pub rmatrix: Option<PhaseMatrix>,
    pub xmatrix: Option<PhaseMatrix>,
    pub length: f64,
    pub template: Option<String>,
}

impl Conductor {
    /// Build a single-phase conductor from per-length impedance.
    pub fn single_phase(from: &str, to: &str, r1: f64, x1: f64, length: f64) -> Self {
        Self {
            name: None,
            busses: (from.to_string(), to.to_string()),
            phases: None,
            r0: None,
            x0: None,
            r1: Some(r1),
            x1: Some(x1),
            rmatrix: None,
            xmatrix: None,
            length,
            template: None,
        }
    }

    /// Check required fields of one record. `index` is its position in the batch.
    pub fn from_input(input: ConductorInput, index: usize) -> FeederResult<Self> {
        let entity = match &input.name {
            Some(name) => format!("Conductor '{name}'"),
            None => format!("Conductor #{index}"),
        };
        let busses = bus_pair(&entity, input.busses)?;
        let entity = format!("{entity} ({}-{})", busses.0, busses.1);

        let length = input
            .length
            .ok_or_else(|| FeederError::validation(&entity, "length is required"))?;
        if !length.is_finite() || length < 0.0 {
            return Err(FeederError::validation(
                &entity,
                format!("length must be a non-negative number, got {length}"),
            ));
        }

        let phases = check_phases(&entity, input.phases)?;
        let rmatrix = parse_matrix(&entity, "rmatrix", input.rmatrix, phases.as_deref())?;
        let xmatrix = parse_matrix(&entity, "xmatrix", input.xmatrix, phases.as_deref())?;

        Ok(Self {
            name: input.name,
            busses,
            phases,
            r0: input.r0,
            x0: input.x0,
            r1: input.r1,
            x1: input.x1,
            rmatrix,
            xmatrix,
            length,
            template: input.template,
        })
    }

    fn entity(&self) -> String {
        match &self.name {
            Some(name) => format!("Conductor '{}' ({}-{})", name, self.busses.0, self.busses.1),
            None => format!("Conductor {}-{}", self.busses.0, self.busses.1),
        }
    }

    /// Resistance per unit length: `r1` when single phase, else the phase matrix.
    pub fn resistance_per_length(&self) -> Impedance {
        match &self.phases {
            None => Impedance::Scalar(self.r1.unwrap_or(0.0)),
            Some(_) => Impedance::Matrix(self.rmatrix.clone().unwrap_or_else(PhaseMatrix::zeros)),
        }
    }

    /// Reactance per unit length: `x1` when single phase, else the phase matrix.
    pub fn reactance_per_length(&self) -> Impedance {
        match &self.phases {
            None => Impedance::Scalar(self.x1.unwrap_or(0.0)),
            Some(_) => Impedance::Matrix(self.xmatrix.clone().unwrap_or_else(PhaseMatrix::zeros)),
        }
    }

    /// Absolute resistance, `resistance_per_length * length`.
    pub fn resistance(&self) -> Impedance {
        self.resistance_per_length().scaled(self.length)
    }

    /// Absolute reactance, `reactance_per_length * length`.
    pub fn reactance(&self) -> Impedance {
        self.reactance_per_length().scaled(self.length)
    }

    /// Inherit every impedance field this conductor leaves unset. Matrices
    /// taken from the template keep only this conductor's phases, which must
    /// be among the template's.
    fn copy_impedance_from(&mut self, template: &Conductor) -> FeederResult<()> {
        if let (Some(own), Some(theirs)) = (&self.phases, &template.phases) {
            if let Some(p) = own.iter().find(|p| !theirs.contains(p)) {
                return Err(FeederError::validation(
                    self.entity(),
                    format!("phase {p} is not among the phases {theirs:?} of its template"),
                ));
            }
        }
        if self.phases.is_none() {
            self.phases = template.phases.clone();
        }
        self.r0 = self.r0.or(template.r0);
        self.x0 = self.x0.or(template.x0);
        self.r1 = self.r1.or(template.r1);
        self.x1 = self.x1.or(template.x1);

        let phases = self.phases.clone().unwrap_or_default();
        let inherit = |m: &Option<PhaseMatrix>| m.as_ref().map(|m| m.restricted_to(&phases));
        if self.rmatrix.is_none() {
            self.rmatrix = inherit(&template.rmatrix);
        }
        if self.xmatrix.is_none() {
            self.xmatrix = inherit(&template.xmatrix);
        }
        Ok(())
    }

    fn check_single_phase(&self) -> FeederResult<()> {
        if self.r1.is_none() || self.x1.is_none() {
            return Err(FeederError::validation(
                self.entity(),
                "single phase conductors need r1 and x1 (or a template)",
            ));
        }
        Ok(())
    }

    fn fill_phase_matrices(&mut self) -> FeederResult<()> {
        let Some(phases) = self.phases.clone() else {
            return Err(FeederError::validation(
                self.entity(),
                "phases are required when any conductor in the network has phases",
            ));
        };
        match (&self.rmatrix, &self.xmatrix) {
            (Some(_), Some(_)) => Ok(()),
            (None, None) => match (self.r0, self.x0, self.r1, self.x1) {
                (Some(r0), Some(x0), Some(r1), Some(x1)) => {
                    self.rmatrix = Some(PhaseMatrix::from_sequence(r0, r1, &phases));
                    self.xmatrix = Some(PhaseMatrix::from_sequence(x0, x1, &phases));
                    Ok(())
                }
                _ => Err(FeederError::validation(
                    self.entity(),
                    "multiphase conductors need rmatrix and xmatrix, or r0, x0, r1 and x1",
                )),
            },
            _ => Err(FeederError::validation(
                self.entity(),
                "rmatrix and xmatrix must be given together",
            )),
        }
    }
}

/// Length-weighted average of two per-length values.
fn weighted(a: f64, la: f64, b: f64, lb: f64) -> f64 {
    let total = la + lb;
    if total > 0.0 {
        (a * la + b * lb) / total
    } else {
        a
    }
}

impl Conductor {
    /// Equivalent conductor for `self` (i→j) followed by `next` (j→k): busses
    /// i→k, summed length, and per-length impedance averaged by length so the
    /// absolute impedance is the series sum.
    ///
    /// `None` when the phase lists differ.
    pub fn in_series(&self, next: &Conductor) -> Option<Conductor> {
        if self.phases != next.phases {
            return None;
        }
        let (la, lb) = (self.length, next.length);
        let both = |a: Option<f64>, b: Option<f64>| Some(weighted(a?, la, b?, lb));
        let matrix = |a: &Option<PhaseMatrix>, b: &Option<PhaseMatrix>| match (a, b) {
            (Some(a), Some(b)) => {
                let total = la + lb;
                if total > 0.0 {
                    Some(a.scaled(la / total).added(&b.scaled(lb / total)))
                } else {
                    Some(a.clone())
                }
            }
            _ => None,
        };
        Some(Conductor {
            name: None,
            busses: (self.busses.0.clone(), next.busses.1.clone()),
            phases: self.phases.clone(),
            r0: both(self.r0, next.r0),
            x0: both(self.x0, next.x0),
            r1: both(self.r1, next.r1),
            x1: both(self.x1, next.x1),
            rmatrix: matrix(&self.rmatrix, &next.rmatrix),
            xmatrix: matrix(&self.xmatrix, &next.xmatrix),
            length: la + lb,
            template: None,
        })
    }
}

fn parse_matrix(
    entity: &str,
    field: &str,
    rows: Option<Vec<Vec<f64>>>,
    phases: Option<&[usize]>,
) -> FeederResult<Option<PhaseMatrix>> {
    let Some(rows) = rows else {
        return Ok(None);
    };
    let phases = phases
        .ok_or_else(|| FeederError::validation(entity, format!("{field} requires phases")))?;
    PhaseMatrix::from_rows(&rows, phases)
        .map(Some)
        .map_err(|message| FeederError::validation(entity, format!("{field}: {message}")))
}

/// Resolve templates and impedances for a batch of conductors.
///
/// Templates must name a conductor that appears earlier in the batch. If no
/// conductor has phases the network is single phase and every conductor
/// needs `r1`/`x1`; otherwise every conductor gets its phase matrices, from
/// the sequence impedances when no matrices were given.
pub fn check_conductors(conductors: &mut [Conductor]) -> FeederResult<PhaseModel> {
    for i in 0..conductors.len() {
        let Some(template) = conductors[i].template.clone() else {
            continue;
        };
        let source = conductors[..i]
            .iter()
            .find(|c| c.name.as_deref() == Some(template.as_str()))
            .cloned()
            .ok_or_else(|| FeederError::unresolved(conductors[i].entity(), &template))?;
        conductors[i].copy_impedance_from(&source)?;
    }

    if conductors.iter().all(|c| c.phases.is_none()) {
        tracing::debug!(
            count = conductors.len(),
            "no conductor phases given; modeling network as single phase"
        );
        for conductor in conductors.iter() {
            conductor.check_single_phase()?;
        }
        return Ok(PhaseModel::SinglePhase);
    }

    for conductor in conductors.iter_mut() {
        conductor.fill_phase_matrices()?;
    }
    Ok(PhaseModel::MultiPhase)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(busses: [&str; 2], length: f64) -> ConductorInput {
        ConductorInput {
            busses: Some(busses.iter().map(|b| b.to_string()).collect()),
            length: Some(length),
            ..ConductorInput::default()
        }
    }

    #[test]
    fn missing_length_is_a_validation_error() {
        let mut input = record(["b1", "b2"], 1.0);
        input.length = None;
        let err = Conductor::from_input(input, 0).unwrap_err();
        assert!(matches!(err, FeederError::Validation { .. }));
        assert!(err.to_string().contains("length"));
    }

    #[test]
    fn template_copies_per_length_impedance() {
        let mut template = record(["b1", "b2"], 100.0);
        template.name = Some("cond1".into());
        template.r1 = Some(0.1);
        template.x1 = Some(0.2);
        let mut user = record(["b2", "b3"], 200.0);
        user.template = Some("cond1".into());

        let mut batch = vec![
            Conductor::from_input(template, 0).unwrap(),
            Conductor::from_input(user, 1).unwrap(),
        ];
        assert_eq!(check_conductors(&mut batch).unwrap(), PhaseModel::SinglePhase);

        let r_template = batch[0].resistance().scalar().unwrap();
        let r_user = batch[1].resistance().scalar().unwrap();
        assert!((r_user - r_template * 200.0 / 100.0).abs() < 1e-12);
        assert!((batch[1].reactance().scalar().unwrap() - 40.0).abs() < 1e-12);
    }

    #[test]
    fn unknown_or_later_template_is_unresolved() {
        let mut user = record(["b1", "b2"], 1.0);
        user.template = Some("cond9".into());
        let mut later = record(["b2", "b3"], 1.0);
        later.name = Some("cond9".into());
        later.r1 = Some(0.1);
        later.x1 = Some(0.1);

        let mut batch = vec![
            Conductor::from_input(user, 0).unwrap(),
            Conductor::from_input(later, 1).unwrap(),
        ];
        let err = check_conductors(&mut batch).unwrap_err();
        assert!(matches!(
            err,
            FeederError::UnresolvedReference { ref reference, .. } if reference == "cond9"
        ));
    }

    #[test]
    fn single_phase_conductor_needs_r1_and_x1() {
        let mut input = record(["b1", "b2"], 1.0);
        input.r1 = Some(0.1);
        let mut batch = vec![Conductor::from_input(input, 0).unwrap()];
        assert!(matches!(
            check_conductors(&mut batch),
            Err(FeederError::Validation { .. })
        ));
    }

    #[test]
    fn sequence_impedances_become_phase_matrices() {
        let mut input = record(["b1", "b2"], 100.0);
        input.phases = Some(vec![2, 3]);
        input.r0 = Some(0.766);
        input.x0 = Some(1.944);
        input.r1 = Some(0.301);
        input.x1 = Some(0.627);
        let mut batch = vec![Conductor::from_input(input, 0).unwrap()];
        assert_eq!(check_conductors(&mut batch).unwrap(), PhaseModel::MultiPhase);

        let r = batch[0].resistance();
        let m = r.matrix().unwrap();
        let zs = (0.766 + 2.0 * 0.301) / 3.0 * 100.0;
        let zm = (0.766 - 0.301) / 3.0 * 100.0;
        assert!((m.get(2, 2) - zs).abs() < 1e-9);
        assert!((m.get(3, 2) - zm).abs() < 1e-9);
        assert_eq!(m.get(1, 1), 0.0);
    }

    #[test]
    fn multiphase_batch_rejects_conductor_without_phases() {
        let mut with_phases = record(["b1", "b2"], 1.0);
        with_phases.phases = Some(vec![1]);
        with_phases.rmatrix = Some(vec![vec![0.3]]);
        with_phases.xmatrix = Some(vec![vec![0.6]]);
        let mut without = record(["b2", "b3"], 1.0);
        without.r1 = Some(0.1);
        without.x1 = Some(0.1);

        let mut batch = vec![
            Conductor::from_input(with_phases, 0).unwrap(),
            Conductor::from_input(without, 1).unwrap(),
        ];
        let err = check_conductors(&mut batch).unwrap_err();
        assert!(err.to_string().contains("phases are required"));
    }

    #[test]
    fn series_conductors_sum_impedance() {
        let a = Conductor::single_phase("b1", "b2", 0.1, 0.1, 100.0);
        let b = Conductor::single_phase("b2", "b3", 0.2, 0.1, 50.0);
        let merged = a.in_series(&b).unwrap();
        assert_eq!(merged.busses, ("b1".to_string(), "b3".to_string()));
        assert!((merged.length - 150.0).abs() < 1e-12);
        assert!((merged.resistance().scalar().unwrap() - 20.0).abs() < 1e-9);
        assert!((merged.reactance().scalar().unwrap() - 15.0).abs() < 1e-9);

        let mut c = Conductor::single_phase("b3", "b4", 0.1, 0.1, 1.0);
        c.phases = Some(vec![1]);
        assert!(b.in_series(&c).is_none());
    }

    #[test]
    fn series_phase_matrices_are_summed() {
        let mut a = Conductor::single_phase("b1", "b2", 0.0, 0.0, 2.0);
        a.phases = Some(vec![1, 2]);
        a.rmatrix = Some(PhaseMatrix::diagonal(1.0, &[1, 2]));
        a.xmatrix = Some(PhaseMatrix::diagonal(1.0, &[1, 2]));
        let mut b = a.clone();
        b.busses = ("b2".into(), "b3".into());
        b.length = 6.0;
        b.rmatrix = Some(PhaseMatrix::diagonal(3.0, &[1, 2]));
        let merged = a.in_series(&b).unwrap();
        let r = merged.resistance();
        assert!((r.matrix().unwrap().get(2, 2) - (2.0 + 18.0)).abs() < 1e-9);
        assert_eq!(r.matrix().unwrap().get(3, 3), 0.0);
    }

    fn three_phase_template() -> ConductorInput {
        let mut template = record(["b1", "b2"], 1.0);
        template.name = Some("abc".into());
        template.phases = Some(vec![1, 2, 3]);
        let rows = vec![vec![1.0], vec![0.5, 1.0], vec![0.5, 0.5, 1.0]];
        template.rmatrix = Some(rows.clone());
        template.xmatrix = Some(rows);
        template
    }

    #[test]
    fn template_matrices_keep_only_own_phases() {
        let mut user = record(["b2", "b3"], 2.0);
        user.template = Some("abc".into());
        user.phases = Some(vec![1, 2]);

        let mut batch = vec![
            Conductor::from_input(three_phase_template(), 0).unwrap(),
            Conductor::from_input(user, 1).unwrap(),
        ];
        check_conductors(&mut batch).unwrap();

        let r = batch[1].resistance();
        let m = r.matrix().unwrap();
        assert_eq!(m.get(1, 1), 2.0);
        assert_eq!(m.get(1, 2), 1.0);
        assert_eq!(m.get(3, 3), 0.0);
        assert_eq!(m.get(1, 3), 0.0);
        assert_eq!(batch[1].reactance().matrix().unwrap().get(2, 3), 0.0);
        // the template itself is untouched
        assert_eq!(batch[0].resistance().matrix().unwrap().get(3, 3), 1.0);
    }

    #[test]
    fn templated_phases_must_be_a_subset() {
        let mut template = three_phase_template();
        template.phases = Some(vec![1, 2]);
        template.rmatrix = Some(vec![vec![1.0], vec![0.5, 1.0]]);
        template.xmatrix = Some(vec![vec![1.0], vec![0.5, 1.0]]);
        let mut user = record(["b2", "b3"], 1.0);
        user.template = Some("abc".into());
        user.phases = Some(vec![2, 3]);

        let mut batch = vec![
            Conductor::from_input(template, 0).unwrap(),
            Conductor::from_input(user, 1).unwrap(),
        ];
        let err = check_conductors(&mut batch).unwrap_err();
        assert!(matches!(err, FeederError::Validation { .. }));
        assert!(err.to_string().contains("phase 3"));
    }

    #[test]
    fn matrix_without_phases_is_rejected() {
        let mut input = record(["b1", "b2"], 1.0);
        input.rmatrix = Some(vec![vec![0.3]]);
        assert!(Conductor::from_input(input, 0).is_err());
    }
}
