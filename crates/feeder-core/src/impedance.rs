//! Series impedance of network edges.
//!
//! Single-phase edges carry scalar resistance/reactance. Multiphase edges
//! carry 3x3 phase-impedance matrices indexed by phase number (1, 2, 3);
//! rows and columns of phases an edge does not have stay zero.
//!
//! ## Symmetrical conductors
//!
//! When only the zero and positive sequence impedances are known, the
//! phase-impedance matrix is
//!
//! ```text
//! z_abc = | z_s  z_m  z_m |     z_s = (z_0 + 2 z_1) / 3
//!         | z_m  z_s  z_m |     z_m = (z_0 - z_1) / 3
//!         | z_m  z_m  z_s |
//! ```
//!
//! restricted to the conductor's phases. A conductor with a single phase
//! takes the positive sequence impedance directly.
//!
//! ## Per-unit values
//!
//! `rij_per_unit` and friends divide by the network impedance base
//! `Zbase = Vbase^2 / Sbase`.

use faer::Mat;

use crate::{Edge, FeederError, FeederResult, Network};

/// Number of phases a distribution edge can carry.
pub const MAX_PHASES: usize = 3;

/// Symmetric 3x3 phase-impedance matrix, indexed by 1-based phase number.
///
/// Methods taking phase numbers panic on a phase outside `1..=MAX_PHASES`.
/// Phase lists read from input are checked before they reach this type.
#[derive(Debug, Clone)]
pub struct PhaseMatrix(Mat<f64>);

/// Zero-based row of `phase`.
fn slot(phase: usize) -> usize {
    assert!(
        (1..=MAX_PHASES).contains(&phase),
        "phase {phase} is outside 1..={MAX_PHASES}"
    );
    phase - 1
}

impl PhaseMatrix {
    pub fn zeros() -> Self {
        Self(Mat::zeros(MAX_PHASES, MAX_PHASES))
    }

    /// Entry for phases `i`, `j` (1-based).
    ///
    /// # Panics
    ///
    /// If `i` or `j` is not a phase number.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.0.read(slot(i), slot(j))
    }

    /// Set entries (i, j) and (j, i).
    ///
    /// # Panics
    ///
    /// If `i` or `j` is not a phase number.
    pub fn set_symmetric(&mut self, i: usize, j: usize, value: f64) {
        let (a, b) = (slot(i), slot(j));
        self.0.write(a, b, value);
        self.0.write(b, a, value);
    }

    /// Phase matrix of a symmetrical component (sequence) specification.
    ///
    /// # Panics
    ///
    /// If `phases` holds something other than phase numbers.
    pub fn from_sequence(z0: f64, z1: f64, phases: &[usize]) -> Self {
        let mut m = Self::zeros();
        if let [phase] = phases {
            m.set_symmetric(*phase, *phase, z1);
            return m;
        }
        let (zs, zm) = sequence_to_phase(z0, z1);
        for &i in phases {
            for &j in phases {
                m.set_symmetric(i, j, if i == j { zs } else { zm });
            }
        }
        m
    }

    /// Diagonal matrix with `value` on every active phase (no mutual impedance).
    ///
    /// # Panics
    ///
    /// If `phases` holds something other than phase numbers.
    pub fn diagonal(value: f64, phases: &[usize]) -> Self {
        let mut m = Self::zeros();
        for &p in phases {
            m.set_symmetric(p, p, value);
        }
        m
    }

    /// Copy with the rows and columns of phases outside `phases` zeroed.
    pub fn restricted_to(&self, phases: &[usize]) -> Self {
        let active = |k: usize| phases.contains(&(k + 1));
        Self(Mat::from_fn(MAX_PHASES, MAX_PHASES, |i, j| {
            if active(i) && active(j) {
                self.0.read(i, j)
            } else {
                0.0
            }
        }))
    }

    /// Expand user rows into the phase-indexed matrix.
    ///
    /// `rows` follows the order of `phases` and is either the lower triangle
    /// (row k has k + 1 entries) or the full square.
    pub fn from_rows(rows: &[Vec<f64>], phases: &[usize]) -> Result<Self, String> {
        let n = phases.len();
        if rows.len() != n {
            return Err(format!(
                "matrix has {} rows but {} phases are given",
                rows.len(),
                n
            ));
        }
        let lower = rows.iter().enumerate().all(|(k, row)| row.len() == k + 1);
        let square = rows.iter().all(|row| row.len() == n);
        if !lower && !square {
            return Err("matrix rows must form a lower triangle or a square".to_string());
        }
        if square && n > 1 {
            for a in 0..n {
                for b in 0..a {
                    if rows[a][b] != rows[b][a] {
                        return Err(format!(
                            "square matrix is not symmetric: entries ({}, {}) and ({}, {}) differ",
                            a + 1,
                            b + 1,
                            b + 1,
                            a + 1
                        ));
                    }
                }
            }
        }

        let mut m = Self::zeros();
        for (a, row) in rows.iter().enumerate() {
            for (b, &value) in row.iter().enumerate().take(a + 1) {
                m.set_symmetric(phases[a], phases[b], value);
            }
        }
        Ok(m)
    }

    /// Square matrix over the active phases only, in the order given.
    pub fn restricted(&self, phases: &[usize]) -> Vec<Vec<f64>> {
        phases
            .iter()
            .map(|&i| phases.iter().map(|&j| self.get(i, j)).collect())
            .collect()
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self(Mat::from_fn(MAX_PHASES, MAX_PHASES, |i, j| {
            self.0.read(i, j) * factor
        }))
    }

    pub fn added(&self, other: &PhaseMatrix) -> Self {
        Self(Mat::from_fn(MAX_PHASES, MAX_PHASES, |i, j| {
            self.0.read(i, j) + other.0.read(i, j)
        }))
    }

    pub fn approx_eq(&self, other: &PhaseMatrix, tol: f64) -> bool {
        (1..=MAX_PHASES)
            .all(|i| (1..=MAX_PHASES).all(|j| (self.get(i, j) - other.get(i, j)).abs() <= tol))
    }
}

impl PartialEq for PhaseMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.approx_eq(other, 0.0)
    }
}

/// Self and mutual impedance from zero and positive sequence impedance.
pub fn sequence_to_phase(z0: f64, z1: f64) -> (f64, f64) {
    ((z0 + 2.0 * z1) / 3.0, (z0 - z1) / 3.0)
}

/// Resistance or reactance of an edge: a scalar for single-phase edges, a
/// phase matrix for multiphase edges.
#[derive(Debug, Clone, PartialEq)]
pub enum Impedance {
    Scalar(f64),
    Matrix(PhaseMatrix),
}

impl Impedance {
    pub fn scalar(&self) -> Option<f64> {
        match self {
            Impedance::Scalar(v) => Some(*v),
            Impedance::Matrix(_) => None,
        }
    }

    pub fn matrix(&self) -> Option<&PhaseMatrix> {
        match self {
            Impedance::Scalar(_) => None,
            Impedance::Matrix(m) => Some(m),
        }
    }

    pub fn scaled(&self, factor: f64) -> Impedance {
        match self {
            Impedance::Scalar(v) => Impedance::Scalar(v * factor),
            Impedance::Matrix(m) => Impedance::Matrix(m.scaled(factor)),
        }
    }
}

fn edge_at<'a>(i: &str, j: &str, net: &'a Network) -> FeederResult<&'a Edge> {
    net.edge(i, j)
}

/// Resistance of edge i-j
pub fn rij(i: &str, j: &str, net: &Network) -> FeederResult<Impedance> {
    Ok(edge_at(i, j, net)?.resistance())
}

/// Reactance of edge i-j
pub fn xij(i: &str, j: &str, net: &Network) -> FeederResult<Impedance> {
    Ok(edge_at(i, j, net)?.reactance())
}

/// Resistance of edge i-j normalized by the network Zbase
pub fn rij_per_unit(i: &str, j: &str, net: &Network) -> FeederResult<Impedance> {
    Ok(rij(i, j, net)?.scaled(1.0 / net.zbase))
}

/// Reactance of edge i-j normalized by the network Zbase
pub fn xij_per_unit(i: &str, j: &str, net: &Network) -> FeederResult<Impedance> {
    Ok(xij(i, j, net)?.scaled(1.0 / net.zbase))
}

/// Per-unit (r, x) of a single-phase edge i-j.
pub fn zij_per_unit(i: &str, j: &str, net: &Network) -> FeederResult<(f64, f64)> {
    let r = rij_per_unit(i, j, net)?;
    let x = xij_per_unit(i, j, net)?;
    match (r.scalar(), x.scalar()) {
        (Some(r), Some(x)) => Ok((r, x)),
        _ => Err(FeederError::NotFound(format!(
            "scalar impedance for multiphase edge {i}-{j}; use rij_per_unit/xij_per_unit"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_expansion_fills_self_and_mutual_terms() {
        let m = PhaseMatrix::from_sequence(0.766, 0.301, &[1, 2, 3]);
        let zs = (0.766 + 2.0 * 0.301) / 3.0;
        let zm = (0.766 - 0.301) / 3.0;
        for i in 1..=3 {
            for j in 1..=3 {
                let expected = if i == j { zs } else { zm };
                assert!((m.get(i, j) - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn sequence_expansion_restricts_to_active_phases() {
        let m = PhaseMatrix::from_sequence(0.9, 0.3, &[2, 3]);
        assert_eq!(m.get(1, 1), 0.0);
        assert_eq!(m.get(1, 2), 0.0);
        assert!((m.get(2, 2) - 0.5).abs() < 1e-12);
        assert!((m.get(2, 3) - 0.2).abs() < 1e-12);
        assert_eq!(m.restricted(&[2, 3]).len(), 2);

        let single = PhaseMatrix::from_sequence(0.9, 0.3, &[2]);
        assert_eq!(single.restricted(&[2]), vec![vec![0.3]]);
    }

    #[test]
    fn lower_triangle_rows_follow_phase_order() {
        let rows = vec![vec![0.31], vec![0.15, 0.32]];
        let m = PhaseMatrix::from_rows(&rows, &[1, 3]).unwrap();
        assert_eq!(m.get(1, 1), 0.31);
        assert_eq!(m.get(1, 3), 0.15);
        assert_eq!(m.get(3, 1), 0.15);
        assert_eq!(m.get(3, 3), 0.32);
        assert_eq!(m.get(2, 2), 0.0);

        let full = vec![vec![0.31, 0.15], vec![0.15, 0.32]];
        assert_eq!(PhaseMatrix::from_rows(&full, &[1, 3]).unwrap(), m);

        assert!(PhaseMatrix::from_rows(&rows, &[1, 2, 3]).is_err());
        assert!(PhaseMatrix::from_rows(&[vec![1.0, 2.0, 3.0], vec![1.0]], &[1, 2]).is_err());
    }

    #[test]
    fn asymmetric_square_rows_are_rejected() {
        let rows = vec![vec![0.31, 0.9], vec![0.15, 0.32]];
        let err = PhaseMatrix::from_rows(&rows, &[1, 3]).unwrap_err();
        assert!(err.contains("not symmetric"), "{err}");
    }

    #[test]
    fn restriction_zeroes_inactive_phases() {
        let full = PhaseMatrix::from_sequence(0.9, 0.3, &[1, 2, 3]);
        let m = full.restricted_to(&[1, 2]);
        assert_eq!(m.get(3, 3), 0.0);
        assert_eq!(m.get(1, 3), 0.0);
        assert_eq!(m.get(1, 2), full.get(1, 2));
        assert_eq!(m.get(2, 2), full.get(2, 2));
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn phase_zero_is_not_a_phase() {
        PhaseMatrix::zeros().get(0, 1);
    }

    #[test]
    fn impedance_scaling_preserves_shape() {
        assert_eq!(Impedance::Scalar(2.0).scaled(0.5).scalar(), Some(1.0));
        let m = Impedance::Matrix(PhaseMatrix::diagonal(2.0, &[1]));
        let scaled = m.scaled(3.0);
        assert_eq!(scaled.matrix().unwrap().get(1, 1), 6.0);
        assert!(scaled.scalar().is_none());
    }
}
