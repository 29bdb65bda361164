// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Schrödinger problem record.
//!
//! The Hamiltonian `H(t) = S(t) + i K(t)` is stored as its real symmetric part
//! `S` and real antisymmetric part `K`:
//!
//! ```text
//! S(t) = system_sym  + Σ_c p_c(t) sym_operators[c]
//! K(t) = system_asym + Σ_c q_c(t) asym_operators[c]
//! ```
//!
//! and the state `ψ = u + i v` evolves under the real embedding of
//! `ψ' = -i H ψ`:
//!
//! ```text
//! u' = K u + S v
//! v' = K v − S u
//! ```

use ndarray::{Array1, Array2};
use num_complex::Complex64;

use crate::error::{Result, ValidationError};

/// Tolerance on the combined norm of the initial state.
const NORM_TOLERANCE: f64 = 1e-10;

/// Relative tolerance on (anti)symmetry of the operator parts.
const SYMMETRY_TOLERANCE: f64 = 1e-12;

/// Immutable description of the physical system and its discretization.
///
/// A problem is validated once at construction. Step-count changes for
/// convergence sweeps go through
/// [`Integrator::with_nsteps`](crate::evolution::Integrator::with_nsteps)
/// and never touch the record.
#[derive(Debug, Clone)]
pub struct SchrodingerProblem {
    system_sym: Array2<f64>,
    system_asym: Array2<f64>,
    sym_operators: Vec<Array2<f64>>,
    asym_operators: Vec<Array2<f64>>,
    u0: Array1<f64>,
    v0: Array1<f64>,
    tf: f64,
    nsteps: usize,
    n_essential: usize,
    n_guard: usize,
}

impl SchrodingerProblem {
    /// Create and validate a problem from real operator parts.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        system_sym: Array2<f64>,
        system_asym: Array2<f64>,
        sym_operators: Vec<Array2<f64>>,
        asym_operators: Vec<Array2<f64>>,
        u0: Array1<f64>,
        v0: Array1<f64>,
        tf: f64,
        nsteps: usize,
        n_essential: usize,
        n_guard: usize,
    ) -> Result<Self> {
        let problem = Self {
            system_sym,
            system_asym,
            sym_operators,
            asym_operators,
            u0,
            v0,
            tf,
            nsteps,
            n_essential,
            n_guard,
        };
        problem.validate()?;
        Ok(problem)
    }

    /// Create a problem from complex Hermitian operators.
    ///
    /// Each control channel is a pair `(p_coupling, q_coupling)` of complex
    /// matrices entering the Hamiltonian as `p(t)·p_coupling + q(t)·q_coupling`.
    /// The real part of every matrix goes into the symmetric slot and the
    /// imaginary part into the antisymmetric slot, so a `p` coupling must be
    /// real symmetric and a `q` coupling purely imaginary.
    pub fn from_complex(
        drift: &Array2<Complex64>,
        couplings: &[(Array2<Complex64>, Array2<Complex64>)],
        psi0: &Array1<Complex64>,
        tf: f64,
        nsteps: usize,
        n_essential: usize,
        n_guard: usize,
    ) -> Result<Self> {
        let re = |m: &Array2<Complex64>| m.mapv(|z| z.re);
        let im = |m: &Array2<Complex64>| m.mapv(|z| z.im);

        for (c, (p_op, q_op)) in couplings.iter().enumerate() {
            if im(p_op).iter().any(|x| x.abs() > SYMMETRY_TOLERANCE) {
                return Err(ValidationError::PhysicsConstraint(format!(
                    "p coupling of channel {c} must be real"
                ))
                .into());
            }
            if re(q_op).iter().any(|x| x.abs() > SYMMETRY_TOLERANCE) {
                return Err(ValidationError::PhysicsConstraint(format!(
                    "q coupling of channel {c} must be purely imaginary"
                ))
                .into());
            }
        }

        Self::new(
            re(drift),
            im(drift),
            couplings.iter().map(|(p_op, _)| re(p_op)).collect(),
            couplings.iter().map(|(_, q_op)| im(q_op)).collect(),
            psi0.mapv(|z| z.re),
            psi0.mapv(|z| z.im),
            tf,
            nsteps,
            n_essential,
            n_guard,
        )
    }

    /// Copy of this problem starting from another initial state.
    pub fn with_initial_state(&self, u0: Array1<f64>, v0: Array1<f64>) -> Result<Self> {
        let problem = Self {
            u0,
            v0,
            ..self.clone()
        };
        problem.validate()?;
        Ok(problem)
    }

    /// Validate the record invariants.
    pub fn validate(&self) -> Result<()> {
        let n = self.u0.len();

        if self.n_essential == 0 {
            return Err(field("n_essential", "must be > 0"));
        }
        if self.n_essential + self.n_guard != n {
            return Err(field(
                "n_essential",
                &format!(
                    "essential ({}) + guard ({}) levels must equal state dimension {}",
                    self.n_essential, self.n_guard, n
                ),
            ));
        }
        if self.v0.len() != n {
            return Err(dimension("v0", &format!("[{n}]"), &format!("[{}]", self.v0.len())));
        }
        if self.nsteps == 0 {
            return Err(field("nsteps", "must be >= 1"));
        }
        if !(self.tf > 0.0 && self.tf.is_finite()) {
            return Err(field("tf", &format!("must be finite and > 0, got {}", self.tf)));
        }

        check_square("system_sym", &self.system_sym, n)?;
        check_square("system_asym", &self.system_asym, n)?;
        check_symmetry("system_sym", &self.system_sym, 1.0)?;
        check_symmetry("system_asym", &self.system_asym, -1.0)?;

        if self.sym_operators.len() != self.asym_operators.len() {
            return Err(field(
                "asym_operators",
                &format!(
                    "{} symmetric but {} antisymmetric control operators",
                    self.sym_operators.len(),
                    self.asym_operators.len()
                ),
            ));
        }
        for (c, (sym, asym)) in self
            .sym_operators
            .iter()
            .zip(self.asym_operators.iter())
            .enumerate()
        {
            check_square(&format!("sym_operators[{c}]"), sym, n)?;
            check_square(&format!("asym_operators[{c}]"), asym, n)?;
            check_symmetry(&format!("sym_operators[{c}]"), sym, 1.0)?;
            check_symmetry(&format!("asym_operators[{c}]"), asym, -1.0)?;
        }

        let norm_sq = self.u0.dot(&self.u0) + self.v0.dot(&self.v0);
        if (norm_sq - 1.0).abs() > NORM_TOLERANCE {
            return Err(ValidationError::PhysicsConstraint(format!(
                "initial state must have unit norm, got |psi0|^2 = {norm_sq}"
            ))
            .into());
        }
        Ok(())
    }

    /// State dimension N (essential + guard levels).
    pub fn dim(&self) -> usize {
        self.u0.len()
    }

    /// Number of control channels.
    pub fn n_channels(&self) -> usize {
        self.sym_operators.len()
    }

    /// Step size for a given step count.
    pub fn dt(&self, nsteps: usize) -> f64 {
        self.tf / nsteps as f64
    }

    /// Initial state stacked as `[u0; v0]`.
    pub fn initial_state(&self) -> Array1<f64> {
        let n = self.dim();
        let mut w = Array1::zeros(2 * n);
        w.slice_mut(ndarray::s![..n]).assign(&self.u0);
        w.slice_mut(ndarray::s![n..]).assign(&self.v0);
        w
    }

    pub fn system_sym(&self) -> &Array2<f64> {
        &self.system_sym
    }

    pub fn system_asym(&self) -> &Array2<f64> {
        &self.system_asym
    }

    pub fn sym_operators(&self) -> &[Array2<f64>] {
        &self.sym_operators
    }

    pub fn asym_operators(&self) -> &[Array2<f64>] {
        &self.asym_operators
    }

    pub fn u0(&self) -> &Array1<f64> {
        &self.u0
    }

    pub fn v0(&self) -> &Array1<f64> {
        &self.v0
    }

    /// Total evolution time.
    pub fn tf(&self) -> f64 {
        self.tf
    }

    /// Base step count.
    pub fn nsteps(&self) -> usize {
        self.nsteps
    }

    pub fn n_essential(&self) -> usize {
        self.n_essential
    }

    pub fn n_guard(&self) -> usize {
        self.n_guard
    }
}

fn field(field: &str, message: &str) -> crate::error::Error {
    ValidationError::Field {
        field: field.into(),
        message: message.into(),
    }
    .into()
}

fn dimension(what: &str, expected: &str, actual: &str) -> crate::error::Error {
    ValidationError::Dimension {
        what: what.into(),
        expected: expected.into(),
        actual: actual.into(),
    }
    .into()
}

fn check_square(name: &str, m: &Array2<f64>, n: usize) -> Result<()> {
    if m.nrows() != n || m.ncols() != n {
        return Err(dimension(
            name,
            &format!("[{n}, {n}]"),
            &format!("[{}, {}]", m.nrows(), m.ncols()),
        ));
    }
    Ok(())
}

/// `sign = 1` checks `M = Mᵀ`, `sign = -1` checks `M = -Mᵀ`.
fn check_symmetry(name: &str, m: &Array2<f64>, sign: f64) -> Result<()> {
    let scale = m.iter().fold(0.0_f64, |acc, x| acc.max(x.abs())).max(1.0);
    let defect = m
        .iter()
        .zip(m.t().iter())
        .fold(0.0_f64, |acc, (a, b)| acc.max((a - sign * b).abs()));
    if defect > SYMMETRY_TOLERANCE * scale {
        let kind = if sign > 0.0 { "symmetric" } else { "antisymmetric" };
        return Err(ValidationError::PhysicsConstraint(format!(
            "{name} must be {kind} (defect {defect:.3e})"
        ))
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use ndarray::array;

    fn two_level(u0: Array1<f64>, nsteps: usize, tf: f64) -> Result<SchrodingerProblem> {
        SchrodingerProblem::new(
            array![[0.0, 0.0], [0.0, 1.0]],
            Array2::zeros((2, 2)),
            vec![array![[0.0, 1.0], [1.0, 0.0]]],
            vec![array![[0.0, 1.0], [-1.0, 0.0]]],
            u0,
            Array1::zeros(2),
            tf,
            nsteps,
            1,
            1,
        )
    }

    #[test]
    fn test_valid_problem() {
        let p = two_level(array![1.0, 0.0], 10, 1.0).unwrap();
        assert_eq!(p.dim(), 2);
        assert_eq!(p.n_channels(), 1);
        assert_eq!(p.dt(4), 0.25);
        assert_eq!(p.initial_state(), array![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_rejects_zero_steps() {
        let err = two_level(array![1.0, 0.0], 0, 1.0).unwrap_err();
        assert!(err.to_string().contains("nsteps"));
    }

    #[test]
    fn test_rejects_nonpositive_tf() {
        assert!(two_level(array![1.0, 0.0], 10, 0.0).is_err());
        assert!(two_level(array![1.0, 0.0], 10, -1.0).is_err());
    }

    #[test]
    fn test_rejects_unnormalized_state() {
        let err = two_level(array![1.0, 1.0], 10, 1.0).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::PhysicsConstraint(_))
        ));
    }

    #[test]
    fn test_rejects_non_antisymmetric_operator() {
        let result = SchrodingerProblem::new(
            Array2::zeros((2, 2)),
            Array2::zeros((2, 2)),
            vec![Array2::zeros((2, 2))],
            vec![array![[0.0, 1.0], [1.0, 0.0]]],
            array![1.0, 0.0],
            Array1::zeros(2),
            1.0,
            10,
            2,
            0,
        );
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("antisymmetric"));
    }

    #[test]
    fn test_rejects_level_count_mismatch() {
        let result = SchrodingerProblem::new(
            Array2::zeros((2, 2)),
            Array2::zeros((2, 2)),
            vec![],
            vec![],
            array![1.0, 0.0],
            Array1::zeros(2),
            1.0,
            10,
            2,
            1,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_from_complex_splits_parts() {
        let i = Complex64::new(0.0, 1.0);
        let one = Complex64::new(1.0, 0.0);
        let zero = Complex64::new(0.0, 0.0);
        let drift = array![[zero, zero], [zero, one]];
        let p_op = array![[zero, one], [one, zero]];
        let q_op = array![[zero, i], [-i, zero]];
        let psi0 = array![one, zero];

        let p = SchrodingerProblem::from_complex(&drift, &[(p_op, q_op)], &psi0, 1.0, 5, 2, 0)
            .unwrap();
        assert_eq!(p.system_sym()[[1, 1]], 1.0);
        assert_eq!(p.asym_operators()[0], array![[0.0, 1.0], [-1.0, 0.0]]);
        assert_eq!(p.sym_operators()[0], array![[0.0, 1.0], [1.0, 0.0]]);
    }

    #[test]
    fn test_from_complex_rejects_complex_p_coupling() {
        let i = Complex64::new(0.0, 1.0);
        let zero = Complex64::new(0.0, 0.0);
        let one = Complex64::new(1.0, 0.0);
        let bad = array![[zero, i], [-i, zero]];
        let result = SchrodingerProblem::from_complex(
            &Array2::zeros((2, 2)),
            &[(bad.clone(), bad)],
            &array![one, zero],
            1.0,
            5,
            2,
            0,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_clone_is_independent() {
        let p = two_level(array![1.0, 0.0], 10, 1.0).unwrap();
        let q = p.clone();
        drop(p);
        assert_eq!(q.nsteps(), 10);
    }

    #[test]
    fn test_with_initial_state_revalidates() {
        let p = two_level(array![1.0, 0.0], 10, 1.0).unwrap();
        let h = std::f64::consts::FRAC_1_SQRT_2;
        let q = p.with_initial_state(array![h, 0.0], array![0.0, h]).unwrap();
        assert_eq!(q.initial_state(), array![h, 0.0, 0.0, h]);
        assert_eq!(p.u0(), &array![1.0, 0.0]);
        assert!(p.with_initial_state(array![1.0, 1.0], Array1::zeros(2)).is_err());
    }
}
