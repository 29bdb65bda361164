// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Terminal costs on the final state.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, ValidationError};
use crate::problem::SchrodingerProblem;

/// Kind of terminal cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostKind {
    /// `1 − |⟨T|ψ_ess⟩|²`
    #[default]
    Infidelity,
    /// Population outside the essential levels.
    Leakage,
}

impl fmt::Display for CostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostKind::Infidelity => write!(f, "infidelity"),
            CostKind::Leakage => write!(f, "leakage"),
        }
    }
}

impl FromStr for CostKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "infidelity" => Ok(CostKind::Infidelity),
            "leakage" => Ok(CostKind::Leakage),
            other => Err(Error::Config(format!("unknown cost kind '{other}'"))),
        }
    }
}

/// Target state on the essential levels, `T = target_u + i·target_v`.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub u: Array1<f64>,
    pub v: Array1<f64>,
}

impl Target {
    pub fn new(u: Array1<f64>, v: Array1<f64>) -> Result<Self> {
        if u.len() != v.len() {
            return Err(ValidationError::Dimension {
                what: "target imaginary part".into(),
                expected: format!("[{}]", u.len()),
                actual: format!("[{}]", v.len()),
            }
            .into());
        }
        Ok(Self { u, v })
    }

    /// Basis state `|level⟩` on `n_essential` levels.
    pub fn basis(n_essential: usize, level: usize) -> Result<Self> {
        if level >= n_essential {
            return Err(Error::Index {
                index: level,
                len: n_essential,
            });
        }
        let mut u = Array1::zeros(n_essential);
        u[level] = 1.0;
        Ok(Self {
            u,
            v: Array1::zeros(n_essential),
        })
    }

    pub fn len(&self) -> usize {
        self.u.len()
    }

    pub fn is_empty(&self) -> bool {
        self.u.is_empty()
    }
}

/// Terminal cost bound to a problem's level structure.
#[derive(Debug, Clone)]
pub struct TerminalCost {
    kind: CostKind,
    target: Target,
    n_essential: usize,
}

impl TerminalCost {
    /// The target must have one entry per essential level.
    pub fn new(kind: CostKind, target: Target, problem: &SchrodingerProblem) -> Result<Self> {
        if target.len() != problem.n_essential() {
            return Err(ValidationError::Dimension {
                what: "target".into(),
                expected: format!("[{}]", problem.n_essential()),
                actual: format!("[{}]", target.len()),
            }
            .into());
        }
        Ok(Self {
            kind,
            target,
            n_essential: problem.n_essential(),
        })
    }

    pub fn kind(&self) -> CostKind {
        self.kind
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Overlap `⟨T|ψ_ess⟩` as `(re, im)`.
    fn overlap(&self, w: ArrayView1<'_, f64>) -> (f64, f64) {
        let n = w.len() / 2;
        let (tu, tv) = (&self.target.u, &self.target.v);
        let mut re = 0.0;
        let mut im = 0.0;
        for k in 0..self.n_essential {
            let (u, v) = (w[k], w[n + k]);
            re += tu[k] * u + tv[k] * v;
            im += tu[k] * v - tv[k] * u;
        }
        (re, im)
    }

    /// Cost of the final state `w = [u; v]`.
    pub fn value(&self, w: ArrayView1<'_, f64>) -> f64 {
        match self.kind {
            CostKind::Infidelity => {
                let (re, im) = self.overlap(w);
                1.0 - (re * re + im * im)
            }
            CostKind::Leakage => {
                let n = w.len() / 2;
                (self.n_essential..n)
                    .map(|k| w[k] * w[k] + w[n + k] * w[n + k])
                    .sum()
            }
        }
    }

    /// Gradient of [`TerminalCost::value`] with respect to `w`.
    pub fn gradient(&self, w: ArrayView1<'_, f64>) -> Array1<f64> {
        let n = w.len() / 2;
        let mut grad = Array1::zeros(w.len());
        match self.kind {
            CostKind::Infidelity => {
                let (re, im) = self.overlap(w);
                let (tu, tv) = (&self.target.u, &self.target.v);
                for k in 0..self.n_essential {
                    grad[k] = -2.0 * (re * tu[k] - im * tv[k]);
                    grad[n + k] = -2.0 * (re * tv[k] + im * tu[k]);
                }
            }
            CostKind::Leakage => {
                for k in self.n_essential..n {
                    grad[k] = 2.0 * w[k];
                    grad[n + k] = 2.0 * w[n + k];
                }
            }
        }
        grad
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::driven_transmon;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn infidelity() -> TerminalCost {
        let (problem, _) = driven_transmon();
        let target = Target::new(array![0.6, 0.0], array![0.0, 0.8]).unwrap();
        TerminalCost::new(CostKind::Infidelity, target, &problem).unwrap()
    }

    #[test]
    fn test_infidelity_of_target_is_zero() {
        let cost = infidelity();
        // |T⟩ itself, with a global phase and no guard population
        let w = array![0.0, -0.8, 0.0, 0.6, 0.0, 0.0];
        assert_relative_eq!(cost.value(w.view()), 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_infidelity_of_orthogonal_state_is_one() {
        let cost = infidelity();
        let w = array![0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
        assert_relative_eq!(cost.value(w.view()), 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_gradients_match_difference_quotients() {
        let (problem, _) = driven_transmon();
        let w = array![0.3, -0.2, 0.1, 0.5, 0.4, -0.6];
        let target = Target::new(array![0.6, 0.0], array![0.0, 0.8]).unwrap();
        for kind in [CostKind::Infidelity, CostKind::Leakage] {
            let cost = TerminalCost::new(kind, target.clone(), &problem).unwrap();
            let grad = cost.gradient(w.view());
            let h = 1e-6;
            for k in 0..w.len() {
                let mut plus = w.clone();
                plus[k] += h;
                let mut minus = w.clone();
                minus[k] -= h;
                let fd = (cost.value(plus.view()) - cost.value(minus.view())) / (2.0 * h);
                assert_relative_eq!(grad[k], fd, epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn test_leakage_counts_guard_levels() {
        let (problem, _) = driven_transmon();
        let cost = TerminalCost::new(
            CostKind::Leakage,
            Target::basis(2, 0).unwrap(),
            &problem,
        )
        .unwrap();
        let w = array![0.6, 0.0, 0.0, 0.0, 0.0, 0.8];
        assert_relative_eq!(cost.value(w.view()), 0.64, epsilon = 1e-15);
    }

    #[test]
    fn test_target_length_checked() {
        let (problem, _) = driven_transmon();
        let target = Target::basis(3, 0).unwrap();
        assert!(TerminalCost::new(CostKind::Infidelity, target, &problem).is_err());
        assert!(Target::basis(2, 2).is_err());
        assert!(Target::new(array![1.0], array![0.0, 0.0]).is_err());
    }

    #[test]
    fn test_cost_kind_parse() {
        assert_eq!("Leakage".parse::<CostKind>().unwrap(), CostKind::Leakage);
        assert!("fidelity".parse::<CostKind>().is_err());
        assert_eq!(CostKind::default().to_string(), "infidelity");
    }
}
