// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Restarted GMRES for matrix-free operators.
//!
//! Arnoldi with modified Gram-Schmidt and Givens rotations. Convergence is
//! judged on the Arnoldi residual estimate `|g_{j+1}|` against
//! `max(abstol, reltol·‖b‖)`; at every restart the true residual is
//! recomputed. A solve that exhausts its iteration budget is an error, never a
//! silently returned approximation.

use ndarray::{Array1, Array2};
use tracing::trace;

use crate::config::SolverConfig;
use crate::error::SolverError;

/// Matrix-free linear operator.
pub trait LinearOperator {
    /// Dimension of the (square) operator.
    fn dim(&self) -> usize;

    /// `y = M x`
    fn apply(&self, x: &Array1<f64>) -> Array1<f64>;
}

/// Result of a converged solve.
#[derive(Debug, Clone)]
pub struct GmresOutcome {
    pub solution: Array1<f64>,
    /// Operator applications spent
    pub iterations: usize,
    /// Final residual estimate
    pub residual: f64,
}

/// Solve `op · x = b` starting from `x0`.
pub fn gmres<A: LinearOperator>(
    op: &A,
    b: &Array1<f64>,
    x0: Array1<f64>,
    config: &SolverConfig,
) -> Result<GmresOutcome, SolverError> {
    let n = op.dim();
    let b_norm = norm(b);
    if b_norm == 0.0 {
        return Ok(GmresOutcome {
            solution: Array1::zeros(n),
            iterations: 0,
            residual: 0.0,
        });
    }
    let tolerance = config.abstol.max(config.reltol * b_norm);
    let restart = if config.restart == 0 {
        n
    } else {
        config.restart.min(n)
    }
    .max(1);

    let mut x = x0;
    let mut iterations = 0;

    loop {
        let r = b - &op.apply(&x);
        let beta = norm(&r);
        if !beta.is_finite() {
            return Err(SolverError::Breakdown(format!(
                "non-finite residual after {iterations} iterations"
            )));
        }
        if beta <= tolerance {
            return Ok(GmresOutcome {
                solution: x,
                iterations,
                residual: beta,
            });
        }
        if iterations >= config.max_iterations {
            return Err(SolverError::NotConverged {
                iterations,
                residual: beta,
                tolerance,
            });
        }

        let mut basis: Vec<Array1<f64>> = Vec::with_capacity(restart + 1);
        basis.push(r / beta);
        let mut h = Array2::<f64>::zeros((restart + 1, restart));
        let mut cs = vec![0.0; restart];
        let mut sn = vec![0.0; restart];
        let mut g = vec![0.0; restart + 1];
        g[0] = beta;

        let mut k = 0;
        let mut converged = false;
        while k < restart && iterations < config.max_iterations {
            let j = k;
            let mut w = op.apply(&basis[j]);
            iterations += 1;

            for (i, v) in basis.iter().enumerate() {
                let hij = w.dot(v);
                h[[i, j]] = hij;
                w.scaled_add(-hij, v);
            }
            let h_next = norm(&w);
            h[[j + 1, j]] = h_next;

            for i in 0..j {
                let temp = cs[i] * h[[i, j]] + sn[i] * h[[i + 1, j]];
                h[[i + 1, j]] = -sn[i] * h[[i, j]] + cs[i] * h[[i + 1, j]];
                h[[i, j]] = temp;
            }
            let (c, s) = givens(h[[j, j]], h[[j + 1, j]]);
            cs[j] = c;
            sn[j] = s;
            h[[j, j]] = c * h[[j, j]] + s * h[[j + 1, j]];
            h[[j + 1, j]] = 0.0;
            g[j + 1] = -s * g[j];
            g[j] *= c;
            k = j + 1;

            let estimate = g[j + 1].abs();
            if estimate <= tolerance || h_next == 0.0 {
                converged = true;
                break;
            }
            basis.push(w / h_next);
        }

        let y = back_substitute(&h, &g, k);
        for (yi, v) in y.iter().zip(&basis) {
            x.scaled_add(*yi, v);
        }

        if converged {
            let residual = g[k].abs();
            trace!(iterations, residual, "GMRES converged");
            return Ok(GmresOutcome {
                solution: x,
                iterations,
                residual,
            });
        }
    }
}

fn norm(x: &Array1<f64>) -> f64 {
    x.dot(x).sqrt()
}

/// Rotation `(c, s)` zeroing `b` in `[a; b]`.
fn givens(a: f64, b: f64) -> (f64, f64) {
    if b == 0.0 {
        (1.0, 0.0)
    } else {
        let r = a.hypot(b);
        (a / r, b / r)
    }
}

/// Solve the leading `k × k` upper-triangular system `H y = g`.
fn back_substitute(h: &Array2<f64>, g: &[f64], k: usize) -> Vec<f64> {
    let mut y = vec![0.0; k];
    for i in (0..k).rev() {
        let mut sum = g[i];
        for j in (i + 1)..k {
            sum -= h[[i, j]] * y[j];
        }
        y[i] = if h[[i, i]] != 0.0 { sum / h[[i, i]] } else { 0.0 };
    }
    y
}

/// Dense matrix as an operator.
impl LinearOperator for Array2<f64> {
    fn dim(&self) -> usize {
        self.nrows()
    }

    fn apply(&self, x: &Array1<f64>) -> Array1<f64> {
        self.dot(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn tight() -> SolverConfig {
        SolverConfig {
            abstol: 1e-14,
            reltol: 1e-14,
            ..SolverConfig::default()
        }
    }

    #[test]
    fn test_solves_nonsymmetric_system() {
        let a = array![
            [4.0, 1.0, 0.0, 0.5],
            [-1.0, 3.0, 0.2, 0.0],
            [0.0, -0.3, 2.0, 1.0],
            [0.1, 0.0, -1.0, 5.0]
        ];
        let b = array![1.0, 2.0, -1.0, 0.5];
        let out = gmres(&a, &b, Array1::zeros(4), &tight()).unwrap();
        let residual = &b - &a.dot(&out.solution);
        assert!(norm(&residual) < 1e-13);
        assert!(out.iterations <= 8);
    }

    #[test]
    fn test_exact_initial_guess_returns_immediately() {
        let a = Array2::<f64>::eye(3) * 2.0;
        let b = array![2.0, 4.0, 6.0];
        let out = gmres(&a, &b, array![1.0, 2.0, 3.0], &tight()).unwrap();
        assert_eq!(out.iterations, 0);
        assert_eq!(out.solution, array![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_zero_rhs_gives_zero() {
        let a = Array2::<f64>::eye(2);
        let out = gmres(&a, &Array1::zeros(2), array![5.0, 5.0], &tight()).unwrap();
        assert_eq!(out.solution, Array1::<f64>::zeros(2));
    }

    #[test]
    fn test_restarted_solve_converges() {
        let n = 8;
        let a = Array2::from_shape_fn((n, n), |(i, j)| {
            if i == j {
                3.0 + i as f64
            } else if j == i + 1 {
                1.0
            } else if i == j + 1 {
                -1.0
            } else {
                0.0
            }
        });
        let b = Array1::from_shape_fn(n, |i| (i as f64 + 1.0).sin());
        let config = SolverConfig {
            restart: 3,
            ..tight()
        };
        let out = gmres(&a, &b, Array1::zeros(n), &config).unwrap();
        let residual = &b - &a.dot(&out.solution);
        assert!(norm(&residual) < 1e-12);
    }

    #[test]
    fn test_iteration_budget_exhausted() {
        let a = Array2::from_diag(&array![1.0, 2.0, 3.0, 4.0]);
        let b = array![1.0, 1.0, 1.0, 1.0];
        let config = SolverConfig {
            max_iterations: 1,
            ..tight()
        };
        let err = gmres(&a, &b, Array1::zeros(4), &config).unwrap_err();
        match err {
            SolverError::NotConverged {
                iterations,
                residual,
                tolerance,
            } => {
                assert_eq!(iterations, 1);
                assert!(residual > tolerance);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_identity_plus_antisymmetric() {
        // I − (dt/2) A with A antisymmetric, the shape of every step operator
        let a = array![[1.0, 0.5], [-0.5, 1.0]];
        let b = array![0.3, 0.7];
        let out = gmres(&a, &b, b.clone(), &tight()).unwrap();
        let det = 1.25;
        assert_relative_eq!(out.solution[0], (0.3 - 0.35) / det, epsilon = 1e-14);
        assert_relative_eq!(out.solution[1], (0.7 + 0.15) / det, epsilon = 1e-14);
    }
}
