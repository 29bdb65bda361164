// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Exact drift-only evolution.
//!
//! With every control switched off the embedded generator is constant and the
//! state at time `t` is `exp(t·A)·w0`. The matrix exponential uses
//! scaling-and-squaring with a Padé(13) approximant:
//!   Higham (2005), "The Scaling and Squaring Method for the Matrix
//!   Exponential Revisited", SIAM J. Matrix Anal. Appl. 26(4), 1179.

use ndarray::{s, Array2};

use crate::error::{Result, ValidationError};
use crate::evolution::Generator;
use crate::problem::SchrodingerProblem;

/// `θ13` from Higham's Table 10.2.
const THETA_13: f64 = 5.37;

const PADE_COEFFS: [f64; 14] = [
    64_764_752_532_480_000.0,
    32_382_376_266_240_000.0,
    7_771_770_303_897_600.0,
    1_187_353_796_428_800.0,
    129_060_195_264_000.0,
    10_559_470_521_600.0,
    670_442_572_800.0,
    33_522_128_640.0,
    1_323_241_920.0,
    40_840_800.0,
    960_960.0,
    16_380.0,
    182.0,
    1.0,
];

/// States `exp(t_n·A_drift)·w0` at `t_n = n·tf/nsteps`, shape `[2N, nsteps + 1]`.
pub fn propagate_drift(problem: &SchrodingerProblem, nsteps: usize) -> Result<Array2<f64>> {
    if nsteps == 0 {
        return Err(ValidationError::Field {
            field: "nsteps".into(),
            message: "must be >= 1".into(),
        }
        .into());
    }
    let a = Generator::drift(problem).to_dense();
    let w0 = problem.initial_state();
    let dt = problem.dt(nsteps);

    let mut states = Array2::zeros((w0.len(), nsteps + 1));
    states.column_mut(0).assign(&w0);
    for n in 1..=nsteps {
        let propagator = expm(&(&a * (n as f64 * dt)))?;
        states.column_mut(n).assign(&propagator.dot(&w0));
    }
    Ok(states)
}

/// Matrix exponential of a square real matrix.
pub fn expm(a: &Array2<f64>) -> Result<Array2<f64>> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(ValidationError::Dimension {
            what: "matrix".into(),
            expected: "square".into(),
            actual: format!("[{}, {}]", n, a.ncols()),
        }
        .into());
    }
    if n == 0 {
        return Ok(Array2::zeros((0, 0)));
    }

    let norm = one_norm(a);
    let squarings = if norm > THETA_13 {
        (norm / THETA_13).log2().ceil() as i32
    } else {
        0
    };
    let scaled = a * 2f64.powi(-squarings);

    let mut result = pade13(&scaled)?;
    for _ in 0..squarings {
        result = result.dot(&result);
    }
    Ok(result)
}

fn pade13(a: &Array2<f64>) -> Result<Array2<f64>> {
    let b = &PADE_COEFFS;
    let eye = Array2::<f64>::eye(a.nrows());
    let a2 = a.dot(a);
    let a4 = a2.dot(&a2);
    let a6 = a2.dot(&a4);

    let u_inner = &a6 * b[13] + &a4 * b[11] + &a2 * b[9];
    let u = a.dot(&(a6.dot(&u_inner) + &a6 * b[7] + &a4 * b[5] + &a2 * b[3] + &eye * b[1]));

    let v_inner = &a6 * b[12] + &a4 * b[10] + &a2 * b[8];
    let v = a6.dot(&v_inner) + &a6 * b[6] + &a4 * b[4] + &a2 * b[2] + &eye * b[0];

    solve(&v - &u, &v + &u)
}

/// Solve `A X = B` by Gaussian elimination with partial pivoting.
fn solve(a: Array2<f64>, b: Array2<f64>) -> Result<Array2<f64>> {
    let n = a.nrows();
    let m = b.ncols();
    let mut aug = Array2::zeros((n, n + m));
    aug.slice_mut(s![.., ..n]).assign(&a);
    aug.slice_mut(s![.., n..]).assign(&b);

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| aug[[i, col]].abs().total_cmp(&aug[[j, col]].abs()))
            .unwrap_or(col);
        if pivot_row != col {
            for j in 0..n + m {
                aug.swap([col, j], [pivot_row, j]);
            }
        }
        let pivot = aug[[col, col]];
        if pivot.abs() < f64::EPSILON {
            return Err(ValidationError::PhysicsConstraint(
                "singular Padé denominator in matrix exponential".into(),
            )
            .into());
        }
        for row in col + 1..n {
            let factor = aug[[row, col]] / pivot;
            for j in col..n + m {
                let val = aug[[col, j]];
                aug[[row, j]] -= factor * val;
            }
        }
    }

    let mut x = Array2::zeros((n, m));
    for col in (0..n).rev() {
        for j in 0..m {
            let mut sum = aug[[col, n + j]];
            for k in col + 1..n {
                sum -= aug[[col, k]] * x[[k, j]];
            }
            x[[col, j]] = sum / aug[[col, col]];
        }
    }
    Ok(x)
}

/// Maximum absolute column sum.
fn one_norm(a: &Array2<f64>) -> f64 {
    a.columns()
        .into_iter()
        .map(|c| c.iter().map(|x| x.abs()).sum::<f64>())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::rotating_qudit;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_expm_zero_is_identity() {
        let e = expm(&Array2::zeros((4, 4))).unwrap();
        for i in 0..4 {
            for j in 0..4 {
                assert_relative_eq!(e[[i, j]], if i == j { 1.0 } else { 0.0 });
            }
        }
    }

    #[test]
    fn test_expm_rotation() {
        // exp([[0, θ], [−θ, 0]]) is a rotation by θ, including after scaling.
        for theta in [0.3, 2.0, 40.0] {
            let e = expm(&array![[0.0, theta], [-theta, 0.0]]).unwrap();
            assert_relative_eq!(e[[0, 0]], theta.cos(), epsilon = 1e-12);
            assert_relative_eq!(e[[0, 1]], theta.sin(), epsilon = 1e-12);
            assert_relative_eq!(e[[1, 0]], -theta.sin(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_expm_diagonal() {
        let e = expm(&array![[1.0, 0.0], [0.0, -2.0]]).unwrap();
        assert_relative_eq!(e[[0, 0]], 1f64.exp(), epsilon = 1e-13);
        assert_relative_eq!(e[[1, 1]], (-2f64).exp(), epsilon = 1e-13);
    }

    #[test]
    fn test_expm_rejects_non_square() {
        assert!(expm(&Array2::zeros((2, 3))).is_err());
    }

    #[test]
    fn test_propagate_drift_phases() {
        // Each level k picks up the phase exp(−i E_k t).
        let mut problem = rotating_qudit(2, 1, 0.3, -1.2, 1.0, 10).unwrap();
        let amp = 1.0 / 3f64.sqrt();
        problem = problem
            .with_initial_state(ndarray::Array1::from_elem(3, amp), ndarray::Array1::zeros(3))
            .unwrap();
        let states = propagate_drift(&problem, 10).unwrap();
        let energies: [f64; 3] = [0.0, 0.3, -0.6];
        let t: f64 = 1.0;
        for (k, e) in energies.iter().enumerate() {
            assert_relative_eq!(states[[k, 10]], amp * (e * t).cos(), epsilon = 1e-12);
            assert_relative_eq!(states[[3 + k, 10]], -amp * (e * t).sin(), epsilon = 1e-12);
        }
        assert!(propagate_drift(&problem, 0).is_err());
    }
}
