// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Ready-made problems.

use ndarray::{Array1, Array2};
use num_complex::Complex64;

use crate::error::{Error, Result};
use crate::problem::SchrodingerProblem;

/// Lowering operator `a` on `n` levels: `a[k−1, k] = √k`.
pub fn lowering(n: usize) -> Array2<f64> {
    let mut a = Array2::zeros((n, n));
    for k in 1..n {
        a[[k - 1, k]] = (k as f64).sqrt();
    }
    a
}

/// Rotating-frame qudit driven through one channel.
///
/// `H(t) = diag(δk + α/2·k(k−1)) + p(t)(a + a†) + i q(t)(a − a†)` on
/// `n_essential + n_guard` levels, starting in the ground state.
pub fn rotating_qudit(
    n_essential: usize,
    n_guard: usize,
    detuning: f64,
    anharmonicity: f64,
    tf: f64,
    nsteps: usize,
) -> Result<SchrodingerProblem> {
    let n = n_essential + n_guard;
    if n < 2 {
        return Err(Error::Config(format!(
            "a driven qudit needs at least 2 levels, got {n}"
        )));
    }

    let drift = Array2::from_diag(&Array1::from_shape_fn(n, |k| {
        let k = k as f64;
        Complex64::new(detuning * k + 0.5 * anharmonicity * k * (k - 1.0), 0.0)
    }));
    let a = lowering(n);
    let a_dag = a.t();
    let p_op = (&a + &a_dag).mapv(|x| Complex64::new(x, 0.0));
    let q_op = (&a - &a_dag).mapv(|x| Complex64::new(0.0, x));

    let mut psi0 = Array1::zeros(n);
    psi0[0] = Complex64::new(1.0, 0.0);

    SchrodingerProblem::from_complex(
        &drift,
        &[(p_op, q_op)],
        &psi0,
        tf,
        nsteps,
        n_essential,
        n_guard,
    )
}
