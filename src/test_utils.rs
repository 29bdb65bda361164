// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared fixtures for unit tests.

use std::f64::consts::FRAC_PI_2;

use ndarray::Array1;
use num_complex::Complex64;

use crate::control::{
    BSpline2Control, ControlSet, DirectControl, PiecewiseConstantControl, SineCarrierControl,
};
use crate::presets::{lowering, rotating_qudit};
use crate::problem::SchrodingerProblem;

const DETUNING: f64 = 0.3;
const ANHARMONICITY: f64 = -1.2;

/// Two essential levels plus one guard level, driven by a three-mode sine
/// carrier. `N = 3`, 40 steps over `tf = 1`.
pub fn driven_transmon() -> (SchrodingerProblem, ControlSet) {
    driven_transmon_at(40)
}

/// [`driven_transmon`] with a different base step count.
pub fn driven_transmon_at(nsteps: usize) -> (SchrodingerProblem, ControlSet) {
    let tf = 1.0;
    let problem = rotating_qudit(2, 1, DETUNING, ANHARMONICITY, tf, nsteps).unwrap();
    let controls = ControlSet::single(DirectControl::from_fn(
        SineCarrierControl::new(3, tf).unwrap(),
    ));
    (problem, controls)
}

/// [`driven_transmon`] with a second, two-photon channel driven by B-splines.
pub fn two_channel_transmon() -> (SchrodingerProblem, ControlSet) {
    let tf = 1.0;
    let n = 3;
    let real = |m: ndarray::Array2<f64>| m.mapv(|x| Complex64::new(x, 0.0));
    let imag = |m: ndarray::Array2<f64>| m.mapv(|x| Complex64::new(0.0, x));

    let a = lowering(n);
    let a2 = a.dot(&a);
    let drift = real(ndarray::Array2::from_diag(&Array1::from_shape_fn(n, |k| {
        let k = k as f64;
        DETUNING * k + 0.5 * ANHARMONICITY * k * (k - 1.0)
    })));
    let couplings = [
        (real(&a + &a.t()), imag(&a - &a.t())),
        (real(&a2 + &a2.t()), imag(&a2 - &a2.t())),
    ];
    let mut psi0 = Array1::zeros(n);
    psi0[0] = Complex64::new(1.0, 0.0);

    let problem = SchrodingerProblem::from_complex(&drift, &couplings, &psi0, tf, 40, 2, 1).unwrap();
    let mut controls = ControlSet::single(DirectControl::from_fn(
        SineCarrierControl::new(2, tf).unwrap(),
    ));
    controls.push(BSpline2Control::new(4, tf).unwrap());
    (problem, controls)
}

/// One essential level and one guard level, B-spline drive, 10 steps over
/// `tf = π/2`.
pub fn qubit_with_guard() -> (SchrodingerProblem, ControlSet) {
    let tf = FRAC_PI_2;
    let problem = rotating_qudit(1, 1, 0.0, -2.0, tf, 10).unwrap();
    let controls = ControlSet::single(BSpline2Control::new(4, tf).unwrap());
    (problem, controls)
}

/// Two-level system under four piecewise-constant amplitudes, 20 steps.
pub fn piecewise_qubit() -> (SchrodingerProblem, ControlSet) {
    let tf = 1.0;
    let problem = rotating_qudit(2, 0, 0.5, 0.0, tf, 20).unwrap();
    let controls = ControlSet::single(PiecewiseConstantControl::new(4, tf).unwrap());
    (problem, controls)
}

/// Deterministic coefficients of magnitude 0.2 to 0.5 with mixed signs.
pub fn sample_pcof(controls: &ControlSet) -> Vec<f64> {
    (0..controls.n_coeff_total())
        .map(|j| {
            let x = 0.2 + 0.3 * (j as f64 * 0.618_034).fract();
            if j % 3 == 1 {
                -x
            } else {
                x
            }
        })
        .collect()
}

/// Uniform superposition over `n` levels.
pub fn superposition(n: usize) -> Array1<f64> {
    Array1::from_elem(n, 1.0 / (n as f64).sqrt())
}
