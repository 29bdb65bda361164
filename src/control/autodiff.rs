// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Derivatives of a [`ControlFn`] by forward-mode differentiation.
//!
//! Time derivatives seed the time argument; parameter gradients seed one
//! coefficient at a time. Mixed `∂²/∂t∂θ_j` uses a nested dual with the outer
//! infinitesimal on `t` and the inner one on `θ_j`.

use super::dual::{Dual, Real};
use super::ControlFn;

type D1 = Dual<f64>;
type D2 = Dual<Dual<f64>>;

/// `(p, q)` at `t`.
pub fn values<C: ControlFn>(control: &C, t: f64, pcof: &[f64]) -> (f64, f64) {
    control.eval_pq(t, pcof)
}

/// `(pt, qt)` at `t`.
pub fn time_derivatives<C: ControlFn>(control: &C, t: f64, pcof: &[f64]) -> (f64, f64) {
    let coeffs: Vec<D1> = pcof.iter().map(|&c| D1::lift(c)).collect();
    let (p, q) = control.eval_pq(D1::variable(t), &coeffs);
    (p.eps, q.eps)
}

/// `(ptt, qtt)` at `t`.
pub fn second_time_derivatives<C: ControlFn>(control: &C, t: f64, pcof: &[f64]) -> (f64, f64) {
    let coeffs: Vec<D2> = pcof.iter().map(|&c| D2::constant(c)).collect();
    let t = D2::new(D1::variable(t), D1::constant(1.0));
    let (p, q) = control.eval_pq(t, &coeffs);
    (p.eps.eps, q.eps.eps)
}

/// `(∇p, ∇q)` with respect to the channel's coefficients.
pub fn parameter_gradients<C: ControlFn>(
    control: &C,
    t: f64,
    pcof: &[f64],
) -> (Vec<f64>, Vec<f64>) {
    let n = pcof.len();
    let mut grad_p = vec![0.0; n];
    let mut grad_q = vec![0.0; n];
    let mut coeffs: Vec<D1> = pcof.iter().map(|&c| D1::lift(c)).collect();
    let t = D1::lift(t);

    for j in 0..n {
        coeffs[j].eps = 1.0;
        let (p, q) = control.eval_pq(t, &coeffs);
        grad_p[j] = p.eps;
        grad_q[j] = q.eps;
        coeffs[j].eps = 0.0;
    }
    (grad_p, grad_q)
}

/// `(∇pt, ∇qt)`: gradients of the time derivatives.
pub fn parameter_gradients_dt<C: ControlFn>(
    control: &C,
    t: f64,
    pcof: &[f64],
) -> (Vec<f64>, Vec<f64>) {
    let n = pcof.len();
    let mut grad_pt = vec![0.0; n];
    let mut grad_qt = vec![0.0; n];
    let mut coeffs: Vec<D2> = pcof.iter().map(|&c| D2::constant(c)).collect();
    let t = D2::new(D1::lift(t), D1::constant(1.0));

    for j in 0..n {
        coeffs[j].re.eps = 1.0;
        let (p, q) = control.eval_pq(t, &coeffs);
        grad_pt[j] = p.eps.eps;
        grad_qt[j] = q.eps.eps;
        coeffs[j].re.eps = 0.0;
    }
    (grad_pt, grad_qt)
}
