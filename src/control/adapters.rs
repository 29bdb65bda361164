// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Controls derived from other controls.
//!
//! Both adapters are [`ControlFn`]s themselves, so they nest: the time
//! derivative of a [`GradientComponent`] is `∂²(p, q)/∂t∂θ_i`, evaluated with
//! one more level of dual numbers.

use super::dual::{Dual, Real};
use super::ControlFn;

/// Exposes `(∂p/∂θ_index, ∂q/∂θ_index)` of `inner` as a control.
///
/// Takes the same coefficient slice as `inner`.
#[derive(Debug, Clone)]
pub struct GradientComponent<C> {
    pub inner: C,
    pub index: usize,
}

impl<C: ControlFn> GradientComponent<C> {
    pub fn new(inner: C, index: usize) -> Self {
        Self { inner, index }
    }
}

impl<C: ControlFn> ControlFn for GradientComponent<C> {
    fn n_coeff(&self) -> usize {
        self.inner.n_coeff()
    }

    fn eval_pq<S: Real>(&self, t: S, pcof: &[S]) -> (S, S) {
        let coeffs: Vec<Dual<S>> = pcof
            .iter()
            .enumerate()
            .map(|(j, &c)| {
                if j == self.index {
                    Dual::variable(c)
                } else {
                    Dual::lift(c)
                }
            })
            .collect();
        let (p, q) = self.inner.eval_pq(Dual::lift(t), &coeffs);
        (p.eps, q.eps)
    }
}

/// Exposes `(pt, qt)` of `inner` as a control.
#[derive(Debug, Clone)]
pub struct TimeDerivative<C> {
    pub inner: C,
}

impl<C: ControlFn> TimeDerivative<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl<C: ControlFn> ControlFn for TimeDerivative<C> {
    fn n_coeff(&self) -> usize {
        self.inner.n_coeff()
    }

    fn eval_pq<S: Real>(&self, t: S, pcof: &[S]) -> (S, S) {
        let coeffs: Vec<Dual<S>> = pcof.iter().map(|&c| Dual::lift(c)).collect();
        let (p, q) = self.inner.eval_pq(Dual::variable(t), &coeffs);
        (p.eps, q.eps)
    }
}
