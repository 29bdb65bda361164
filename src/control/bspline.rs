// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Quadratic B-spline envelope control.
//!
//! `D` uniform quadratic B-splines with knot spacing `Δ = tf/(D−2)`, centers
//! `c_k = (k − 0.5)Δ` (0-based `k`) and support width `3Δ`. With
//! `τ = (t − c_k)/(3Δ)`:
//!
//! ```text
//! B(τ) = 9/8 + 4.5τ + 4.5τ²   −1/2 ≤ τ < −1/6
//!        3/4 − 9τ²            −1/6 ≤ τ <  1/6
//!        9/8 − 4.5τ + 4.5τ²    1/6 ≤ τ <  1/2
//!        0                    otherwise
//! ```
//!
//! `pcof[..D]` weights the splines for `p`, `pcof[D..]` for `q`.

use super::dual::Real;
use super::{Control, ControlFn};
use crate::error::{Error, Result};

const ONE_SIXTH: f64 = 1.0 / 6.0;

/// Quadratic B-spline control with `2·D` coefficients.
#[derive(Debug, Clone)]
pub struct BSpline2Control {
    n_splines: usize,
    spacing: f64,
    width: f64,
}

impl BSpline2Control {
    /// `n_splines` basis functions per quadrature over `[0, tf]`.
    pub fn new(n_splines: usize, tf: f64) -> Result<Self> {
        if n_splines < 3 {
            return Err(Error::Config(format!(
                "B-spline control needs at least 3 splines, got {n_splines}"
            )));
        }
        if !(tf > 0.0 && tf.is_finite()) {
            return Err(Error::Config(format!("B-spline tf must be > 0, got {tf}")));
        }
        let spacing = tf / (n_splines - 2) as f64;
        Ok(Self {
            n_splines,
            spacing,
            width: 3.0 * spacing,
        })
    }

    /// Number of splines per quadrature.
    pub fn n_splines(&self) -> usize {
        self.n_splines
    }

    fn center(&self, k: usize) -> f64 {
        (k as f64 - 0.5) * self.spacing
    }

    fn tau(&self, k: usize, t: f64) -> f64 {
        (t - self.center(k)) / self.width
    }

    fn basis(tau: f64) -> f64 {
        if (-0.5..-ONE_SIXTH).contains(&tau) {
            9.0 / 8.0 + 4.5 * tau + 4.5 * tau * tau
        } else if (-ONE_SIXTH..ONE_SIXTH).contains(&tau) {
            0.75 - 9.0 * tau * tau
        } else if (ONE_SIXTH..0.5).contains(&tau) {
            9.0 / 8.0 - 4.5 * tau + 4.5 * tau * tau
        } else {
            0.0
        }
    }

    /// dB/dτ
    fn basis_derivative(tau: f64) -> f64 {
        if (-0.5..-ONE_SIXTH).contains(&tau) {
            4.5 + 9.0 * tau
        } else if (-ONE_SIXTH..ONE_SIXTH).contains(&tau) {
            -18.0 * tau
        } else if (ONE_SIXTH..0.5).contains(&tau) {
            -4.5 + 9.0 * tau
        } else {
            0.0
        }
    }

    /// Spline values at `t`.
    fn basis_values(&self, t: f64) -> Vec<f64> {
        (0..self.n_splines)
            .map(|k| Self::basis(self.tau(k, t)))
            .collect()
    }

    /// Spline time derivatives at `t`.
    fn basis_rates(&self, t: f64) -> Vec<f64> {
        (0..self.n_splines)
            .map(|k| Self::basis_derivative(self.tau(k, t)) / self.width)
            .collect()
    }

    fn weighted(weights: &[f64], basis: &[f64]) -> f64 {
        weights.iter().zip(basis).map(|(w, b)| w * b).sum()
    }

    /// `[b, 0]` for the p quadrature, `[0, b]` for q.
    fn embed(&self, basis: Vec<f64>, quadrature: usize) -> Vec<f64> {
        let mut out = vec![0.0; 2 * self.n_splines];
        let start = quadrature * self.n_splines;
        out[start..start + self.n_splines].copy_from_slice(&basis);
        out
    }
}

impl Control for BSpline2Control {
    fn n_coeff(&self) -> usize {
        2 * self.n_splines
    }

    fn eval_p(&self, t: f64, pcof: &[f64]) -> f64 {
        Self::weighted(&pcof[..self.n_splines], &self.basis_values(t))
    }

    fn eval_q(&self, t: f64, pcof: &[f64]) -> f64 {
        Self::weighted(&pcof[self.n_splines..], &self.basis_values(t))
    }

    fn eval_pt(&self, t: f64, pcof: &[f64]) -> f64 {
        Self::weighted(&pcof[..self.n_splines], &self.basis_rates(t))
    }

    fn eval_qt(&self, t: f64, pcof: &[f64]) -> f64 {
        Self::weighted(&pcof[self.n_splines..], &self.basis_rates(t))
    }

    fn eval_grad_p(&self, t: f64, _pcof: &[f64]) -> Vec<f64> {
        self.embed(self.basis_values(t), 0)
    }

    fn eval_grad_q(&self, t: f64, _pcof: &[f64]) -> Vec<f64> {
        self.embed(self.basis_values(t), 1)
    }

    fn eval_grad_pt(&self, t: f64, _pcof: &[f64]) -> Vec<f64> {
        self.embed(self.basis_rates(t), 0)
    }

    fn eval_grad_qt(&self, t: f64, _pcof: &[f64]) -> Vec<f64> {
        self.embed(self.basis_rates(t), 1)
    }
}

impl ControlFn for BSpline2Control {
    fn n_coeff(&self) -> usize {
        2 * self.n_splines
    }

    fn eval_pq<S: Real>(&self, t: S, pcof: &[S]) -> (S, S) {
        let d = self.n_splines;
        let mut p = S::zero();
        let mut q = S::zero();
        for k in 0..d {
            let tau = (t - self.center(k)) / self.width;
            let tv = tau.value();
            let b = if (-0.5..-ONE_SIXTH).contains(&tv) {
                tau * tau * 4.5 + tau * 4.5 + 9.0 / 8.0
            } else if (-ONE_SIXTH..ONE_SIXTH).contains(&tv) {
                -(tau * tau * 9.0) + 0.75
            } else if (ONE_SIXTH..0.5).contains(&tv) {
                tau * tau * 4.5 - tau * 4.5 + 9.0 / 8.0
            } else {
                continue;
            };
            p = p + pcof[k] * b;
            q = q + pcof[d + k] * b;
        }
        (p, q)
    }
}
