// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Piecewise-constant (GRAPE-style) control.

use super::dual::Real;
use super::{Control, ControlFn};
use crate::error::{Error, Result};

/// `M` constant amplitudes per quadrature on equal sub-intervals of `[0, tf]`.
///
/// Coefficients are `[p_0..p_{M−1}, q_0..q_{M−1}]`. The region of `t` is
/// `floor(t/(tf/M))` clamped to `[0, M−1]`, so `t = tf` falls in the last
/// region.
///
/// The time derivative is reported as zero everywhere, including at region
/// boundaries where the amplitude jumps. Fourth-order integration of such a
/// control is therefore only first-order accurate across jumps.
#[derive(Debug, Clone)]
pub struct PiecewiseConstantControl {
    n_amplitudes: usize,
    region_width: f64,
}

impl PiecewiseConstantControl {
    pub fn new(n_amplitudes: usize, tf: f64) -> Result<Self> {
        if n_amplitudes == 0 {
            return Err(Error::Config(
                "piecewise control needs at least one amplitude".into(),
            ));
        }
        if !(tf > 0.0 && tf.is_finite()) {
            return Err(Error::Config(format!(
                "piecewise control tf must be > 0, got {tf}"
            )));
        }
        Ok(Self {
            n_amplitudes,
            region_width: tf / n_amplitudes as f64,
        })
    }

    /// Amplitudes per quadrature.
    pub fn n_amplitudes(&self) -> usize {
        self.n_amplitudes
    }

    /// Region index containing `t`.
    pub fn region(&self, t: f64) -> usize {
        let r = (t / self.region_width).floor();
        if r.is_nan() || r < 0.0 {
            0
        } else {
            (r as usize).min(self.n_amplitudes - 1)
        }
    }

    fn unit(&self, index: usize) -> Vec<f64> {
        let mut g = vec![0.0; 2 * self.n_amplitudes];
        g[index] = 1.0;
        g
    }
}

impl Control for PiecewiseConstantControl {
    fn n_coeff(&self) -> usize {
        2 * self.n_amplitudes
    }

    fn eval_p(&self, t: f64, pcof: &[f64]) -> f64 {
        pcof[self.region(t)]
    }

    fn eval_q(&self, t: f64, pcof: &[f64]) -> f64 {
        pcof[self.n_amplitudes + self.region(t)]
    }

    fn eval_pt(&self, _t: f64, _pcof: &[f64]) -> f64 {
        0.0
    }

    fn eval_qt(&self, _t: f64, _pcof: &[f64]) -> f64 {
        0.0
    }

    fn eval_grad_p(&self, t: f64, _pcof: &[f64]) -> Vec<f64> {
        self.unit(self.region(t))
    }

    fn eval_grad_q(&self, t: f64, _pcof: &[f64]) -> Vec<f64> {
        self.unit(self.n_amplitudes + self.region(t))
    }

    fn eval_grad_pt(&self, _t: f64, _pcof: &[f64]) -> Vec<f64> {
        vec![0.0; 2 * self.n_amplitudes]
    }

    fn eval_grad_qt(&self, _t: f64, _pcof: &[f64]) -> Vec<f64> {
        vec![0.0; 2 * self.n_amplitudes]
    }
}

impl ControlFn for PiecewiseConstantControl {
    fn n_coeff(&self) -> usize {
        2 * self.n_amplitudes
    }

    fn eval_pq<S: Real>(&self, t: S, pcof: &[S]) -> (S, S) {
        let r = self.region(t.value());
        (pcof[r], pcof[self.n_amplitudes + r])
    }
}
