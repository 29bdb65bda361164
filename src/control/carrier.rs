// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Sine-series envelope control.

use std::f64::consts::PI;

use super::dual::Real;
use super::ControlFn;
use crate::error::{Error, Result};

/// `p(t) = Σ_k a_k sin(kπt/tf)`, `q(t) = Σ_k b_k sin(kπt/tf)`, `k = 1..=K`.
///
/// Smooth on `[0, tf]` and zero at both ends. Coefficients are laid out as
/// `[a_1..a_K, b_1..b_K]`. Wrap in
/// [`DirectControl::from_fn`](super::DirectControl::from_fn) to use it as a
/// channel.
#[derive(Debug, Clone)]
pub struct SineCarrierControl {
    n_modes: usize,
    tf: f64,
}

impl SineCarrierControl {
    pub fn new(n_modes: usize, tf: f64) -> Result<Self> {
        if n_modes == 0 {
            return Err(Error::Config("sine carrier needs at least one mode".into()));
        }
        if !(tf > 0.0 && tf.is_finite()) {
            return Err(Error::Config(format!("sine carrier tf must be > 0, got {tf}")));
        }
        Ok(Self { n_modes, tf })
    }

    pub fn n_modes(&self) -> usize {
        self.n_modes
    }
}

impl ControlFn for SineCarrierControl {
    fn n_coeff(&self) -> usize {
        2 * self.n_modes
    }

    fn eval_pq<S: Real>(&self, t: S, pcof: &[S]) -> (S, S) {
        let mut p = S::zero();
        let mut q = S::zero();
        for k in 0..self.n_modes {
            let s = (t * ((k + 1) as f64 * PI / self.tf)).sin();
            p = p + pcof[k] * s;
            q = q + pcof[self.n_modes + k] * s;
        }
        (p, q)
    }
}
