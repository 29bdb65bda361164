// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Control drive amplitudes.
//!
//! A control channel maps a time `t` and its slice of the flat coefficient
//! vector `pcof` to the in-phase and quadrature amplitudes `p(t)`, `q(t)`.
//! Integrators need the time derivatives `pt`, `qt` (order 4) and gradient
//! routines need the parameter gradients of all four quantities.
//!
//! Two traits split the concerns:
//!
//! - [`Control`]: object-safe evaluation contract consumed by integrators.
//! - [`ControlFn`]: a control written once, generically over a [`Real`]
//!   scalar. [`autodiff`] derives every [`Control`] method from it with dual
//!   numbers, and [`DirectControl::from_fn`] packages the result.
//!
//! Channels are grouped in a [`ControlSet`], which owns the partition of
//! `pcof` into contiguous per-channel slices.

pub mod adapters;
pub mod autodiff;
pub mod bspline;
pub mod carrier;
pub mod direct;
pub mod dual;
pub mod piecewise;

use std::fmt;

use crate::error::{Error, Result};

pub use adapters::{GradientComponent, TimeDerivative};
pub use bspline::BSpline2Control;
pub use carrier::SineCarrierControl;
pub use direct::DirectControl;
pub use dual::{Dual, Real};
pub use piecewise::PiecewiseConstantControl;

/// Evaluation contract for a single control channel.
///
/// `pcof` is always this channel's own slice, of length [`Control::n_coeff`].
/// Gradients are returned as vectors of the same length.
pub trait Control: Send + Sync {
    /// Number of coefficients this channel consumes.
    fn n_coeff(&self) -> usize;

    fn eval_p(&self, t: f64, pcof: &[f64]) -> f64;
    fn eval_q(&self, t: f64, pcof: &[f64]) -> f64;

    /// dp/dt
    fn eval_pt(&self, t: f64, pcof: &[f64]) -> f64;
    /// dq/dt
    fn eval_qt(&self, t: f64, pcof: &[f64]) -> f64;

    /// ∇_pcof p
    fn eval_grad_p(&self, t: f64, pcof: &[f64]) -> Vec<f64>;
    /// ∇_pcof q
    fn eval_grad_q(&self, t: f64, pcof: &[f64]) -> Vec<f64>;

    /// ∇_pcof dp/dt
    fn eval_grad_pt(&self, t: f64, pcof: &[f64]) -> Vec<f64>;
    /// ∇_pcof dq/dt
    fn eval_grad_qt(&self, t: f64, pcof: &[f64]) -> Vec<f64>;
}

/// A control written generically over the scalar type.
///
/// Implementations must only use operations available on [`Real`] so that the
/// same code evaluates plain values and every dual-number derivative.
pub trait ControlFn: Send + Sync {
    /// Number of coefficients this channel consumes.
    fn n_coeff(&self) -> usize;

    /// Evaluate `(p(t), q(t))`.
    fn eval_pq<S: Real>(&self, t: S, pcof: &[S]) -> (S, S);
}

/// Ordered sequence of one or more control channels.
///
/// A single-channel problem uses a one-element set. Channel `i` reads
/// `pcof[offsets[i]..offsets[i] + n_coeff_i]`; offsets are recomputed on
/// every [`ControlSet::push`].
pub struct ControlSet {
    controls: Vec<Box<dyn Control>>,
    offsets: Vec<usize>,
    n_coeff_total: usize,
}

impl ControlSet {
    /// Create a set from channels in order.
    pub fn new(controls: Vec<Box<dyn Control>>) -> Result<Self> {
        if controls.is_empty() {
            return Err(Error::Config(
                "a control set needs at least one channel".into(),
            ));
        }
        let mut set = Self {
            controls,
            offsets: Vec::new(),
            n_coeff_total: 0,
        };
        set.recompute_offsets();
        Ok(set)
    }

    /// One-element set.
    pub fn single(control: impl Control + 'static) -> Self {
        let mut set = Self {
            controls: vec![Box::new(control)],
            offsets: Vec::new(),
            n_coeff_total: 0,
        };
        set.recompute_offsets();
        set
    }

    /// Append a channel.
    pub fn push(&mut self, control: impl Control + 'static) {
        self.controls.push(Box::new(control));
        self.recompute_offsets();
    }

    fn recompute_offsets(&mut self) {
        self.offsets.clear();
        let mut offset = 0;
        for c in &self.controls {
            self.offsets.push(offset);
            offset += c.n_coeff();
        }
        self.n_coeff_total = offset;
    }

    /// Number of channels.
    pub fn len(&self) -> usize {
        self.controls.len()
    }

    /// Always false; a set holds at least one channel.
    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    /// Channel `index` (0-based).
    pub fn get(&self, index: usize) -> Result<&dyn Control> {
        self.controls
            .get(index)
            .map(|c| c.as_ref())
            .ok_or(Error::Index {
                index,
                len: self.controls.len(),
            })
    }

    /// Start offset of each channel in `pcof`.
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Total coefficient count across all channels.
    pub fn n_coeff_total(&self) -> usize {
        self.n_coeff_total
    }

    /// Slice of `pcof` belonging to channel `index`.
    pub fn slice<'a>(&self, index: usize, pcof: &'a [f64]) -> Result<&'a [f64]> {
        let control = self.get(index)?;
        let start = self.offsets[index];
        pcof.get(start..start + control.n_coeff())
            .ok_or_else(|| self.length_error(pcof.len()))
    }

    /// Fail unless `pcof` has exactly [`ControlSet::n_coeff_total`] entries.
    pub fn check_pcof(&self, pcof: &[f64]) -> Result<()> {
        if pcof.len() != self.n_coeff_total {
            return Err(self.length_error(pcof.len()));
        }
        Ok(())
    }

    fn length_error(&self, actual: usize) -> Error {
        Error::Config(format!(
            "pcof has {} coefficients, controls declare {}",
            actual, self.n_coeff_total
        ))
    }

    /// Iterate over `(channel, offset)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&dyn Control, usize)> {
        self.controls
            .iter()
            .map(|c| c.as_ref())
            .zip(self.offsets.iter().copied())
    }
}

impl fmt::Debug for ControlSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: Vec<usize> = self.controls.iter().map(|c| c.n_coeff()).collect();
        f.debug_struct("ControlSet")
            .field("n_coeff", &counts)
            .field("offsets", &self.offsets)
            .finish()
    }
}
