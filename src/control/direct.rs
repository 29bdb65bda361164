// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Closure-based control.

use std::fmt;
use std::sync::Arc;

use super::{autodiff, Control, ControlFn};

type ScalarFn = Box<dyn Fn(f64, &[f64]) -> f64 + Send + Sync>;
type GradientFn = Box<dyn Fn(f64, &[f64]) -> Vec<f64> + Send + Sync>;

/// Control backed by explicit closures.
///
/// Every closure is built once, at construction. [`DirectControl::from_fn`]
/// derives all derivative and gradient closures from a [`ControlFn`] by
/// automatic differentiation; the `with_*` builders replace them with
/// hand-written versions.
pub struct DirectControl {
    n_coeff: usize,
    p: ScalarFn,
    q: ScalarFn,
    pt: ScalarFn,
    qt: ScalarFn,
    grad_p: GradientFn,
    grad_q: GradientFn,
    grad_pt: GradientFn,
    grad_qt: GradientFn,
}

impl DirectControl {
    /// Build a control from a generic definition.
    pub fn from_fn<C: ControlFn + 'static>(control: C) -> Self {
        let c = Arc::new(control);
        let n_coeff = c.n_coeff();

        let (c1, c2, c3, c4) = (c.clone(), c.clone(), c.clone(), c.clone());
        let (c5, c6, c7, c8) = (c.clone(), c.clone(), c.clone(), c);

        Self {
            n_coeff,
            p: Box::new(move |t: f64, pcof: &[f64]| {
                autodiff::values(c1.as_ref(), t, pcof).0
            }),
            q: Box::new(move |t: f64, pcof: &[f64]| {
                autodiff::values(c2.as_ref(), t, pcof).1
            }),
            pt: Box::new(move |t: f64, pcof: &[f64]| {
                autodiff::time_derivatives(c3.as_ref(), t, pcof).0
            }),
            qt: Box::new(move |t: f64, pcof: &[f64]| {
                autodiff::time_derivatives(c4.as_ref(), t, pcof).1
            }),
            grad_p: Box::new(move |t: f64, pcof: &[f64]| {
                autodiff::parameter_gradients(c5.as_ref(), t, pcof).0
            }),
            grad_q: Box::new(move |t: f64, pcof: &[f64]| {
                autodiff::parameter_gradients(c6.as_ref(), t, pcof).1
            }),
            grad_pt: Box::new(move |t: f64, pcof: &[f64]| {
                autodiff::parameter_gradients_dt(c7.as_ref(), t, pcof).0
            }),
            grad_qt: Box::new(move |t: f64, pcof: &[f64]| {
                autodiff::parameter_gradients_dt(c8.as_ref(), t, pcof).1
            }),
        }
    }

    /// Replace the time-derivative closures.
    pub fn with_time_derivatives<P, Q>(mut self, pt: P, qt: Q) -> Self
    where
        P: Fn(f64, &[f64]) -> f64 + Send + Sync + 'static,
        Q: Fn(f64, &[f64]) -> f64 + Send + Sync + 'static,
    {
        self.pt = Box::new(pt);
        self.qt = Box::new(qt);
        self
    }

    /// Replace the parameter-gradient closures of `p` and `q`.
    pub fn with_gradients<P, Q>(mut self, grad_p: P, grad_q: Q) -> Self
    where
        P: Fn(f64, &[f64]) -> Vec<f64> + Send + Sync + 'static,
        Q: Fn(f64, &[f64]) -> Vec<f64> + Send + Sync + 'static,
    {
        self.grad_p = Box::new(grad_p);
        self.grad_q = Box::new(grad_q);
        self
    }

    /// Replace the parameter-gradient closures of `pt` and `qt`.
    pub fn with_gradient_time_derivatives<P, Q>(mut self, grad_pt: P, grad_qt: Q) -> Self
    where
        P: Fn(f64, &[f64]) -> Vec<f64> + Send + Sync + 'static,
        Q: Fn(f64, &[f64]) -> Vec<f64> + Send + Sync + 'static,
    {
        self.grad_pt = Box::new(grad_pt);
        self.grad_qt = Box::new(grad_qt);
        self
    }
}

impl fmt::Debug for DirectControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectControl")
            .field("n_coeff", &self.n_coeff)
            .finish_non_exhaustive()
    }
}

impl Control for DirectControl {
    fn n_coeff(&self) -> usize {
        self.n_coeff
    }

    fn eval_p(&self, t: f64, pcof: &[f64]) -> f64 {
        (self.p)(t, pcof)
    }

    fn eval_q(&self, t: f64, pcof: &[f64]) -> f64 {
        (self.q)(t, pcof)
    }

    fn eval_pt(&self, t: f64, pcof: &[f64]) -> f64 {
        (self.pt)(t, pcof)
    }

    fn eval_qt(&self, t: f64, pcof: &[f64]) -> f64 {
        (self.qt)(t, pcof)
    }

    fn eval_grad_p(&self, t: f64, pcof: &[f64]) -> Vec<f64> {
        (self.grad_p)(t, pcof)
    }

    fn eval_grad_q(&self, t: f64, pcof: &[f64]) -> Vec<f64> {
        (self.grad_q)(t, pcof)
    }

    fn eval_grad_pt(&self, t: f64, pcof: &[f64]) -> Vec<f64> {
        (self.grad_pt)(t, pcof)
    }

    fn eval_grad_qt(&self, t: f64, pcof: &[f64]) -> Vec<f64> {
        (self.grad_qt)(t, pcof)
    }
}
