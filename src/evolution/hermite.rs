// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Hermite step algebra shared by forward, forced and adjoint passes.
//!
//! One step from `t_n` to `t_{n+1}` solves
//!
//! ```text
//! L_{n+1} w_{n+1} = R_n w_n
//! R x = x + (dt/2)(w₀ xt + (dt/2) w₁ xtt)   weights [1,  1/3] at t_n
//! L x = x − (dt/2)(w₀ xt + (dt/2) w₁ xtt)   weights [1, −1/3] at t_{n+1}
//! ```
//!
//! with `xt = A x` and `xtt = A' x + A xt`. Order 2 keeps only the `xt`
//! term. Both sides reduce to `x ± (dt/2) xt + (dt²/12) xtt`.

use ndarray::{Array1, ArrayView1};

use super::generator::{ChannelValues, Generator};
use super::krylov::LinearOperator;
use super::types::Order;
use crate::control::ControlSet;
use crate::error::Result;
use crate::problem::SchrodingerProblem;

/// Derivative weights of the explicit half step.
pub const EXPLICIT_WEIGHTS: [f64; 2] = [1.0, 1.0 / 3.0];

/// Derivative weights of the implicit half step.
pub const IMPLICIT_WEIGHTS: [f64; 2] = [1.0, -1.0 / 3.0];

/// Which half of the step a combination belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Right-hand side, evaluated at the start of the step
    Explicit,
    /// Operator solved for, evaluated at the end of the step
    Implicit,
}

impl Side {
    fn sign(self) -> f64 {
        match self {
            Side::Explicit => 1.0,
            Side::Implicit => -1.0,
        }
    }

    fn weights(self) -> [f64; 2] {
        match self {
            Side::Explicit => EXPLICIT_WEIGHTS,
            Side::Implicit => IMPLICIT_WEIGHTS,
        }
    }
}

/// `x + sign·(dt/2)·(w₀ xt + (dt/2) w₁ xtt)`
pub fn combine(
    x: ArrayView1<'_, f64>,
    xt: &Array1<f64>,
    xtt: Option<&Array1<f64>>,
    dt: f64,
    side: Side,
) -> Array1<f64> {
    let [w0, w1] = side.weights();
    let half = side.sign() * 0.5 * dt;
    let mut out = x.to_owned();
    out.scaled_add(half * w0, xt);
    if let Some(xtt) = xtt {
        out.scaled_add(half * 0.5 * dt * w1, xtt);
    }
    out
}

/// External forcing at one time point: added to `xt`, and for order 4 its
/// time derivative added to `xtt`.
#[derive(Debug, Clone, Copy)]
pub struct Forcing<'a> {
    pub first: ArrayView1<'a, f64>,
    pub second: Option<ArrayView1<'a, f64>>,
}

/// Generator data at one time point.
#[derive(Debug, Clone)]
pub struct StepPoint {
    pub time: f64,
    pub order: Order,
    generator: Generator,
    rate: Option<Generator>,
}

impl StepPoint {
    /// Evaluate the controls at `time` and assemble `A` (and `A'` for order 4).
    pub fn new(
        problem: &SchrodingerProblem,
        controls: &ControlSet,
        pcof: &[f64],
        time: f64,
        order: Order,
    ) -> Result<Self> {
        let with_rates = order == Order::Fourth;
        let values = ChannelValues::evaluate(controls, time, pcof, with_rates)?;
        Ok(Self {
            time,
            order,
            generator: Generator::at(problem, &values),
            rate: with_rates.then(|| Generator::rate(problem, &values)),
        })
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    /// `(xt, xtt)` of state `x`, with optional forcing.
    pub fn derivatives(
        &self,
        x: ArrayView1<'_, f64>,
        forcing: Option<&Forcing<'_>>,
    ) -> (Array1<f64>, Option<Array1<f64>>) {
        let mut xt = self.generator.apply(x);
        if let Some(f) = forcing {
            xt += &f.first;
        }
        let xtt = self.rate.as_ref().map(|rate| {
            let mut xtt = rate.apply(x) + self.generator.apply(xt.view());
            if let Some(second) = forcing.and_then(|f| f.second) {
                xtt += &second;
            }
            xtt
        });
        (xt, xtt)
    }

    /// Transposed derivatives: `(Aᵀ x, A'ᵀ x + Aᵀ Aᵀ x)`.
    pub fn derivatives_transposed(
        &self,
        x: ArrayView1<'_, f64>,
    ) -> (Array1<f64>, Option<Array1<f64>>) {
        let xt = self.generator.apply_transpose(x);
        let xtt = self
            .rate
            .as_ref()
            .map(|rate| rate.apply_transpose(x) + self.generator.apply_transpose(xt.view()));
        (xt, xtt)
    }

    /// Step operator of one side at this point.
    pub fn operator(&self, dt: f64, side: Side) -> StepOperator<'_> {
        StepOperator {
            point: self,
            dt,
            side,
            transposed: false,
        }
    }

    /// Transposed step operator of one side at this point.
    pub fn operator_transposed(&self, dt: f64, side: Side) -> StepOperator<'_> {
        StepOperator {
            point: self,
            dt,
            side,
            transposed: true,
        }
    }
}

/// `R`, `L` or their transposes at one time point.
///
/// Holds only a shared reference to precomputed generator data, so repeated
/// applications inside a Krylov solve are pure.
#[derive(Debug, Clone, Copy)]
pub struct StepOperator<'a> {
    point: &'a StepPoint,
    dt: f64,
    side: Side,
    transposed: bool,
}

impl LinearOperator for StepOperator<'_> {
    fn dim(&self) -> usize {
        self.point.generator.dim()
    }

    fn apply(&self, x: &Array1<f64>) -> Array1<f64> {
        let (xt, xtt) = if self.transposed {
            self.point.derivatives_transposed(x.view())
        } else {
            self.point.derivatives(x.view(), None)
        };
        combine(x.view(), &xt, xtt.as_ref(), self.dt, self.side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{driven_transmon, sample_pcof};
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_combine_coefficients() {
        let x = array![1.0];
        let xt = array![2.0];
        let xtt = array![3.0];
        let dt = 0.1;
        // x + dt/2·xt + dt²/12·xtt
        let r = combine(x.view(), &xt, Some(&xtt), dt, Side::Explicit);
        assert_relative_eq!(r[0], 1.0 + 0.1 + 0.0025, epsilon = 1e-15);
        // x − dt/2·xt + dt²/12·xtt
        let l = combine(x.view(), &xt, Some(&xtt), dt, Side::Implicit);
        assert_relative_eq!(l[0], 1.0 - 0.1 + 0.0025, epsilon = 1e-15);
        // order 2
        let l2 = combine(x.view(), &xt, None, dt, Side::Implicit);
        assert_relative_eq!(l2[0], 0.9, epsilon = 1e-15);
    }

    #[test]
    fn test_transposed_operator_is_adjoint() {
        let (problem, controls) = driven_transmon();
        let pcof = sample_pcof(&controls);
        for order in [Order::Second, Order::Fourth] {
            let point = StepPoint::new(&problem, &controls, &pcof, 0.37, order).unwrap();
            let x = array![0.3, -0.1, 0.5, 0.2, -0.4, 0.6];
            let y = array![-0.2, 0.7, 0.1, 0.05, 0.3, -0.5];
            for side in [Side::Explicit, Side::Implicit] {
                let op = point.operator(0.05, side);
                let op_t = point.operator_transposed(0.05, side);
                assert_relative_eq!(
                    y.dot(&op.apply(&x)),
                    x.dot(&op_t.apply(&y)),
                    epsilon = 1e-14
                );
            }
        }
    }

    #[test]
    fn test_forcing_enters_both_derivatives() {
        let (problem, controls) = driven_transmon();
        let pcof = sample_pcof(&controls);
        let point = StepPoint::new(&problem, &controls, &pcof, 0.2, Order::Fourth).unwrap();
        let x = Array1::zeros(6);
        let f0 = array![1.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let f1 = array![0.0, 0.0, 0.0, 0.0, 0.0, 2.0];
        let forcing = Forcing {
            first: f0.view(),
            second: Some(f1.view()),
        };
        let (xt, xtt) = point.derivatives(x.view(), Some(&forcing));
        assert_eq!(xt, f0);
        let expected = point.generator().apply(f0.view()) + &f1;
        assert_eq!(xtt.unwrap(), expected);
    }
}
