// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Optimizer-facing objective.

use ndarray::Array1;

use super::adjoint::adjoint_cost_and_gradient;
use super::cost::TerminalCost;
use super::finite_diff::{finite_difference_gradient, terminal_cost};
use super::sensitivity::forced_gradient;
use crate::config::Config;
use crate::control::ControlSet;
use crate::error::{Result, ValidationError};
use crate::evolution::{Integrator, Order};
use crate::problem::SchrodingerProblem;

/// Default box bound on every coefficient.
pub const DEFAULT_BOUND: f64 = 1.0;

/// Per-coefficient box constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    pub lower: Array1<f64>,
    pub upper: Array1<f64>,
}

impl Bounds {
    pub fn new(lower: Array1<f64>, upper: Array1<f64>) -> Result<Self> {
        if lower.len() != upper.len() {
            return Err(ValidationError::Dimension {
                what: "upper bounds".into(),
                expected: format!("[{}]", lower.len()),
                actual: format!("[{}]", upper.len()),
            }
            .into());
        }
        let invalid = |j: usize| lower[j].is_nan() || upper[j].is_nan() || lower[j] > upper[j];
        if let Some(j) = (0..lower.len()).find(|&j| invalid(j)) {
            return Err(ValidationError::Field {
                field: format!("bounds[{j}]"),
                message: format!("need lower <= upper, got [{}, {}]", lower[j], upper[j]),
            }
            .into());
        }
        Ok(Self { lower, upper })
    }

    /// `[-bound, bound]` on each of `n` coefficients.
    pub fn symmetric(n: usize, bound: f64) -> Result<Self> {
        let bound = bound.abs();
        Self::new(Array1::from_elem(n, -bound), Array1::from_elem(n, bound))
    }

    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    pub fn contains(&self, pcof: &[f64]) -> bool {
        pcof.len() == self.len()
            && pcof
                .iter()
                .enumerate()
                .all(|(j, &x)| x >= self.lower[j] && x <= self.upper[j])
    }

    /// Clamp each coefficient into its interval.
    pub fn project(&self, pcof: &[f64]) -> Result<Vec<f64>> {
        if pcof.len() != self.len() {
            return Err(ValidationError::Dimension {
                what: "pcof".into(),
                expected: format!("[{}]", self.len()),
                actual: format!("[{}]", pcof.len()),
            }
            .into());
        }
        Ok(pcof
            .iter()
            .zip(self.lower.iter().zip(self.upper.iter()))
            .map(|(&x, (&lo, &hi))| x.clamp(lo, hi))
            .collect())
    }
}

/// Cost `f(pcof)` and gradient `∇f(pcof)` for a bound-constrained optimizer.
#[derive(Debug)]
pub struct Objective<'a> {
    integrator: Integrator<'a>,
    cost: TerminalCost,
    config: &'a Config,
    bounds: Bounds,
}

impl<'a> Objective<'a> {
    pub fn new(
        problem: &'a SchrodingerProblem,
        controls: &'a ControlSet,
        cost: TerminalCost,
        order: Order,
        config: &'a Config,
    ) -> Result<Self> {
        let integrator = Integrator::new(problem, controls, order, &config.solver)?;
        Ok(Self {
            integrator,
            cost,
            config,
            bounds: Bounds::symmetric(controls.n_coeff_total(), DEFAULT_BOUND)?,
        })
    }

    /// Replace the default `±1` bounds.
    pub fn with_bounds(mut self, bounds: Bounds) -> Result<Self> {
        let n = self.integrator.controls().n_coeff_total();
        if bounds.len() != n {
            return Err(ValidationError::Dimension {
                what: "bounds".into(),
                expected: format!("[{n}]"),
                actual: format!("[{}]", bounds.len()),
            }
            .into());
        }
        self.bounds = bounds;
        Ok(self)
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn integrator(&self) -> &Integrator<'a> {
        &self.integrator
    }

    pub fn terminal_cost(&self) -> &TerminalCost {
        &self.cost
    }

    /// Number of optimization variables.
    pub fn n_coeff(&self) -> usize {
        self.integrator.controls().n_coeff_total()
    }

    /// Terminal cost after a forward run.
    pub fn cost(&self, pcof: &[f64]) -> Result<f64> {
        terminal_cost(&self.integrator, pcof, &self.cost)
    }

    /// Adjoint gradient.
    pub fn gradient(&self, pcof: &[f64]) -> Result<Array1<f64>> {
        self.cost_and_gradient(pcof).map(|(_, g)| g)
    }

    pub fn cost_and_gradient(&self, pcof: &[f64]) -> Result<(f64, Array1<f64>)> {
        adjoint_cost_and_gradient(&self.integrator, pcof, &self.cost)
    }

    /// Finite-difference oracle with the configured epsilon and scheme.
    pub fn finite_difference_gradient(&self, pcof: &[f64]) -> Result<Array1<f64>> {
        finite_difference_gradient(
            &self.integrator,
            pcof,
            &self.cost,
            self.config.gradient.fd_epsilon,
            self.config.gradient.fd_scheme,
        )
    }

    /// Forward-sensitivity gradient.
    pub fn forced_gradient(&self, pcof: &[f64]) -> Result<Array1<f64>> {
        forced_gradient(&self.integrator, pcof, &self.cost)
    }
}
