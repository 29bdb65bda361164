// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Integration order and trajectory types.

use std::fmt;

use ndarray::{s, Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Order of the Hermite scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum Order {
    /// Trapezoidal rule, one derivative per side.
    Second,
    /// Hermite rule, two derivatives per side.
    Fourth,
}

impl Order {
    /// Nominal convergence order.
    pub fn as_usize(self) -> usize {
        match self {
            Order::Second => 2,
            Order::Fourth => 4,
        }
    }

    /// Number of time derivatives used on each side of a step, which is also
    /// the depth `k` of a forcing array.
    pub fn n_derivatives(self) -> usize {
        match self {
            Order::Second => 1,
            Order::Fourth => 2,
        }
    }
}

impl TryFrom<usize> for Order {
    type Error = Error;

    fn try_from(order: usize) -> Result<Self, Self::Error> {
        match order {
            2 => Ok(Order::Second),
            4 => Ok(Order::Fourth),
            other => Err(Error::Config(format!(
                "invalid integration order {other}, expected 2 or 4"
            ))),
        }
    }
}

impl From<Order> for usize {
    fn from(order: Order) -> usize {
        order.as_usize()
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_usize())
    }
}

/// State history of one integration run.
///
/// Column `n` of `states` is `[u; v]` at `t_n = n·dt`. Derivative histories,
/// when recorded, have the same shape and include the evaluation at the final
/// time point.
#[derive(Debug, Clone)]
pub struct Trajectory {
    /// States, shape `[2N, nsteps + 1]`
    pub states: Array2<f64>,
    /// First time derivatives `A w` (+ forcing), same shape as `states`
    pub first_derivatives: Option<Array2<f64>>,
    /// Second time derivatives `A' w + A wt` (order 4 only)
    pub second_derivatives: Option<Array2<f64>>,
    /// Step size
    pub dt: f64,
    /// Scheme that produced the trajectory
    pub order: Order,
}

impl Trajectory {
    /// Number of steps taken.
    pub fn nsteps(&self) -> usize {
        self.states.ncols() - 1
    }

    /// State dimension N (half the row count).
    pub fn dim(&self) -> usize {
        self.states.nrows() / 2
    }

    /// State at time index `n`.
    pub fn state(&self, n: usize) -> ArrayView1<'_, f64> {
        self.states.column(n)
    }

    /// Final state `[u; v]`.
    pub fn final_state(&self) -> Array1<f64> {
        self.states.column(self.nsteps()).to_owned()
    }

    /// Real part of the state at every time point, shape `[N, nsteps + 1]`.
    pub fn real_part(&self) -> Array2<f64> {
        self.states.slice(s![..self.dim(), ..]).to_owned()
    }

    /// Imaginary part of the state at every time point.
    pub fn imag_part(&self) -> Array2<f64> {
        self.states.slice(s![self.dim().., ..]).to_owned()
    }

    /// `‖(u, v)‖` at every time point.
    pub fn norms(&self) -> Array1<f64> {
        self.states
            .map_axis(Axis(0), |col| col.dot(&col).sqrt())
    }

    /// Level populations `u_k² + v_k²` of the final state.
    pub fn final_populations(&self) -> Array1<f64> {
        let n = self.dim();
        let w = self.states.column(self.nsteps());
        Array1::from_shape_fn(n, |k| w[k] * w[k] + w[n + k] * w[n + k])
    }
}
