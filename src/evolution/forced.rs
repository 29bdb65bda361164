// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Forced integrator.
//!
//! Integrates `w' = A(t) w + f(t)` with the same Hermite step as the forward
//! integrator. The forcing enters the physics, not just the right-hand side:
//! `xt = A x + f` and, for order 4, `xtt = A' x + A xt + f_t`. On the implicit
//! side this moves a known term to the right:
//!
//! ```text
//! L w' = R w + (dt/2) f₁ − (dt²/12)(A₁ f₁ + f₁ₜ)
//! ```

use ndarray::{s, Array1, Array2, Array3};
use tracing::{debug, instrument};

use super::forward::Integrator;
use super::hermite::{combine, Forcing, Side};
use super::types::{Order, Trajectory};
use crate::config::SolverConfig;
use crate::control::ControlSet;
use crate::error::{Result, ValidationError};
use crate::problem::SchrodingerProblem;

impl<'a> Integrator<'a> {
    /// Integrate with external forcing of shape `[2N, nsteps + 1, k]`,
    /// `k = 1` for order 2 and `k = 2` for order 4.
    ///
    /// Starts from `initial` when given, otherwise from the problem's initial
    /// state.
    #[instrument(level = "debug", skip_all, fields(order = %self.order(), nsteps = self.nsteps()))]
    pub fn evolve_forced(
        &self,
        pcof: &[f64],
        forcing: &Array3<f64>,
        initial: Option<&Array1<f64>>,
    ) -> Result<Trajectory> {
        self.controls().check_pcof(pcof)?;

        let dim = 2 * self.problem().dim();
        let n_points = self.nsteps() + 1;
        let depth = self.order().n_derivatives();
        let expected = [dim, n_points, depth];
        if forcing.shape() != &expected[..] {
            return Err(ValidationError::Dimension {
                what: "forcing".into(),
                expected: format!("{expected:?}"),
                actual: format!("{:?}", forcing.shape()),
            }
            .into());
        }

        let mut w = match initial {
            Some(w0) if w0.len() != dim => {
                return Err(ValidationError::Dimension {
                    what: "initial state".into(),
                    expected: format!("[{dim}]"),
                    actual: format!("[{}]", w0.len()),
                }
                .into());
            }
            Some(w0) => w0.clone(),
            None => self.problem().initial_state(),
        };

        let dt = self.dt();
        let zero = Array1::zeros(dim);
        let mut states = Array2::zeros((dim, n_points));
        states.column_mut(0).assign(&w);

        let mut current = self.point(pcof, 0)?;
        for n in 0..self.nsteps() {
            let f0 = forcing_at(forcing, n, self.order());
            let (xt, xtt) = current.derivatives(w.view(), Some(&f0));
            let mut rhs = combine(w.view(), &xt, xtt.as_ref(), dt, Side::Explicit);

            let next = self.point(pcof, n + 1)?;
            let f1 = forcing_at(forcing, n + 1, self.order());
            let (ft, ftt) = next.derivatives(zero.view(), Some(&f1));
            rhs -= &combine(zero.view(), &ft, ftt.as_ref(), dt, Side::Implicit);

            w = self.solve_implicit(&next, &rhs, w, n, false)?;
            states.column_mut(n + 1).assign(&w);
            current = next;
        }

        debug!("forced integration complete");

        Ok(Trajectory {
            states,
            first_derivatives: None,
            second_derivatives: None,
            dt,
            order: self.order(),
        })
    }
}

fn forcing_at(forcing: &Array3<f64>, n: usize, order: Order) -> Forcing<'_> {
    Forcing {
        first: forcing.slice(s![.., n, 0]),
        second: (order == Order::Fourth).then(|| forcing.slice(s![.., n, 1])),
    }
}

/// Forced integration at the problem's own resolution.
pub fn evolve_forced(
    problem: &SchrodingerProblem,
    controls: &ControlSet,
    pcof: &[f64],
    order: Order,
    solver: &SolverConfig,
    forcing: &Array3<f64>,
    initial: Option<&Array1<f64>>,
) -> Result<Trajectory> {
    Integrator::new(problem, controls, order, solver)?.evolve_forced(pcof, forcing, initial)
}
