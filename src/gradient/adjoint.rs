// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Discrete adjoint gradient.
//!
//! The forward recursion `L_{n+1} w_{n+1} = R_n w_n` is differentiated exactly.
//! The adjoint variables solve
//!
//! ```text
//! L_Nᵀ λ_{N−1} = ∇_w J(w_N)
//! L_nᵀ λ_{n−1} = R_nᵀ λ_n          n = N−1, …, 1
//! ```
//!
//! and the gradient is `Σ_n λ_nᵀ (∂R_n/∂θ w_n − ∂L_{n+1}/∂θ w_{n+1})`. With
//! `A_θ` the generator of one coefficient's derivative,
//!
//! ```text
//! λᵀ ∂R/∂θ w = (dt/2) λᵀA_θ w + (dt²/12) B
//! −λᵀ ∂L/∂θ w = (dt/2) λᵀA_θ w − (dt²/12) B
//! B = λᵀA'_θ w + λᵀA_θ (A w) + (Aᵀλ)ᵀ A_θ w
//! ```
//!
//! where `A w` comes from the forward derivative history.

use ndarray::{Array1, ArrayView1};
use tracing::{debug, instrument};

use super::cost::TerminalCost;
use crate::error::{Error, Result};
use crate::evolution::generator::{asym_contraction, sym_contraction, ChannelGradients};
use crate::evolution::hermite::{Side, StepPoint};
use crate::evolution::{Integrator, LinearOperator, Order};

/// Terminal cost and its adjoint gradient from one forward and one backward
/// pass.
#[instrument(skip_all, fields(order = %integrator.order(), nsteps = integrator.nsteps()))]
pub fn adjoint_cost_and_gradient(
    integrator: &Integrator<'_>,
    pcof: &[f64],
    cost: &TerminalCost,
) -> Result<(f64, Array1<f64>)> {
    let traj = integrator.evolve_with_derivatives(pcof)?;
    let rates = traj
        .first_derivatives
        .as_ref()
        .ok_or_else(|| Error::Config("forward pass returned no derivative history".into()))?;

    let nsteps = integrator.nsteps();
    let dt = integrator.dt();
    let w_final = traj.state(nsteps);
    let value = cost.value(w_final);
    let terminal = cost.gradient(w_final);

    let mut grad = Array1::zeros(integrator.controls().n_coeff_total());
    let mut upper = integrator.point(pcof, nsteps)?;
    let mut lambda = integrator.solve_implicit(&upper, &terminal, terminal.clone(), nsteps - 1, true)?;

    for n in (0..nsteps).rev() {
        let lower = integrator.point(pcof, n)?;
        accumulate(
            &mut grad,
            integrator,
            pcof,
            &lower,
            traj.state(n),
            rates.column(n),
            &lambda,
            1.0,
        )?;
        accumulate(
            &mut grad,
            integrator,
            pcof,
            &upper,
            traj.state(n + 1),
            rates.column(n + 1),
            &lambda,
            -1.0,
        )?;

        if n > 0 {
            let rhs = lower.operator_transposed(dt, Side::Explicit).apply(&lambda);
            lambda = integrator.solve_implicit(&lower, &rhs, lambda, n - 1, true)?;
        }
        upper = lower;
    }

    debug!(cost = value, "adjoint gradient assembled");
    Ok((value, grad))
}

/// Gradient of the terminal cost by the discrete adjoint.
pub fn adjoint_gradient(
    integrator: &Integrator<'_>,
    pcof: &[f64],
    cost: &TerminalCost,
) -> Result<Array1<f64>> {
    adjoint_cost_and_gradient(integrator, pcof, cost).map(|(_, grad)| grad)
}

/// Add one time point's contribution `(dt/2)·λᵀA_θ w ± (dt²/12)·B`.
#[allow(clippy::too_many_arguments)]
fn accumulate(
    grad: &mut Array1<f64>,
    integrator: &Integrator<'_>,
    pcof: &[f64],
    point: &StepPoint,
    w: ArrayView1<'_, f64>,
    wt: ArrayView1<'_, f64>,
    lambda: &Array1<f64>,
    sign: f64,
) -> Result<()> {
    let problem = integrator.problem();
    let controls = integrator.controls();
    let dt = integrator.dt();
    let fourth = integrator.order() == Order::Fourth;

    let grads = ChannelGradients::evaluate(controls, point.time, pcof, fourth)?;
    let lam = lambda.view();
    let lambda_t = fourth.then(|| point.generator().apply_transpose(lam));

    for (c, (control, offset)) in controls.iter().enumerate() {
        let sym = &problem.sym_operators()[c];
        let asym = &problem.asym_operators()[c];
        let sigma = sym_contraction(sym, lam, w);
        let kappa = asym_contraction(asym, lam, w);

        let (gp, gq) = (&grads.grad_p[c], &grads.grad_q[c]);
        for j in 0..control.n_coeff() {
            grad[offset + j] += 0.5 * dt * (gp[j] * sigma + gq[j] * kappa);
        }

        if let Some(lambda_t) = lambda_t.as_ref() {
            let sigma2 = sym_contraction(sym, lam, wt) + sym_contraction(sym, lambda_t.view(), w);
            let kappa2 = asym_contraction(asym, lam, wt) + asym_contraction(asym, lambda_t.view(), w);
            let (gpt, gqt) = (&grads.grad_pt[c], &grads.grad_qt[c]);
            let weight = sign * dt * dt / 12.0;
            for j in 0..control.n_coeff() {
                grad[offset + j] += weight
                    * (gpt[j] * sigma + gqt[j] * kappa + gp[j] * sigma2 + gq[j] * kappa2);
            }
        }
    }
    Ok(())
}
