// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Finite-difference gradient oracle.

use ndarray::Array1;
use tracing::{debug, instrument};

use super::cost::TerminalCost;
use crate::config::FdScheme;
use crate::error::{Error, Result};
use crate::evolution::Integrator;

/// Terminal cost after one forward run.
pub fn terminal_cost(
    integrator: &Integrator<'_>,
    pcof: &[f64],
    cost: &TerminalCost,
) -> Result<f64> {
    let traj = integrator.evolve(pcof)?;
    Ok(cost.value(traj.state(traj.nsteps())))
}

/// Perturb each coefficient by `epsilon` and difference the terminal cost.
///
/// Costs `2·n_coeff` forward runs (centered) or `n_coeff + 1` (forward).
#[instrument(skip_all, fields(epsilon = epsilon, scheme = ?scheme, n_coeff = pcof.len()))]
pub fn finite_difference_gradient(
    integrator: &Integrator<'_>,
    pcof: &[f64],
    cost: &TerminalCost,
    epsilon: f64,
    scheme: FdScheme,
) -> Result<Array1<f64>> {
    if epsilon.is_nan() || epsilon <= 0.0 {
        return Err(Error::Config(format!(
            "finite-difference epsilon must be > 0, got {epsilon}"
        )));
    }
    integrator.controls().check_pcof(pcof)?;

    let base = match scheme {
        FdScheme::Forward => Some(terminal_cost(integrator, pcof, cost)?),
        FdScheme::Centered => None,
    };

    let mut grad = Array1::zeros(pcof.len());
    let mut perturbed = pcof.to_vec();
    for j in 0..pcof.len() {
        perturbed[j] = pcof[j] + epsilon;
        let plus = terminal_cost(integrator, &perturbed, cost)?;
        grad[j] = match base {
            Some(base) => (plus - base) / epsilon,
            None => {
                perturbed[j] = pcof[j] - epsilon;
                let minus = terminal_cost(integrator, &perturbed, cost)?;
                (plus - minus) / (2.0 * epsilon)
            }
        };
        perturbed[j] = pcof[j];
    }

    debug!("finite-difference gradient complete");
    Ok(grad)
}
