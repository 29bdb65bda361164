// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Step-size halving sweep with error, empirical order and timing.

use std::fmt;
use std::time::Instant;

use ndarray::{Array1, Array2};
use serde::Serialize;
use tracing::{debug, info, instrument};

use super::richardson::{relative_error, richardson_error};
use crate::config::{ConvergenceConfig, SolverConfig};
use crate::control::ControlSet;
use crate::error::{Error, Result};
use crate::evolution::{Integrator, Order};
use crate::problem::SchrodingerProblem;

/// Sweep settings.
#[derive(Debug, Clone)]
pub struct SweepOptions {
    /// Number of halvings after the base step count
    pub n_iterations: usize,
    /// Timed repetitions per configuration
    pub n_runs: usize,
    /// Stop refining an order once its error is below this value
    pub error_floor: f64,
    /// Errors must be below this before growth counts as saturation
    pub saturation_threshold: f64,
    /// Externally supplied high-resolution states; Richardson mode when `None`
    pub reference: Option<Array2<f64>>,
}

impl SweepOptions {
    pub fn with_reference(mut self, reference: Array2<f64>) -> Self {
        self.reference = Some(reference);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.n_iterations < 1 {
            return Err(Error::Config("n_iterations must be >= 1".into()));
        }
        if self.n_runs < 1 {
            return Err(Error::Config("n_runs must be >= 1".into()));
        }
        Ok(())
    }
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self::from(&ConvergenceConfig::default())
    }
}

impl From<&ConvergenceConfig> for SweepOptions {
    fn from(config: &ConvergenceConfig) -> Self {
        Self {
            n_iterations: config.n_iterations,
            n_runs: config.n_runs,
            error_floor: config.error_floor,
            saturation_threshold: config.saturation_threshold,
            reference: None,
        }
    }
}

/// Sweep results. Rows follow `orders`, columns follow `step_counts`;
/// slots that were not run (or have no error estimate) hold NaN.
#[derive(Debug, Clone, Serialize)]
pub struct ConvergenceReport {
    pub orders: Vec<usize>,
    pub step_counts: Vec<usize>,
    pub step_sizes: Vec<f64>,
    pub errors: Array2<f64>,
    /// Mean wall-clock seconds per run
    pub timings: Array2<f64>,
    /// Sample standard deviation of the run times
    pub timing_std: Array2<f64>,
}

impl ConvergenceReport {
    /// `log2(e_{k−1} / e_k)` for each refinement; column 0 is NaN.
    pub fn estimated_orders(&self) -> Array2<f64> {
        let mut rates = Array2::from_elem(self.errors.raw_dim(), f64::NAN);
        for i in 0..self.errors.nrows() {
            for k in 1..self.errors.ncols() {
                rates[[i, k]] = (self.errors[[i, k - 1]] / self.errors[[i, k]]).log2();
            }
        }
        rates
    }
}

impl fmt::Display for ConvergenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rates = self.estimated_orders();
        for (i, order) in self.orders.iter().enumerate() {
            writeln!(f, "order {order}")?;
            writeln!(
                f,
                "  {:>8} {:>12} {:>12} {:>8} {:>12} {:>12}",
                "nsteps", "dt", "error", "rate", "time [s]", "std [s]"
            )?;
            for (k, (&n, &h)) in self.step_counts.iter().zip(&self.step_sizes).enumerate() {
                writeln!(
                    f,
                    "  {:>8} {:>12.4e} {:>12.4e} {:>8.3} {:>12.4e} {:>12.4e}",
                    n,
                    h,
                    self.errors[[i, k]],
                    rates[[i, k]],
                    self.timings[[i, k]],
                    self.timing_std[[i, k]]
                )?;
            }
        }
        Ok(())
    }
}

/// Rerun the integrator at `nsteps·2^k`, `k = 0..=n_iterations`, for each
/// order and record the error of every run.
///
/// With a reference the error is measured against it directly; otherwise
/// level `k` is paired with level `k − 1` through Richardson extrapolation.
#[instrument(skip_all, fields(orders = ?orders, n_iterations = options.n_iterations))]
pub fn convergence_sweep(
    problem: &SchrodingerProblem,
    controls: &ControlSet,
    pcof: &[f64],
    orders: &[Order],
    solver: &SolverConfig,
    options: &SweepOptions,
) -> Result<ConvergenceReport> {
    options.validate()?;
    if orders.is_empty() {
        return Err(Error::Config("at least one order is required".into()));
    }
    controls.check_pcof(pcof)?;

    let levels = options
        .n_iterations
        .checked_add(1)
        .ok_or_else(|| Error::Config("n_iterations is too large".into()))?;
    let step_counts = (0..levels)
        .map(|k| {
            u32::try_from(k)
                .ok()
                .and_then(|k| 1usize.checked_shl(k))
                .and_then(|factor| problem.nsteps().checked_mul(factor))
                .ok_or_else(|| Error::Config(format!("step count overflows after {k} halvings")))
        })
        .collect::<Result<Vec<usize>>>()?;
    let step_sizes: Vec<f64> = step_counts.iter().map(|&n| problem.dt(n)).collect();
    let shape = (orders.len(), levels);
    let mut errors = Array2::from_elem(shape, f64::NAN);
    let mut timings = Array2::from_elem(shape, f64::NAN);
    let mut timing_std = Array2::from_elem(shape, f64::NAN);

    let mode = if options.reference.is_some() {
        "reference"
    } else {
        "richardson"
    };
    info!(
        mode,
        base_nsteps = problem.nsteps(),
        "starting convergence sweep"
    );

    for (i, &order) in orders.iter().enumerate() {
        let integrator = Integrator::new(problem, controls, order, solver)?;
        let mut previous: Option<Array2<f64>> = None;

        for (k, &nsteps) in step_counts.iter().enumerate() {
            let run = integrator.with_nsteps(nsteps)?;
            let mut seconds = Vec::with_capacity(options.n_runs);
            let mut states = None;
            for _ in 0..options.n_runs {
                let start = Instant::now();
                let trajectory = run.evolve(pcof)?;
                seconds.push(start.elapsed().as_secs_f64());
                states = Some(trajectory.states);
            }
            let Some(states) = states else {
                break;
            };
            let (mean, std) = mean_and_std(&seconds);
            timings[[i, k]] = mean;
            timing_std[[i, k]] = std;

            errors[[i, k]] = match (&options.reference, &previous) {
                (Some(reference), _) => relative_error(&states, reference)?,
                (None, Some(coarse)) => richardson_error(&states, coarse, order.as_usize())?,
                (None, None) => f64::NAN,
            };
            debug!(
                order = order.as_usize(),
                nsteps,
                error = errors[[i, k]],
                seconds = mean,
                "sweep level done"
            );

            if errors[[i, k]] < options.error_floor {
                debug!(order = order.as_usize(), nsteps, "error floor reached");
                break;
            }
            if k >= 2 && saturated(&errors, i, k, options.saturation_threshold) {
                debug!(order = order.as_usize(), nsteps, "error saturated");
                break;
            }
            previous = Some(states);
        }
    }

    Ok(ConvergenceReport {
        orders: orders.iter().map(|o| o.as_usize()).collect(),
        step_counts,
        step_sizes,
        errors,
        timings,
        timing_std,
    })
}

/// Error fell below `threshold` and then grew on two consecutive refinements.
fn saturated(errors: &Array2<f64>, i: usize, k: usize, threshold: f64) -> bool {
    let (e0, e1, e2) = (errors[[i, k - 2]], errors[[i, k - 1]], errors[[i, k]]);
    e0 < threshold && e1 > e0 && e2 > e1
}

fn mean_and_std(samples: &[f64]) -> (f64, f64) {
    let x = Array1::from(samples.to_vec());
    let mean = x.mean().unwrap_or(f64::NAN);
    let std = if x.len() > 1 { x.std(1.0) } else { 0.0 };
    (mean, std)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{driven_transmon_at, sample_pcof};
    use ndarray::array;

    #[test]
    fn test_empirical_order_against_reference() {
        let (problem, controls) = driven_transmon_at(40);
        let pcof = sample_pcof(&controls);
        let solver = SolverConfig::default();
        let reference = Integrator::new(&problem, &controls, Order::Fourth, &solver)
            .unwrap()
            .with_nsteps(2560)
            .unwrap()
            .evolve(&pcof)
            .unwrap()
            .states;
        let options = SweepOptions {
            n_iterations: 3,
            error_floor: 0.0,
            ..SweepOptions::default()
        }
        .with_reference(reference);

        let report = convergence_sweep(
            &problem,
            &controls,
            &pcof,
            &[Order::Second, Order::Fourth],
            &solver,
            &options,
        )
        .unwrap();
        assert_eq!(report.step_counts, vec![40, 80, 160, 320]);
        assert_eq!(report.orders, vec![2, 4]);

        let rates = report.estimated_orders();
        for (i, &p) in report.orders.iter().enumerate() {
            let p = p as f64;
            for k in 1..4 {
                let rate = rates[[i, k]];
                assert!(
                    rate > p - 0.3 && rate < p + 0.5,
                    "order {p}: rate {rate} at level {k}"
                );
            }
        }
        assert!(report.timings.iter().all(|t| t.is_finite() && *t >= 0.0));
        assert!(report.timing_std.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_richardson_mode_and_early_stop() {
        let (problem, controls) = driven_transmon_at(20);
        let pcof = sample_pcof(&controls);
        let solver = SolverConfig::default();
        let options = SweepOptions {
            n_iterations: 3,
            n_runs: 2,
            error_floor: 1.0,
            ..SweepOptions::default()
        };
        let report =
            convergence_sweep(&problem, &controls, &pcof, &[Order::Second], &solver, &options)
                .unwrap();
        assert!(report.errors[[0, 0]].is_nan());
        assert!(report.errors[[0, 1]] < 1.0);
        assert!(report.errors[[0, 2]].is_nan());
        assert!(report.timings[[0, 2]].is_nan());
        assert!(report.timing_std[[0, 1]] >= 0.0);
        assert_eq!(report.step_sizes.len(), 4);
    }

    #[test]
    fn test_saturation_detection() {
        let errors = array![[1e-3, 1e-5, 2e-5, 3e-5], [1e-3, 1e-5, 2e-5, 1e-5]];
        assert!(saturated(&errors, 0, 3, 1e-4));
        assert!(!saturated(&errors, 1, 3, 1e-4));
        assert!(!saturated(&errors, 0, 3, 1e-6));
    }

    #[test]
    fn test_invalid_options() {
        let (problem, controls) = driven_transmon_at(20);
        let pcof = sample_pcof(&controls);
        let solver = SolverConfig::default();
        let options = SweepOptions {
            n_iterations: 0,
            ..SweepOptions::default()
        };
        let err = convergence_sweep(&problem, &controls, &pcof, &[Order::Fourth], &solver, &options)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = convergence_sweep(
            &problem,
            &controls,
            &pcof,
            &[],
            &solver,
            &SweepOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_step_count_overflow_is_rejected() {
        let (problem, controls) = driven_transmon_at(20);
        let pcof = sample_pcof(&controls);
        let solver = SolverConfig::default();
        for n_iterations in [80, usize::MAX] {
            let options = SweepOptions {
                n_iterations,
                ..SweepOptions::default()
            };
            let err =
                convergence_sweep(&problem, &controls, &pcof, &[Order::Second], &solver, &options)
                    .unwrap_err();
            assert!(matches!(err, Error::Config(_)));
        }
    }

    #[test]
    fn test_report_serializes() {
        let report = ConvergenceReport {
            orders: vec![2],
            step_counts: vec![10, 20],
            step_sizes: vec![0.1, 0.05],
            errors: array![[f64::NAN, 1e-3]],
            timings: array![[1e-3, 2e-3]],
            timing_std: array![[0.0, 0.0]],
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"step_counts\":[10,20]"));
        assert!(report.to_string().contains("order 2"));
    }
}
