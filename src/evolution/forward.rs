// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Forward integrator.

use ndarray::{Array1, Array2};
use tracing::{debug, instrument, trace};

use super::hermite::{combine, Side, StepPoint};
use super::krylov::gmres;
use super::types::{Order, Trajectory};
use crate::config::SolverConfig;
use crate::control::ControlSet;
use crate::error::{Error, Result, ValidationError};
use crate::problem::SchrodingerProblem;

/// Problem, controls, scheme and solver settings for a family of runs.
///
/// The step count starts at the problem's `nsteps`; [`Integrator::with_nsteps`]
/// returns a copy at another resolution without touching the problem.
#[derive(Debug, Clone, Copy)]
pub struct Integrator<'a> {
    problem: &'a SchrodingerProblem,
    controls: &'a ControlSet,
    order: Order,
    solver: &'a SolverConfig,
    nsteps: usize,
}

impl<'a> Integrator<'a> {
    pub fn new(
        problem: &'a SchrodingerProblem,
        controls: &'a ControlSet,
        order: Order,
        solver: &'a SolverConfig,
    ) -> Result<Self> {
        if controls.len() != problem.n_channels() {
            return Err(ValidationError::Dimension {
                what: "controls".into(),
                expected: format!("{} channel(s)", problem.n_channels()),
                actual: format!("{} channel(s)", controls.len()),
            }
            .into());
        }
        Ok(Self {
            problem,
            controls,
            order,
            solver,
            nsteps: problem.nsteps(),
        })
    }

    /// Same integrator at a different step count.
    pub fn with_nsteps(&self, nsteps: usize) -> Result<Self> {
        if nsteps == 0 {
            return Err(Error::Config("nsteps must be >= 1".into()));
        }
        Ok(Self { nsteps, ..*self })
    }

    pub fn problem(&self) -> &'a SchrodingerProblem {
        self.problem
    }

    pub fn controls(&self) -> &'a ControlSet {
        self.controls
    }

    pub fn order(&self) -> Order {
        self.order
    }

    pub fn solver(&self) -> &'a SolverConfig {
        self.solver
    }

    pub fn nsteps(&self) -> usize {
        self.nsteps
    }

    pub fn dt(&self) -> f64 {
        self.problem.dt(self.nsteps)
    }

    /// `t_n = n·dt`
    pub fn time(&self, n: usize) -> f64 {
        n as f64 * self.dt()
    }

    /// Generator data at time index `n`.
    pub fn point(&self, pcof: &[f64], n: usize) -> Result<StepPoint> {
        StepPoint::new(self.problem, self.controls, pcof, self.time(n), self.order)
    }

    /// Solve `L x = rhs` at `point`, starting from `guess`.
    pub(crate) fn solve_implicit(
        &self,
        point: &StepPoint,
        rhs: &Array1<f64>,
        guess: Array1<f64>,
        step: usize,
        transposed: bool,
    ) -> Result<Array1<f64>> {
        let op = if transposed {
            point.operator_transposed(self.dt(), Side::Implicit)
        } else {
            point.operator(self.dt(), Side::Implicit)
        };
        let outcome = gmres(&op, rhs, guess, self.solver).map_err(|source| Error::Solver {
            step,
            time: point.time,
            source,
        })?;
        trace!(
            step,
            iterations = outcome.iterations,
            residual = outcome.residual,
            "implicit solve"
        );
        Ok(outcome.solution)
    }

    /// Integrate from the problem's initial state.
    pub fn evolve(&self, pcof: &[f64]) -> Result<Trajectory> {
        self.run(pcof, false)
    }

    /// Integrate and record `xt` (and `xtt` for order 4) at every time point,
    /// including the final one.
    pub fn evolve_with_derivatives(&self, pcof: &[f64]) -> Result<Trajectory> {
        self.run(pcof, true)
    }

    #[instrument(level = "debug", skip(self, pcof), fields(order = %self.order, nsteps = self.nsteps))]
    fn run(&self, pcof: &[f64], record_derivatives: bool) -> Result<Trajectory> {
        self.controls.check_pcof(pcof)?;

        let dim = 2 * self.problem.dim();
        let n_points = self.nsteps + 1;
        let dt = self.dt();

        let mut states = Array2::zeros((dim, n_points));
        let mut first = record_derivatives.then(|| Array2::zeros((dim, n_points)));
        let mut second = (record_derivatives && self.order == Order::Fourth)
            .then(|| Array2::zeros((dim, n_points)));

        let mut w = self.problem.initial_state();
        states.column_mut(0).assign(&w);

        let mut current = self.point(pcof, 0)?;
        for n in 0..self.nsteps {
            let (xt, xtt) = current.derivatives(w.view(), None);
            if let Some(first) = first.as_mut() {
                first.column_mut(n).assign(&xt);
            }
            if let (Some(second), Some(xtt)) = (second.as_mut(), xtt.as_ref()) {
                second.column_mut(n).assign(xtt);
            }
            let rhs = combine(w.view(), &xt, xtt.as_ref(), dt, Side::Explicit);

            let next = self.point(pcof, n + 1)?;
            w = self.solve_implicit(&next, &rhs, w, n, false)?;
            states.column_mut(n + 1).assign(&w);
            current = next;
        }

        if record_derivatives {
            let (xt, xtt) = current.derivatives(w.view(), None);
            if let Some(first) = first.as_mut() {
                first.column_mut(self.nsteps).assign(&xt);
            }
            if let (Some(second), Some(xtt)) = (second.as_mut(), xtt.as_ref()) {
                second.column_mut(self.nsteps).assign(xtt);
            }
        }

        debug!(
            final_norm = w.dot(&w).sqrt(),
            "forward integration complete"
        );

        Ok(Trajectory {
            states,
            first_derivatives: first,
            second_derivatives: second,
            dt,
            order: self.order,
        })
    }
}

/// Integrate `problem` under `controls` at the problem's own resolution.
pub fn evolve(
    problem: &SchrodingerProblem,
    controls: &ControlSet,
    pcof: &[f64],
    order: Order,
    solver: &SolverConfig,
) -> Result<Trajectory> {
    Integrator::new(problem, controls, order, solver)?.evolve(pcof)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{ControlSet, PiecewiseConstantControl};
    use crate::convergence::relative_error;
    use crate::reference::propagate_drift;
    use crate::test_utils::{driven_transmon, sample_pcof, superposition, two_channel_transmon};
    use approx::assert_relative_eq;

    fn tight() -> SolverConfig {
        SolverConfig::default()
    }

    #[test]
    fn test_initial_column_and_shape() {
        let (problem, controls) = driven_transmon();
        let pcof = sample_pcof(&controls);
        let solver = tight();
        let traj = evolve(&problem, &controls, &pcof, Order::Fourth, &solver).unwrap();
        assert_eq!(traj.states.shape(), &[6, problem.nsteps() + 1]);
        assert_eq!(traj.state(0), problem.initial_state());
        assert!(traj.first_derivatives.is_none());
    }

    #[test]
    fn test_pcof_length_mismatch() {
        let (problem, controls) = driven_transmon();
        let solver = tight();
        let err = evolve(&problem, &controls, &[0.1], Order::Second, &solver).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_channel_count_mismatch() {
        let (problem, _) = driven_transmon();
        let mut controls =
            ControlSet::single(PiecewiseConstantControl::new(2, problem.tf()).unwrap());
        controls.push(PiecewiseConstantControl::new(2, problem.tf()).unwrap());
        let solver = tight();
        assert!(Integrator::new(&problem, &controls, Order::Second, &solver).is_err());
    }

    #[test]
    fn test_with_nsteps_leaves_problem_untouched() {
        let (problem, controls) = driven_transmon();
        let solver = tight();
        let base = Integrator::new(&problem, &controls, Order::Second, &solver).unwrap();
        let fine = base.with_nsteps(4 * problem.nsteps()).unwrap();
        assert_eq!(fine.nsteps(), 4 * problem.nsteps());
        assert_eq!(base.nsteps(), problem.nsteps());
        assert_relative_eq!(fine.dt() * 4.0, base.dt(), epsilon = 1e-15);
        assert!(base.with_nsteps(0).is_err());

        let pcof = sample_pcof(&controls);
        let traj = fine.evolve(&pcof).unwrap();
        assert_eq!(traj.nsteps(), 4 * problem.nsteps());
    }

    #[test]
    fn test_derivative_histories() {
        let (problem, controls) = driven_transmon();
        let pcof = sample_pcof(&controls);
        let solver = tight();
        let integrator = Integrator::new(&problem, &controls, Order::Fourth, &solver).unwrap();
        let traj = integrator.evolve_with_derivatives(&pcof).unwrap();
        let first = traj.first_derivatives.as_ref().unwrap();
        let second = traj.second_derivatives.as_ref().unwrap();
        assert_eq!(first.shape(), traj.states.shape());
        assert_eq!(second.shape(), traj.states.shape());

        // final column is evaluated after the last step
        let n = traj.nsteps();
        let point = integrator.point(&pcof, n).unwrap();
        let expected = point.generator().apply(traj.state(n));
        for (a, b) in first.column(n).iter().zip(expected.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-14);
        }

        let order2 = Integrator::new(&problem, &controls, Order::Second, &solver)
            .unwrap()
            .evolve_with_derivatives(&pcof)
            .unwrap();
        assert!(order2.first_derivatives.is_some());
        assert!(order2.second_derivatives.is_none());
    }

    #[test]
    fn test_norm_stability() {
        let (problem, controls) = driven_transmon();
        let pcof = sample_pcof(&controls);
        let solver = tight();
        for order in [Order::Second, Order::Fourth] {
            let traj = Integrator::new(&problem, &controls, order, &solver)
                .unwrap()
                .with_nsteps(1000)
                .unwrap()
                .evolve(&pcof)
                .unwrap();
            let norms = traj.norms();
            let drift = norms.iter().map(|x| (x - norms[0]).abs()).fold(0.0, f64::max);
            assert!(drift < 1e-6, "order {order}: norm drift {drift:e}");
        }
    }

    #[test]
    fn test_zero_control_matches_drift_propagator() {
        let (problem, controls) = driven_transmon();
        let problem = problem.with_initial_state(superposition(3), Array1::zeros(3)).unwrap();
        let pcof = vec![0.0; controls.n_coeff_total()];
        let solver = tight();
        let reference = propagate_drift(&problem, 200).unwrap();
        for (order, tol) in [(Order::Second, 1e-4), (Order::Fourth, 1e-9)] {
            let traj = Integrator::new(&problem, &controls, order, &solver)
                .unwrap()
                .with_nsteps(200)
                .unwrap()
                .evolve(&pcof)
                .unwrap();
            let err = relative_error(&traj.states, &reference).unwrap();
            assert!(err < tol, "order {order}: error {err:e}");
        }
    }

    #[test]
    fn test_multichannel_integration() {
        let (problem, controls) = two_channel_transmon();
        let pcof = sample_pcof(&controls);
        let solver = tight();
        let traj = Integrator::new(&problem, &controls, Order::Fourth, &solver)
            .unwrap()
            .with_nsteps(200)
            .unwrap()
            .evolve(&pcof)
            .unwrap();
        let norms = traj.norms();
        assert_relative_eq!(norms[traj.nsteps()], 1.0, epsilon = 1e-6);
        assert!(traj.final_populations()[1] > 1e-4);
    }

    #[test]
    fn test_solver_failure_reports_step() {
        let (problem, controls) = driven_transmon();
        let pcof = sample_pcof(&controls);
        let solver = SolverConfig {
            max_iterations: 1,
            ..SolverConfig::default()
        };
        let err = evolve(&problem, &controls, &pcof, Order::Second, &solver).unwrap_err();
        match err {
            Error::Solver { step, time, .. } => {
                assert_eq!(step, 0);
                assert_relative_eq!(time, problem.dt(problem.nsteps()), epsilon = 1e-15);
            }
            other => panic!("unexpected error {other}"),
        }
    }
}
