// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Convergence analysis for the Hermite integrators.
//!
//! A sweep reruns the forward integrator at halving step sizes and measures
//! the error of each run either against a high-resolution reference or by
//! Richardson extrapolation from consecutive levels.

pub mod richardson;
pub mod sweep;

pub use richardson::{relative_error, richardson_error, richardson_extrapolate, subsample};
pub use sweep::{convergence_sweep, ConvergenceReport, SweepOptions};
