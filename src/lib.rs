// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Hermite time integrators and discrete-adjoint gradients for quantum
//! optimal control.
//!
//! A complex Schrödinger state `ψ = u + iv` is advanced in its real embedding
//! `w = [u; v]` by implicit, symmetric Hermite rules of order 2 and 4. Each
//! step solves a small dense system with restarted GMRES. The same step
//! structure, transposed, yields exact gradients of a terminal cost with
//! respect to the control coefficients.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │     Objective / convergence sweep        │
//! ├──────────────────┬──────────────────────┤
//! │ Adjoint gradient │ Forced integrator    │
//! │ (backward pass)  │ (sensitivities)      │
//! ├──────────────────┴──────────────────────┤
//! │  Forward integrator (Hermite + GMRES)    │
//! ├─────────────────────────────────────────┤
//! │  Controls (closed form or autodiff)      │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`problem`]: Hamiltonian, initial state and time grid
//! - [`control`]: control pulses and their derivatives
//! - [`evolution`]: forward and forced integrators
//! - [`gradient`]: adjoint, finite-difference and sensitivity gradients
//! - [`convergence`]: step-size sweeps and Richardson extrapolation
//! - [`presets`]: ready-made problems
//! - [`reference`]: exact drift-only evolution
//! - [`config`]: Configuration management
//! - [`error`]: Error types

pub mod config;
pub mod control;
pub mod convergence;
pub mod error;
pub mod evolution;
pub mod gradient;
pub mod presets;
pub mod problem;
pub mod reference;

pub use config::Config;
pub use control::{Control, ControlFn, ControlSet};
pub use error::{Error, Result};
pub use evolution::{Integrator, Order, Trajectory};
pub use problem::SchrodingerProblem;

#[cfg(test)]
pub mod test_utils;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
