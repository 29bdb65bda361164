// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Implicit Hermite time integration in the real embedding.
//!
//! # Architecture
//!
//! - [`generator`]: the embedded generator `A(t)` and its transpose
//! - [`hermite`]: the step combination `x ± (dt/2)(xt + (dt/2)·w₁·xtt)` and
//!   the matrix-free step operator built from it
//! - [`krylov`]: restarted GMRES used for every implicit solve
//! - [`forward`]: the [`Integrator`] and its forward runs
//! - [`forced`]: the same step with an external forcing term
//!
//! Order 2 is the trapezoidal rule. Order 4 adds the second time derivative
//! with Hermite weights, which needs the control time derivatives `pt`, `qt`.

pub mod forced;
pub mod forward;
pub mod generator;
pub mod hermite;
pub mod krylov;
pub mod types;

pub use forced::evolve_forced;
pub use forward::{evolve, Integrator};
pub use generator::Generator;
pub use hermite::{StepOperator, StepPoint};
pub use krylov::{gmres, GmresOutcome, LinearOperator};
pub use types::{Order, Trajectory};
