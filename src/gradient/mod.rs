// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Gradients of a terminal cost with respect to control coefficients.
//!
//! - [`adjoint`]: discrete adjoint, one forward and one backward pass
//! - [`finite_diff`]: finite-difference oracle
//! - [`sensitivity`]: forward sensitivities through the forced integrator
//! - [`cost`]: terminal costs (infidelity, leakage)
//! - [`objective`]: cost/gradient pair and box bounds for an optimizer
//!
//! Adjoint and sensitivity gradients differentiate the discrete scheme, so
//! they agree to solver precision. Finite differences agree to `O(ε²)`.

pub mod adjoint;
pub mod cost;
pub mod finite_diff;
pub mod objective;
pub mod sensitivity;

pub use adjoint::{adjoint_cost_and_gradient, adjoint_gradient};
pub use cost::{CostKind, Target, TerminalCost};
pub use finite_diff::{finite_difference_gradient, terminal_cost};
pub use objective::{Bounds, Objective};
pub use sensitivity::forced_gradient;
