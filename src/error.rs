// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types for integration, gradient and sweep operations.

use std::fmt;

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug)]
pub enum Error {
    /// Configuration error (invalid order, coefficient count, sweep settings)
    Config(String),
    /// Validation error on an input record
    Validation(ValidationError),
    /// Linear solve failed inside an integration step
    Solver {
        /// Step index whose implicit solve failed
        step: usize,
        /// Time at the end of the failed step
        time: f64,
        /// Underlying solver failure
        source: SolverError,
    },
    /// Control index out of range
    Index { index: usize, len: usize },
    /// IO error
    Io(std::io::Error),
    /// Serialization error
    Serialization(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Validation(e) => write!(f, "Validation error: {}", e),
            Error::Solver { step, time, source } => {
                write!(f, "Solver failed at step {} (t = {}): {}", step, time, source)
            }
            Error::Index { index, len } => {
                write!(f, "Control index {} out of range for {} control(s)", index, len)
            }
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Validation(e) => Some(e),
            Error::Solver { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::Validation(e)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Iterative solver failures.
#[derive(Debug, Clone, PartialEq)]
pub enum SolverError {
    /// Iteration budget exhausted before reaching tolerance
    NotConverged {
        iterations: usize,
        residual: f64,
        tolerance: f64,
    },
    /// Residual became non-finite
    Breakdown(String),
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverError::NotConverged {
                iterations,
                residual,
                tolerance,
            } => write!(
                f,
                "GMRES did not converge after {} iterations (residual {:.3e} > tolerance {:.3e})",
                iterations, residual, tolerance
            ),
            SolverError::Breakdown(msg) => write!(f, "GMRES breakdown: {}", msg),
        }
    }
}

impl std::error::Error for SolverError {}

/// Validation errors.
#[derive(Debug)]
pub enum ValidationError {
    /// Field validation failed
    Field { field: String, message: String },
    /// Array dimension mismatch
    Dimension {
        what: String,
        expected: String,
        actual: String,
    },
    /// Physics constraint violated
    PhysicsConstraint(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Field { field, message } => {
                write!(f, "Field '{}': {}", field, message)
            }
            ValidationError::Dimension {
                what,
                expected,
                actual,
            } => write!(f, "{} has shape {}, expected {}", what, actual, expected),
            ValidationError::PhysicsConstraint(msg) => {
                write!(f, "Physics constraint violated: {}", msg)
            }
        }
    }
}

impl std::error::Error for ValidationError {}
