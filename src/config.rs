// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Runtime configuration.
//!
//! Configuration is loaded from multiple sources with the following priority
//! (later sources override earlier ones):
//!
//! 1. Built-in defaults
//! 2. hermite.yaml file (or the path given on the command line)
//! 3. Environment variables (HERMITE_*)
//! 4. CLI arguments

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::error::{Error, Result};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Linear solver settings
    #[serde(default)]
    pub solver: SolverConfig,

    /// Gradient settings
    #[serde(default)]
    pub gradient: GradientConfig,

    /// Convergence sweep settings
    #[serde(default)]
    pub convergence: ConvergenceConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file and environment.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(path) = config_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                config = serde_yaml::from_str(&content)?;
            }
        } else {
            for path in &["hermite.yaml", "hermite.yml"] {
                let path = Path::new(path);
                if path.exists() {
                    let content = std::fs::read_to_string(path)?;
                    config = serde_yaml::from_str(&content)?;
                    break;
                }
            }
        }

        config.apply_env_overrides();

        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("HERMITE_SOLVER_ABSTOL") {
            if let Ok(tol) = val.parse() {
                self.solver.abstol = tol;
            }
        }
        if let Ok(val) = env::var("HERMITE_SOLVER_RELTOL") {
            if let Ok(tol) = val.parse() {
                self.solver.reltol = tol;
            }
        }
        if let Ok(val) = env::var("HERMITE_SOLVER_MAX_ITERATIONS") {
            if let Ok(n) = val.parse() {
                self.solver.max_iterations = n;
            }
        }
        if let Ok(val) = env::var("HERMITE_FD_EPSILON") {
            if let Ok(eps) = val.parse() {
                self.gradient.fd_epsilon = eps;
            }
        }
        if let Ok(val) = env::var("HERMITE_SWEEP_ITERATIONS") {
            if let Ok(n) = val.parse() {
                self.convergence.n_iterations = n;
            }
        }
        if let Ok(val) = env::var("HERMITE_LOG_LEVEL") {
            self.logging.level = val;
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        self.solver.validate()?;
        if self.gradient.fd_epsilon.is_nan() || self.gradient.fd_epsilon <= 0.0 {
            return Err(Error::Config(format!(
                "fd_epsilon must be > 0, got {}",
                self.gradient.fd_epsilon
            )));
        }
        self.convergence.validate()?;
        Ok(())
    }
}

/// GMRES settings used by every implicit step and adjoint solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Absolute residual tolerance
    #[serde(default = "default_tolerance")]
    pub abstol: f64,

    /// Relative residual tolerance (scaled by the right-hand side norm)
    #[serde(default = "default_tolerance")]
    pub reltol: f64,

    /// Maximum total Krylov iterations per solve
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Restart length; 0 means the system dimension
    #[serde(default)]
    pub restart: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            abstol: default_tolerance(),
            reltol: default_tolerance(),
            max_iterations: default_max_iterations(),
            restart: 0,
        }
    }
}

impl SolverConfig {
    /// Validate solver settings.
    pub fn validate(&self) -> Result<()> {
        let positive = |x: f64| x > 0.0 && x.is_finite();
        if !positive(self.abstol) || !positive(self.reltol) {
            return Err(Error::Config(format!(
                "solver tolerances must be > 0 (abstol = {}, reltol = {})",
                self.abstol, self.reltol
            )));
        }
        if self.max_iterations == 0 {
            return Err(Error::Config("solver max_iterations cannot be 0".into()));
        }
        Ok(())
    }
}

fn default_tolerance() -> f64 {
    1e-15
}

fn default_max_iterations() -> usize {
    500
}

/// Finite-difference scheme used by the gradient oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FdScheme {
    /// (f(x+ε) − f(x−ε)) / 2ε
    #[default]
    Centered,
    /// (f(x+ε) − f(x)) / ε
    Forward,
}

/// Gradient oracle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientConfig {
    /// Finite-difference perturbation
    #[serde(default = "default_fd_epsilon")]
    pub fd_epsilon: f64,

    /// Finite-difference scheme
    #[serde(default)]
    pub fd_scheme: FdScheme,
}

impl Default for GradientConfig {
    fn default() -> Self {
        Self {
            fd_epsilon: default_fd_epsilon(),
            fd_scheme: FdScheme::Centered,
        }
    }
}

fn default_fd_epsilon() -> f64 {
    1e-6
}

/// Convergence sweep settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergenceConfig {
    /// Number of step-size halvings
    #[serde(default = "default_sweep_iterations")]
    pub n_iterations: usize,

    /// Repeated runs per configuration for timing statistics
    #[serde(default = "default_runs")]
    pub n_runs: usize,

    /// Stop refining once the error drops below this value
    #[serde(default)]
    pub error_floor: f64,

    /// Error level below which growth is treated as round-off saturation
    #[serde(default = "default_saturation_threshold")]
    pub saturation_threshold: f64,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            n_iterations: default_sweep_iterations(),
            n_runs: default_runs(),
            error_floor: 0.0,
            saturation_threshold: default_saturation_threshold(),
        }
    }
}

impl ConvergenceConfig {
    /// Validate sweep settings.
    pub fn validate(&self) -> Result<()> {
        if self.n_iterations < 1 {
            return Err(Error::Config("n_iterations must be >= 1".into()));
        }
        if self.n_runs < 1 {
            return Err(Error::Config("n_runs must be >= 1".into()));
        }
        if self.error_floor < 0.0 {
            return Err(Error::Config(format!(
                "error_floor must be >= 0, got {}",
                self.error_floor
            )));
        }
        Ok(())
    }
}

fn default_sweep_iterations() -> usize {
    5
}

fn default_runs() -> usize {
    1
}

fn default_saturation_threshold() -> f64 {
    1e-4
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}
