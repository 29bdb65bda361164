// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Hermite integrator command line
//!
//! Runs the integrators, gradients and convergence sweeps on a built-in
//! rotating-frame qudit driven by quadratic B-splines.
//!
//! # Usage
//!
//! ```bash
//! # Final populations of a 2+1 level transmon
//! hermite-qoc evolve --essential 2 --guard 1
//!
//! # Compare adjoint, finite-difference and forced gradients
//! hermite-qoc gradient --order 2
//!
//! # Convergence table as JSON
//! hermite-qoc convergence --iterations 4 --json
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use ndarray::Array1;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hermite_qoc::config::Config;
use hermite_qoc::control::{BSpline2Control, ControlSet};
use hermite_qoc::convergence::{convergence_sweep, SweepOptions};
use hermite_qoc::evolution::{Integrator, Order};
use hermite_qoc::gradient::{CostKind, Objective, Target, TerminalCost};
use hermite_qoc::presets::rotating_qudit;
use hermite_qoc::{Result, SchrodingerProblem, VERSION};

/// Hermite integrators and adjoint gradients for quantum control
#[derive(Parser)]
#[command(name = "hermite-qoc")]
#[command(author = "QubitOS Contributors")]
#[command(version = VERSION)]
#[command(about = "Hermite time integrators and discrete-adjoint gradients")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Integrate the preset problem and print final populations
    Evolve {
        #[command(flatten)]
        preset: Preset,

        /// Integration order (2 or 4)
        #[arg(long, default_value_t = 4)]
        order: usize,
    },

    /// Compare adjoint, finite-difference and forced gradients
    Gradient {
        #[command(flatten)]
        preset: Preset,

        /// Integration order (2 or 4)
        #[arg(long, default_value_t = 4)]
        order: usize,

        /// Terminal cost (infidelity, leakage)
        #[arg(long, default_value = "infidelity")]
        cost: CostKind,

        /// Target essential level
        #[arg(long, default_value_t = 1)]
        target: usize,
    },

    /// Step-size halving sweep for orders 2 and 4
    Convergence {
        #[command(flatten)]
        preset: Preset,

        /// Number of halvings (overrides the config file)
        #[arg(long, env = "HERMITE_SWEEP_ITERATIONS")]
        iterations: Option<usize>,

        /// Timed repetitions per level (overrides the config file)
        #[arg(long)]
        runs: Option<usize>,

        /// Compare against an order-4 run with this many steps instead of
        /// Richardson extrapolation
        #[arg(long)]
        reference_nsteps: Option<usize>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show effective configuration
    Config,

    /// Validate configuration file
    Validate,
}

/// Built-in problem: a rotating-frame qudit driven by quadratic B-splines.
#[derive(Args)]
struct Preset {
    /// Essential levels
    #[arg(long, default_value_t = 2)]
    essential: usize,

    /// Guard levels
    #[arg(long, default_value_t = 1)]
    guard: usize,

    /// Detuning
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    detuning: f64,

    /// Anharmonicity
    #[arg(long, default_value_t = -1.0, allow_negative_numbers = true)]
    anharmonicity: f64,

    /// Final time
    #[arg(long, default_value_t = std::f64::consts::PI)]
    tf: f64,

    /// Base number of time steps
    #[arg(long, default_value_t = 50)]
    nsteps: usize,

    /// B-splines per quadrature
    #[arg(long, default_value_t = 6)]
    splines: usize,

    /// Magnitude of the initial coefficients
    #[arg(long, default_value_t = 0.3)]
    seed_amplitude: f64,
}

impl Preset {
    fn build(&self) -> Result<(SchrodingerProblem, ControlSet, Vec<f64>)> {
        let problem = rotating_qudit(
            self.essential,
            self.guard,
            self.detuning,
            self.anharmonicity,
            self.tf,
            self.nsteps,
        )?;
        let controls = ControlSet::single(BSpline2Control::new(self.splines, self.tf)?);
        let pcof = (0..controls.n_coeff_total())
            .map(|j| self.seed_amplitude * ((j + 1) as f64).sin())
            .collect();
        Ok((problem, controls, pcof))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_deref())?;

    // Initialize logging
    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    init_logging(level, &config.logging.format);

    match cli.command {
        Commands::Evolve { preset, order } => {
            config.validate()?;
            let order = Order::try_from(order)?;
            let (problem, controls, pcof) = preset.build()?;
            info!(version = VERSION, %order, nsteps = problem.nsteps(), "Evolving preset problem");

            let integrator = Integrator::new(&problem, &controls, order, &config.solver)?;
            let trajectory = integrator.evolve(&pcof)?;
            let norms = trajectory.norms();
            let drift = norms
                .iter()
                .map(|x| (x - norms[0]).abs())
                .fold(0.0, f64::max);

            println!("Final populations (order {order}, {} steps):", problem.nsteps());
            for (k, p) in trajectory.final_populations().iter().enumerate() {
                let kind = if k < problem.n_essential() { "" } else { " (guard)" };
                println!("  |{k}⟩{kind}: {p:.10}");
            }
            println!("Max norm drift: {drift:.3e}");
        }

        Commands::Gradient {
            preset,
            order,
            cost,
            target,
        } => {
            config.validate()?;
            let order = Order::try_from(order)?;
            let (problem, controls, pcof) = preset.build()?;
            let terminal = TerminalCost::new(
                cost,
                Target::basis(problem.n_essential(), target)?,
                &problem,
            )?;
            let objective = Objective::new(&problem, &controls, terminal, order, &config)?;

            let (value, adjoint) = objective.cost_and_gradient(&pcof)?;
            let fd = objective.finite_difference_gradient(&pcof)?;
            let forced = objective.forced_gradient(&pcof)?;

            println!("{cost} = {value:.12e} (order {order}, {} coefficients)", pcof.len());
            println!("  {:>4} {:>18} {:>18} {:>18}", "j", "adjoint", "finite diff", "forced");
            for j in 0..pcof.len() {
                println!(
                    "  {:>4} {:>18.10e} {:>18.10e} {:>18.10e}",
                    j, adjoint[j], fd[j], forced[j]
                );
            }
            println!(
                "Max relative difference: adjoint/fd {:.3e}, adjoint/forced {:.3e}",
                max_relative_difference(&adjoint, &fd),
                max_relative_difference(&adjoint, &forced)
            );
        }

        Commands::Convergence {
            preset,
            iterations,
            runs,
            reference_nsteps,
            json,
        } => {
            let mut config = config;
            if let Some(n) = iterations {
                config.convergence.n_iterations = n;
            }
            if let Some(n) = runs {
                config.convergence.n_runs = n;
            }
            config.validate()?;

            let (problem, controls, pcof) = preset.build()?;
            let mut options = SweepOptions::from(&config.convergence);
            if let Some(nsteps) = reference_nsteps {
                info!(nsteps, "Computing reference solution");
                let reference = Integrator::new(&problem, &controls, Order::Fourth, &config.solver)?
                    .with_nsteps(nsteps)?
                    .evolve(&pcof)?;
                options = options.with_reference(reference.states);
            }

            let report = convergence_sweep(
                &problem,
                &controls,
                &pcof,
                &[Order::Second, Order::Fourth],
                &config.solver,
                &options,
            )?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{report}");
            }
        }

        Commands::Config => {
            // Show effective configuration
            println!("{}", serde_yaml::to_string(&config)?);
        }

        Commands::Validate => {
            // Validate configuration
            match config.validate() {
                Ok(()) => {
                    println!("Configuration is valid");
                }
                Err(e) => {
                    eprintln!("Configuration error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

/// Initialize logging with tracing.
fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    if format == "json" {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}

fn max_relative_difference(a: &Array1<f64>, b: &Array1<f64>) -> f64 {
    let scale = b.iter().fold(0.0_f64, |m, x| m.max(x.abs())).max(f64::MIN_POSITIVE);
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs() / y.abs().max(1e-3 * scale))
        .fold(0.0, f64::max)
}
