//! QFEA Command-Line Interface
//!
//! Assembles a mass-normalized Hamiltonian from finite-element stiffness and
//! mass matrices, decomposes it into Pauli strings, Trotterizes it and
//! evolves a state vector under the product formula.
//!
//! ```text
//! qfea decompose -k stiffness.json -m mass.json
//! qfea simulate  -k stiffness.json -m mass.json --time 2.0 --steps 50 --order second
//! qfea spectrum  -k stiffness.json -m mass.json --count 4
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::common::{MaterialArgs, SystemArgs};
use commands::{decompose, simulate, spectrum, version};

/// QFEA - quantum time evolution of finite-element models
#[derive(Parser)]
#[command(name = "qfea")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// YAML configuration file
    #[arg(short, long, global = true, env = "QFEA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decompose the assembled Hamiltonian into Pauli strings
    Decompose {
        #[command(flatten)]
        system: SystemArgs,

        #[command(flatten)]
        material: MaterialArgs,

        /// Pauli term budget (defaults to the configured limit)
        #[arg(long)]
        max_terms: Option<usize>,

        /// Coefficient drop threshold (defaults to the configured tolerance)
        #[arg(long)]
        tolerance: Option<f64>,

        /// Number of terms to print
        #[arg(long, default_value = "10")]
        show: usize,

        /// Write the `[label, coeff]` list to this JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the full pipeline: decompose, Trotterize, evolve
    Simulate {
        #[command(flatten)]
        system: SystemArgs,

        #[command(flatten)]
        material: MaterialArgs,

        /// Total evolution time
        #[arg(short, long)]
        time: f64,

        /// Trotter repetitions (defaults to the configured step count)
        #[arg(short, long)]
        steps: Option<u32>,

        /// Product-formula order (first, second)
        #[arg(long)]
        order: Option<String>,

        /// Pauli term budget (defaults to the configured limit)
        #[arg(long)]
        max_terms: Option<usize>,

        /// Coefficient drop threshold (defaults to the configured tolerance)
        #[arg(long)]
        tolerance: Option<f64>,

        /// Initial state (uniform, ground, basis:<index>)
        #[arg(long)]
        initial: Option<String>,

        /// Also compute the reference spectrum and check the trace against it
        #[arg(long)]
        reference: bool,

        /// Directory for JSON exports and the OpenQASM circuit
        #[arg(short, long)]
        export_dir: Option<PathBuf>,
    },

    /// Print the lowest eigenvalues of the assembled Hamiltonian
    Spectrum {
        #[command(flatten)]
        system: SystemArgs,

        #[command(flatten)]
        material: MaterialArgs,

        /// Number of eigenvalues
        #[arg(short = 'n', long, default_value = "8")]
        count: usize,
    },

    /// Show version information
    Version,
}

/// Map `-v` occurrences to a filter, falling back to the configured level.
fn log_filter(verbose: u8, configured: &str) -> String {
    match verbose {
        0 => configured.to_string(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match qfea_core::SimulationConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    };

    // Setup logging
    let filter = EnvFilter::new(log_filter(cli.verbose, &config.logging.level));
    if config.logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    // Execute command
    let result = match cli.command {
        Commands::Decompose {
            system,
            material,
            max_terms,
            tolerance,
            show,
            output,
        } => decompose::execute(
            &config,
            &system,
            &material,
            max_terms,
            tolerance,
            show,
            output.as_deref(),
        ),

        Commands::Simulate {
            system,
            material,
            time,
            steps,
            order,
            max_terms,
            tolerance,
            initial,
            reference,
            export_dir,
        } => simulate::execute(
            &config,
            &system,
            &material,
            &simulate::SimulateOptions {
                time,
                steps,
                order,
                max_terms,
                tolerance,
                initial,
                reference,
                export_dir,
            },
        ),

        Commands::Spectrum {
            system,
            material,
            count,
        } => spectrum::execute(&system, &material, count),

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    // Handle errors
    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
