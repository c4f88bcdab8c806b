//! Decompose command implementation.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use console::style;

use qfea_core::analysis::analyze_pauli;
use qfea_core::export::{self, ExportConfig};
use qfea_core::{Decomposer, Parallelism, SimulationConfig};

use super::common::{self, MaterialArgs, SystemArgs};

/// Execute the decompose command.
pub fn execute(
    config: &SimulationConfig,
    system: &SystemArgs,
    material: &MaterialArgs,
    max_terms: Option<usize>,
    tolerance: Option<f64>,
    show: usize,
    output: Option<&Path>,
) -> Result<()> {
    println!("{} Decomposing Hamiltonian", style("→").cyan().bold());

    let assembled = common::assemble(system, material)?;
    let h = &assembled.hamiltonian;

    let parallelism = match config.limits.parallel_jobs {
        1 => Parallelism::Sequential,
        threads => Parallelism::Parallel { threads },
    };
    let decomposer = Decomposer::new(
        max_terms.unwrap_or(config.limits.max_pauli_terms),
        tolerance.unwrap_or(config.decomposition.tolerance),
    )
    .with_hermiticity_tolerance(config.decomposition.hermiticity_tolerance)
    .with_max_qubits(config.limits.max_qubits)
    .with_parallelism(parallelism);

    let start = Instant::now();
    let decomposition = decomposer.decompose(h).context("Pauli decomposition failed")?;
    let elapsed = start.elapsed();

    println!("{} Decomposition complete", style("✓").green().bold());
    println!(
        "  Terms: {} kept of {} above threshold",
        style(decomposition.n_terms()).yellow(),
        decomposition.total_terms()
    );
    println!(
        "  Residual error: {}",
        style(format!("{:.3e}", decomposition.residual_error())).yellow()
    );
    println!("  λ (Σ|c|): {:.6}", decomposition.lambda());
    if decomposition.is_truncated() {
        println!(
            "  {} term budget reached; increase --max-terms for a closer fit",
            style("!").yellow().bold()
        );
    }

    let stats = analyze_pauli(&decomposition);
    let [i, x, y, z] = stats.operator_percentages;
    println!(
        "  Operators: I {:.1}%  X {:.1}%  Y {:.1}%  Z {:.1}%",
        i, x, y, z
    );
    println!("  Time: {} ms", style(elapsed.as_millis()).yellow());

    let terms = export::pauli_terms(&decomposition);
    if !terms.is_empty() && show > 0 {
        println!("\n  Leading terms:");
        common::print_weighted(&terms, show);
    }

    if let Some(path) = output {
        export::to_file(&terms, path, &ExportConfig::default())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("\n  Output: {}", style(path.display()).green());
    }

    Ok(())
}
