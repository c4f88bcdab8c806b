//! Spectrum command implementation.

use anyhow::{Context, Result};
use console::style;

use qfea_core::pipeline::reference_spectrum;

use super::common::{self, MaterialArgs, SystemArgs};

/// Execute the spectrum command.
pub fn execute(system: &SystemArgs, material: &MaterialArgs, count: usize) -> Result<()> {
    println!("{} Computing reference spectrum", style("→").cyan().bold());

    let assembled = common::assemble(system, material)?;
    let values = reference_spectrum(&assembled.hamiltonian, count)
        .context("Eigendecomposition failed")?;

    println!(
        "{} {} lowest eigenvalues",
        style("✓").green().bold(),
        values.len()
    );
    for (i, value) in values.iter().enumerate() {
        // ω = sqrt(λ) for the mass-normalized system
        let omega = value.max(0.0).sqrt();
        println!(
            "  λ{:<3} = {:+.9e}   ω = {}",
            i,
            value,
            style(format!("{omega:.6e}")).yellow()
        );
    }

    Ok(())
}
