//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - quantum time evolution of finite-element models",
        style("QFEA").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Stages:");
    println!("  assemble    H = L⁻¹ K L⁻ᴴ from stiffness and mass");
    println!("  decompose   Pauli decomposition with term budget");
    println!("  trotter     First- and second-order product formulas");
    println!("  evolve      State-vector evolution and energy trace");
    println!("  spectrum    Classical reference eigenvalues");
    println!();
    println!("License:    {}", style("Apache-2.0").dim());
}
