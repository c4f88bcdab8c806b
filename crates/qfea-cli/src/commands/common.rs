//! Shared helpers for CLI commands.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use serde::Deserialize;

use qfea_core::{AssembledSystem, InitialState, MaterialProperties, OperatorMatrix, TrotterOrder};

/// Where to read K and M from.
#[derive(Args, Debug, Clone)]
pub struct SystemArgs {
    /// Stiffness matrix file (JSON or YAML array of rows)
    #[arg(short = 'k', long, required_unless_present = "system")]
    pub stiffness: Option<PathBuf>,

    /// Mass matrix file (JSON or YAML array of rows)
    #[arg(short = 'm', long, required_unless_present = "system")]
    pub mass: Option<PathBuf>,

    /// Single file with `stiffness` and `mass` fields
    #[arg(long, conflicts_with_all = ["stiffness", "mass"])]
    pub system: Option<PathBuf>,
}

/// Material scalars forwarded to the assembler.
#[derive(Args, Debug, Clone)]
pub struct MaterialArgs {
    /// Young's modulus in Pa
    #[arg(long, default_value = "200e9")]
    pub young_modulus: f64,

    /// Poisson's ratio
    #[arg(long, default_value = "0.3")]
    pub poisson_ratio: f64,

    /// Density in kg/m^3
    #[arg(long, default_value = "7850")]
    pub density: f64,
}

impl MaterialArgs {
    pub fn properties(&self) -> MaterialProperties {
        MaterialProperties::new(self.young_modulus, self.poisson_ratio, self.density)
    }
}

#[derive(Deserialize)]
struct SystemFile {
    stiffness: Vec<Vec<f64>>,
    mass: Vec<Vec<f64>>,
}

/// Deserialize a JSON or YAML file by extension; anything else is tried as JSON.
fn read_structured<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext.to_lowercase().as_str() {
        "yaml" | "yml" => serde_yaml_ng::from_str(&source)
            .with_context(|| format!("Invalid YAML in {}", path.display())),
        _ => serde_json::from_str(&source)
            .with_context(|| format!("Invalid JSON in {}", path.display())),
    }
}

/// Load a square matrix given as an array of rows.
pub fn load_matrix(path: &Path) -> Result<OperatorMatrix> {
    let rows: Vec<Vec<f64>> = read_structured(path)?;
    OperatorMatrix::from_rows(&rows)
        .with_context(|| format!("Invalid matrix in {}", path.display()))
}

/// Load K and M from either the combined file or the two separate files.
pub fn load_system(args: &SystemArgs) -> Result<(OperatorMatrix, OperatorMatrix)> {
    if let Some(path) = &args.system {
        let file: SystemFile = read_structured(path)?;
        let k = OperatorMatrix::from_rows(&file.stiffness)
            .with_context(|| format!("Invalid stiffness matrix in {}", path.display()))?;
        let m = OperatorMatrix::from_rows(&file.mass)
            .with_context(|| format!("Invalid mass matrix in {}", path.display()))?;
        return Ok((k, m));
    }
    match (&args.stiffness, &args.mass) {
        (Some(k), Some(m)) => Ok((load_matrix(k)?, load_matrix(m)?)),
        _ => anyhow::bail!("Both --stiffness and --mass are required without --system"),
    }
}

/// Load K and M and assemble the padded Hamiltonian.
pub fn assemble(system: &SystemArgs, material: &MaterialArgs) -> Result<AssembledSystem> {
    let (k, m) = load_system(system)?;
    println!(
        "  Loaded: {}x{} stiffness, {}x{} mass",
        k.dim(),
        k.dim(),
        m.dim(),
        m.dim()
    );
    let assembled = qfea_core::assemble_system(&k, &m, &material.properties())
        .context("Hamiltonian assembly failed")?;
    println!(
        "  Hamiltonian: dimension {} ({} qubits, {} physical)",
        assembled.hamiltonian.dim(),
        assembled.hamiltonian.n_qubits(),
        assembled.hamiltonian.valid_dim()
    );
    Ok(assembled)
}

/// Parse a product-formula order name.
pub fn parse_order(name: &str) -> Result<TrotterOrder> {
    match name.to_lowercase().as_str() {
        "first" | "1" => Ok(TrotterOrder::First),
        "second" | "2" => Ok(TrotterOrder::Second),
        other => anyhow::bail!("Unknown Trotter order: '{other}'. Available: first, second"),
    }
}

/// Parse an initial-state name: `uniform`, `ground` or `basis:<index>`.
pub fn parse_initial_state(name: &str) -> Result<InitialState> {
    let lower = name.to_lowercase();
    match lower.as_str() {
        "uniform" => Ok(InitialState::Uniform),
        "ground" => Ok(InitialState::Ground),
        _ => match lower.strip_prefix("basis:") {
            Some(index) => index
                .parse()
                .map(InitialState::Basis)
                .with_context(|| format!("Invalid basis index: '{index}'")),
            None => anyhow::bail!(
                "Unknown initial state: '{name}'. Available: uniform, ground, basis:<index>"
            ),
        },
    }
}

/// Print `(label, value)` rows with a proportional bar.
pub fn print_weighted(rows: &[(String, f64)], limit: usize) {
    let max = rows.iter().map(|(_, v)| v.abs()).fold(0.0, f64::max);
    for (label, value) in rows.iter().take(limit) {
        let bar_len = if max > 0.0 {
            (value.abs() / max * 30.0).round() as usize
        } else {
            0
        };
        println!(
            "  {}: {:>+14.6e} {}",
            style(label).cyan(),
            value,
            style("█".repeat(bar_len)).green()
        );
    }
    if rows.len() > limit {
        println!("  ... and {} more", rows.len() - limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_names() {
        assert_eq!(parse_order("first").unwrap(), TrotterOrder::First);
        assert_eq!(parse_order("Second").unwrap(), TrotterOrder::Second);
        assert_eq!(parse_order("2").unwrap(), TrotterOrder::Second);
        assert!(parse_order("third").is_err());
    }

    #[test]
    fn initial_state_specs() {
        assert_eq!(parse_initial_state("uniform").unwrap(), InitialState::Uniform);
        assert_eq!(parse_initial_state("GROUND").unwrap(), InitialState::Ground);
        assert_eq!(parse_initial_state("basis:5").unwrap(), InitialState::Basis(5));
        assert!(parse_initial_state("basis:x").is_err());
        assert!(parse_initial_state("random").is_err());
    }

    #[test]
    fn load_json_and_yaml_matrices() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("k.json");
        fs::write(&json, "[[2.0, -1.0], [-1.0, 2.0]]").unwrap();
        let yaml = dir.path().join("m.yaml");
        fs::write(&yaml, "- [1.0, 0.0]\n- [0.0, 1.0]\n").unwrap();

        let k = load_matrix(&json).unwrap();
        assert_eq!(k.dim(), 2);
        assert_eq!(k.get(0, 1).re, -1.0);
        assert_eq!(load_matrix(&yaml).unwrap(), OperatorMatrix::identity(2));
    }

    #[test]
    fn load_combined_system_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bar.json");
        fs::write(
            &path,
            r#"{"stiffness": [[2, -1], [-1, 2]], "mass": [[1, 0], [0, 1]]}"#,
        )
        .unwrap();
        let args = SystemArgs {
            stiffness: None,
            mass: None,
            system: Some(path),
        };
        let (k, m) = load_system(&args).unwrap();
        assert_eq!(k.get(1, 1).re, 2.0);
        assert_eq!(m, OperatorMatrix::identity(2));
    }

    #[test]
    fn missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_matrix(&dir.path().join("absent.json")).is_err());

        let ragged = dir.path().join("ragged.json");
        fs::write(&ragged, "[[1.0, 2.0], [3.0]]").unwrap();
        assert!(load_matrix(&ragged).is_err());

        let garbage = dir.path().join("garbage.json");
        fs::write(&garbage, "not json").unwrap();
        assert!(load_matrix(&garbage).is_err());
    }
}
