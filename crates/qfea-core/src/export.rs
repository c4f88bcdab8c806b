//! Artifact exports: JSON for terms, schedules, traces and reports, and
//! OpenQASM 3 for circuits.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::decompose::PauliDecomposition;
use crate::error::{QfeaError, QfeaResult};
use crate::evolution::EnergyTrace;
use crate::synthesis::Circuit;
use crate::trotter::TrotterSchedule;

/// Export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Whether to pretty-print JSON output.
    pub pretty: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

/// `[label, coeff]` pairs in decomposition order.
pub fn pauli_terms(decomposition: &PauliDecomposition) -> Vec<(String, f64)> {
    decomposition
        .terms()
        .iter()
        .map(|t| (t.pauli.label(), t.coeff))
        .collect()
}

/// `[label, angle]` pairs in application order.
pub fn circuit_description(schedule: &TrotterSchedule) -> Vec<(String, f64)> {
    schedule
        .entries()
        .iter()
        .map(|e| (e.term.pauli.label(), e.angle))
        .collect()
}

/// `[time, energy]` pairs.
pub fn energy_pairs(trace: &EnergyTrace) -> Vec<(f64, f64)> {
    trace.samples.clone()
}

/// Serialize any artifact to JSON.
pub fn to_json<T: Serialize + ?Sized>(value: &T, config: &ExportConfig) -> QfeaResult<String> {
    if config.pretty {
        serde_json::to_string_pretty(value).map_err(QfeaError::from)
    } else {
        serde_json::to_string(value).map_err(QfeaError::from)
    }
}

/// Write any artifact to a JSON file.
pub fn to_file<T: Serialize + ?Sized>(
    value: &T,
    path: &Path,
    config: &ExportConfig,
) -> QfeaResult<()> {
    let json = to_json(value, config)?;
    write(path, &json)
}

/// Write a circuit as OpenQASM 3.
pub fn qasm_to_file(circuit: &Circuit, path: &Path) -> QfeaResult<()> {
    write(path, &circuit.to_qasm3())
}

fn write(path: &Path, contents: &str) -> QfeaResult<()> {
    std::fs::write(path, contents)
        .map_err(|e| QfeaError::Io(format!("Failed to write {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pauli::PauliTerm;
    use crate::trotter::{TrotterOrder, synthesize};

    fn decomp() -> PauliDecomposition {
        PauliDecomposition::from_terms(
            1,
            vec![PauliTerm::from_label("X", 0.25), PauliTerm::from_label("Z", -1.0)],
        )
        .unwrap()
    }

    #[test]
    fn test_pauli_terms_shape() {
        let json = to_json(&pauli_terms(&decomp()), &ExportConfig { pretty: false }).unwrap();
        assert_eq!(json, r#"[["Z",-1.0],["X",0.25]]"#);
    }

    #[test]
    fn test_circuit_description_shape() {
        let s = synthesize(&decomp(), 1.0, 2, TrotterOrder::First).unwrap();
        let pairs = circuit_description(&s);
        assert_eq!(pairs.len(), 4);
        assert_eq!(pairs[0], ("Z".to_string(), -1.0));
        assert_eq!(pairs[1], ("X".to_string(), 0.25));
    }

    #[test]
    fn test_energy_pairs_json() {
        let trace = EnergyTrace {
            samples: vec![(0.5, 1.0), (1.0, 1.5)],
            complete: true,
        };
        let json = to_json(&energy_pairs(&trace), &ExportConfig { pretty: false }).unwrap();
        assert_eq!(json, "[[0.5,1.0],[1.0,1.5]]");
    }

    #[test]
    fn test_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terms.json");
        to_file(&pauli_terms(&decomp()), &path, &ExportConfig::default()).unwrap();
        let back: Vec<(String, f64)> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back.len(), 2);
    }

    #[test]
    fn test_write_error_is_io() {
        let err = to_file(&[1, 2], Path::new("/nonexistent-dir/x.json"), &ExportConfig::default())
            .unwrap_err();
        assert!(matches!(err, QfeaError::Io(_)));
    }
}
