//! Hamiltonian statistics and classical cost estimates for reports.

use serde::{Deserialize, Serialize};

use crate::decompose::PauliDecomposition;
use crate::operator::OperatorMatrix;
use crate::pauli::{PauliOp, PauliTerm};

const DOMINANT_TERMS: usize = 5;
const BYTES_PER_AMPLITUDE: f64 = 16.0;
const OPS_PER_SECOND: f64 = 1e9;
const CLASSICAL_QUBIT_LIMIT: u32 = 30;
const CLASSICAL_MEMORY_LIMIT_GB: f64 = 64.0;

/// Matrix-level properties of a Hamiltonian.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralProperties {
    /// Frobenius norm.
    pub norm: f64,
    /// Real part of the trace.
    pub trace: f64,
    /// Numerical rank of the physical block.
    pub rank: usize,
    /// Largest `|H_ij − conj(H_ji)|`.
    pub hermitian_deviation: f64,
    /// Deviation within the given tolerance.
    pub is_hermitian: bool,
}

/// Coefficient statistics over kept Pauli terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientStats {
    /// Mean of signed coefficients.
    pub mean: f64,
    /// Population standard deviation of signed coefficients.
    pub std: f64,
    /// Largest `|c|`.
    pub max: f64,
    /// Smallest `|c|`.
    pub min: f64,
}

/// Per-letter Pauli counts over all kept labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatorCounts {
    /// Identity factors.
    pub i: usize,
    /// X factors.
    pub x: usize,
    /// Y factors.
    pub y: usize,
    /// Z factors.
    pub z: usize,
}

impl OperatorCounts {
    /// Sum of all counts.
    pub fn total(&self) -> usize {
        self.i + self.x + self.y + self.z
    }

    /// Counts as percentages of the total, all zero when empty.
    pub fn percentages(&self) -> [f64; 4] {
        let total = self.total();
        if total == 0 {
            return [0.0; 4];
        }
        [self.i, self.x, self.y, self.z].map(|c| c as f64 / total as f64 * 100.0)
    }
}

/// Pauli-level view of a decomposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PauliAnalysis {
    /// Kept terms.
    pub total_terms: usize,
    /// Largest terms by `|c|`.
    pub dominant_terms: Vec<PauliTerm>,
    /// `None` for an empty decomposition.
    pub coefficient_stats: Option<CoefficientStats>,
    /// Letter counts.
    pub operator_counts: OperatorCounts,
    /// Letter shares in percent, ordered I, X, Y, Z.
    pub operator_percentages: [f64; 4],
}

/// Combined Hamiltonian report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HamiltonianAnalysis {
    /// Matrix properties.
    pub spectral_properties: SpectralProperties,
    /// Pauli properties.
    pub pauli_analysis: PauliAnalysis,
}

/// Summarize `hamiltonian` and its decomposition.
pub fn analyze_hamiltonian(
    hamiltonian: &OperatorMatrix,
    decomposition: &PauliDecomposition,
    hermiticity_tolerance: f64,
) -> HamiltonianAnalysis {
    let (deviation, _, _) = hamiltonian.max_hermitian_deviation();
    let norm = hamiltonian.frobenius_norm();
    let rank = hamiltonian
        .physical_block()
        .to_dmatrix()
        .rank(1e-10 * norm.max(1.0));

    HamiltonianAnalysis {
        spectral_properties: SpectralProperties {
            norm,
            trace: hamiltonian.trace().re,
            rank,
            hermitian_deviation: deviation,
            is_hermitian: deviation <= hermiticity_tolerance,
        },
        pauli_analysis: analyze_pauli(decomposition),
    }
}

/// Coefficient and letter statistics of a decomposition.
pub fn analyze_pauli(decomposition: &PauliDecomposition) -> PauliAnalysis {
    let terms = decomposition.terms();
    let coefficient_stats = (!terms.is_empty()).then(|| {
        let n = terms.len() as f64;
        let mean = terms.iter().map(|t| t.coeff).sum::<f64>() / n;
        let var = terms.iter().map(|t| (t.coeff - mean).powi(2)).sum::<f64>() / n;
        CoefficientStats {
            mean,
            std: var.sqrt(),
            max: terms.iter().map(|t| t.coeff.abs()).fold(0.0, f64::max),
            min: terms.iter().map(|t| t.coeff.abs()).fold(f64::INFINITY, f64::min),
        }
    });

    let mut counts = OperatorCounts::default();
    for op in terms.iter().flat_map(|t| t.pauli.label_ops()) {
        match op {
            PauliOp::I => counts.i += 1,
            PauliOp::X => counts.x += 1,
            PauliOp::Y => counts.y += 1,
            PauliOp::Z => counts.z += 1,
        }
    }

    PauliAnalysis {
        total_terms: terms.len(),
        // Decomposition terms are already sorted by descending |c|.
        dominant_terms: terms.iter().take(DOMINANT_TERMS).cloned().collect(),
        coefficient_stats,
        operator_counts: counts,
        operator_percentages: counts.percentages(),
    }
}

/// Cost of simulating the evolution classically with a dense state vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityEstimate {
    /// Register width.
    pub qubit_count: u32,
    /// `2^n`.
    pub state_space_size: f64,
    /// State-vector memory in GiB.
    pub memory_gb: f64,
    /// Rough time per Trotter repetition at 1 GFLOP/s.
    pub estimated_seconds: f64,
    /// Within 30 qubits and 64 GiB.
    pub feasible_classical: bool,
}

/// Estimate the dense-simulation cost for `n_qubits` and `pauli_terms`.
pub fn estimate_classical_complexity(n_qubits: u32, pauli_terms: usize) -> ComplexityEstimate {
    let state_space_size = 2f64.powi(n_qubits as i32);
    let memory_gb = state_space_size * BYTES_PER_AMPLITUDE / 1024f64.powi(3);
    let estimated_seconds =
        state_space_size * f64::from(n_qubits) * pauli_terms as f64 / OPS_PER_SECOND;
    ComplexityEstimate {
        qubit_count: n_qubits,
        state_space_size,
        memory_gb,
        estimated_seconds,
        feasible_classical: n_qubits <= CLASSICAL_QUBIT_LIMIT
            && memory_gb <= CLASSICAL_MEMORY_LIMIT_GB,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_distribution() {
        let d = PauliDecomposition::from_terms(
            2,
            vec![
                PauliTerm::from_label("IZ", 2.0),
                PauliTerm::from_label("XX", -1.0),
            ],
        )
        .unwrap();
        let a = analyze_pauli(&d);
        assert_eq!(a.total_terms, 2);
        assert_eq!(a.operator_counts, OperatorCounts { i: 1, x: 2, y: 0, z: 1 });
        assert_eq!(a.operator_percentages, [25.0, 50.0, 0.0, 25.0]);
        let stats = a.coefficient_stats.unwrap();
        assert_eq!(stats.mean, 0.5);
        assert_eq!(stats.std, 1.5);
        assert_eq!(stats.max, 2.0);
        assert_eq!(stats.min, 1.0);
        assert_eq!(a.dominant_terms[0].pauli.label(), "IZ");
    }

    #[test]
    fn test_empty_decomposition_stats() {
        let d = PauliDecomposition::from_terms(1, vec![]).unwrap();
        let a = analyze_pauli(&d);
        assert!(a.coefficient_stats.is_none());
        assert_eq!(a.operator_percentages, [0.0; 4]);
    }

    #[test]
    fn test_classical_complexity() {
        let e = estimate_classical_complexity(10, 100);
        assert_eq!(e.state_space_size, 1024.0);
        assert!(e.feasible_classical);
        assert!((e.memory_gb - 1024.0 * 16.0 / 1024f64.powi(3)).abs() < 1e-18);

        let big = estimate_classical_complexity(33, 1);
        assert!(!big.feasible_classical);
    }

    #[test]
    fn test_analyze_identity() {
        let h = OperatorMatrix::identity(4);
        let d = PauliDecomposition::from_terms(2, vec![PauliTerm::from_label("II", 1.0)]).unwrap();
        let a = analyze_hamiltonian(&h, &d, 1e-9);
        assert_eq!(a.spectral_properties.rank, 4);
        assert_eq!(a.spectral_properties.trace, 4.0);
        assert!(a.spectral_properties.is_hermitian);
        assert!((a.spectral_properties.norm - 2.0).abs() < 1e-12);
    }
}
