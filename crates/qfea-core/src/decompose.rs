//! Pauli decomposition of Hermitian operators.
//!
//! The n-qubit Pauli strings form an orthogonal basis of the 2^n × 2^n
//! Hermitian matrices under the Hilbert–Schmidt inner product, with
//!
//!   c_P = tr(P · M) / N.
//!
//! Rather than enumerating all 4^n strings, the matrix is split into
//! quadrants one qubit at a time. For a block `[[A, B], [C, D]]`:
//!
//! ```text
//!   I ⊗ (A + D)/2   +   X ⊗ (B + C)/2   +   Y ⊗ i(B − C)/2   +   Z ⊗ (A − D)/2
//! ```
//!
//! so each level halves the block size and quadruples the block count,
//! touching N² entries per level: O(N² log N) overall. Blocks within a level
//! are independent and split on the rayon pool; the level list itself is an
//! explicit work list, so there is no recursion to overflow.
//!
//! Every coefficient below a block is bounded by that block's largest entry,
//! so blocks that cannot produce a term above the drop threshold are pruned
//! whole; their weight ‖B‖²_F / size still goes into the residual.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use num_complex::Complex64;

use crate::error::{QfeaError, QfeaResult};
use crate::operator::OperatorMatrix;
use crate::pauli::{PauliOp, PauliString, PauliTerm};

/// Default qubit ceiling for decomposition.
pub const DEFAULT_MAX_QUBITS: u32 = 20;

/// How the quadrant split is scheduled. Affects running time only; the
/// result is identical for every setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parallelism {
    /// Split every level on the calling thread.
    Sequential,
    /// Split on rayon. `threads == 0` uses the global pool, otherwise a
    /// dedicated pool of that size.
    Parallel {
        /// Worker count (0 = global pool).
        threads: usize,
    },
}

impl Default for Parallelism {
    fn default() -> Self {
        Parallelism::Parallel { threads: 0 }
    }
}

/// A weighted, truncated Pauli expansion of an operator.
///
/// Terms are ordered by descending `|coeff|`, ties broken by label, and no
/// label appears twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PauliDecomposition {
    n_qubits: u32,
    terms: Vec<PauliTerm>,
    total_terms: usize,
    residual_error: f64,
}

impl PauliDecomposition {
    /// Assemble a decomposition from explicit terms.
    ///
    /// Terms are re-sorted into canonical order. Fails on width mismatch or
    /// duplicate labels. The residual is zero: nothing was discarded.
    pub fn from_terms(n_qubits: u32, mut terms: Vec<PauliTerm>) -> QfeaResult<Self> {
        if let Some(t) = terms.iter().find(|t| t.pauli.n_qubits() != n_qubits) {
            return Err(QfeaError::invalid(format!(
                "term {} has {} qubits, expected {n_qubits}",
                t.pauli,
                t.pauli.n_qubits()
            )));
        }
        terms.sort_by(|a, b| a.pauli.cmp(&b.pauli));
        if let Some(w) = terms.windows(2).find(|w| w[0].pauli == w[1].pauli) {
            return Err(QfeaError::invalid(format!(
                "duplicate Pauli label {}",
                w[0].pauli
            )));
        }
        sort_canonical(&mut terms);
        Ok(Self {
            n_qubits,
            total_terms: terms.len(),
            terms,
            residual_error: 0.0,
        })
    }

    /// Kept terms.
    pub fn terms(&self) -> &[PauliTerm] {
        &self.terms
    }

    /// Number of kept terms.
    pub fn n_terms(&self) -> usize {
        self.terms.len()
    }

    /// Register width.
    pub fn n_qubits(&self) -> u32 {
        self.n_qubits
    }

    /// Terms above the drop threshold before the budget was applied.
    pub fn total_terms(&self) -> usize {
        self.total_terms
    }

    /// Σ c² over every coefficient that was discarded.
    pub fn residual_error(&self) -> f64 {
        self.residual_error
    }

    /// True if the term budget cut anything.
    pub fn is_truncated(&self) -> bool {
        self.terms.len() < self.total_terms
    }

    /// Σ |c_k|, the 1-norm used in Trotter error bounds.
    pub fn lambda(&self) -> f64 {
        self.terms.iter().map(|t| t.coeff.abs()).sum()
    }

    /// Σ c_k² over kept terms.
    pub fn kept_weight(&self) -> f64 {
        self.terms.iter().map(|t| t.coeff * t.coeff).sum()
    }

    /// Rebuild `Σ c_k · P_k` as a dense matrix.
    pub fn reconstruct(&self) -> OperatorMatrix {
        let dim = 1usize << self.n_qubits;
        let mut data = vec![Complex64::new(0.0, 0.0); dim * dim];
        for term in &self.terms {
            for j in 0..dim {
                let (k, phase) = term.pauli.apply_to_basis(j);
                data[k * dim + j] += phase * term.coeff;
            }
        }
        OperatorMatrix::from_row_major(dim, data)
            .expect("reconstruction has 4^n finite entries by construction")
    }

    /// Serializable overview.
    pub fn summary(&self) -> DecompositionSummary {
        DecompositionSummary {
            n_qubits: self.n_qubits,
            kept_terms: self.terms.len(),
            total_terms: self.total_terms,
            residual_error: self.residual_error,
            lambda: self.lambda(),
            largest: self.terms.first().cloned(),
        }
    }
}

/// Compact description of a decomposition for reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecompositionSummary {
    /// Register width.
    pub n_qubits: u32,
    /// Terms kept under the budget.
    pub kept_terms: usize,
    /// Terms above the drop threshold.
    pub total_terms: usize,
    /// Σ c² of discarded coefficients.
    pub residual_error: f64,
    /// Σ |c| of kept coefficients.
    pub lambda: f64,
    /// Dominant term, if any.
    pub largest: Option<PauliTerm>,
}

/// Configurable Pauli decomposer.
#[derive(Debug, Clone)]
pub struct Decomposer {
    max_terms: usize,
    tolerance: f64,
    hermiticity_tolerance: Option<f64>,
    max_qubits: u32,
    parallelism: Parallelism,
}

impl Decomposer {
    /// Keep at most `max_terms` terms, dropping any with `|c| < tolerance`.
    pub fn new(max_terms: usize, tolerance: f64) -> Self {
        Self {
            max_terms,
            tolerance,
            hermiticity_tolerance: None,
            max_qubits: DEFAULT_MAX_QUBITS,
            parallelism: Parallelism::default(),
        }
    }

    /// Hermiticity tolerance; defaults to the drop tolerance.
    #[must_use]
    pub fn with_hermiticity_tolerance(mut self, tol: f64) -> Self {
        self.hermiticity_tolerance = Some(tol);
        self
    }

    /// Qubit ceiling.
    #[must_use]
    pub fn with_max_qubits(mut self, max_qubits: u32) -> Self {
        self.max_qubits = max_qubits;
        self
    }

    /// Scheduling of the quadrant split.
    #[must_use]
    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Term budget.
    pub fn max_terms(&self) -> usize {
        self.max_terms
    }

    /// Drop threshold.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Allowed `|M - Mᴴ|` entry; defaults to the drop threshold.
    pub fn hermiticity_tolerance(&self) -> f64 {
        self.hermiticity_tolerance.unwrap_or(self.tolerance)
    }

    /// Qubit ceiling.
    pub fn max_qubits(&self) -> u32 {
        self.max_qubits
    }

    /// Decompose `matrix`.
    pub fn decompose(&self, matrix: &OperatorMatrix) -> QfeaResult<PauliDecomposition> {
        self.validate(matrix)?;
        let n_qubits = matrix.n_qubits();

        let (leaves, pruned_weight) = match self.parallelism {
            Parallelism::Sequential => self.split_levels(matrix, false),
            Parallelism::Parallel { threads: 0 } => self.split_levels(matrix, true),
            Parallelism::Parallel { threads } => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| {
                        QfeaError::invalid(format!("cannot build {threads}-thread pool: {e}"))
                    })?;
                pool.install(|| self.split_levels(matrix, true))
            }
        };

        let mut residual = pruned_weight;
        let mut terms = Vec::with_capacity(leaves.len());
        for Block { code, data } in leaves {
            let c = data[0];
            // Imaginary parts come from the anti-Hermitian remainder the
            // tolerance admitted.
            residual += c.im * c.im;
            if self.keeps(c.re.abs()) {
                terms.push((code, c.re));
            } else {
                residual += c.re * c.re;
            }
        }

        terms.sort_by(|(ca, a), (cb, b)| b.abs().total_cmp(&a.abs()).then(ca.cmp(cb)));
        let total_terms = terms.len();
        if terms.len() > self.max_terms {
            residual += terms[self.max_terms..]
                .iter()
                .map(|(_, c)| c * c)
                .sum::<f64>();
            terms.truncate(self.max_terms);
        }

        let terms: Vec<PauliTerm> = terms
            .into_iter()
            .map(|(code, c)| PauliTerm::new(decode_label(code, n_qubits), c))
            .collect();

        info!(
            n_qubits,
            kept = terms.len(),
            total = total_terms,
            residual_error = residual,
            "Pauli decomposition complete"
        );

        Ok(PauliDecomposition {
            n_qubits,
            terms,
            total_terms,
            residual_error: residual,
        })
    }

    fn validate(&self, matrix: &OperatorMatrix) -> QfeaResult<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(QfeaError::invalid(format!(
                "tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        if !matrix.is_power_of_two() {
            return Err(QfeaError::invalid(format!(
                "matrix dimension {} is not a power of two; pad it first (OperatorMatrix::padded)",
                matrix.dim()
            )));
        }
        if matrix.n_qubits() > self.max_qubits {
            return Err(QfeaError::QubitLimitExceeded {
                qubits: matrix.n_qubits(),
                limit: self.max_qubits,
            });
        }
        matrix.check_hermitian(self.hermiticity_tolerance())
    }

    /// Whether a coefficient of magnitude `abs` survives the drop threshold.
    fn keeps(&self, abs: f64) -> bool {
        abs > 0.0 && abs >= self.tolerance
    }

    /// Run the level-by-level quadrant split down to 1×1 blocks.
    ///
    /// Returns the surviving leaves in label order and the total weight of
    /// pruned blocks.
    fn split_levels(&self, matrix: &OperatorMatrix, parallel: bool) -> (Vec<Block>, f64) {
        let mut level = vec![Block {
            code: 0,
            data: matrix.data().to_vec(),
        }];
        let mut pruned = 0.0;
        let mut size = matrix.dim();

        while size > 1 {
            let splits: Vec<(Vec<Block>, f64)> = if parallel {
                level
                    .into_par_iter()
                    .map(|b| self.split_block(b, size))
                    .collect()
            } else {
                level
                    .into_iter()
                    .map(|b| self.split_block(b, size))
                    .collect()
            };

            // Sequential merge keeps the order and the float sum deterministic.
            level = Vec::with_capacity(splits.len() * 4);
            for (children, weight) in splits {
                level.extend(children);
                pruned += weight;
            }
            size /= 2;
            debug!(block_size = size, blocks = level.len(), "quadrant split level");
        }

        (level, pruned)
    }

    /// Split one `size × size` block into its I, X, Y, Z children.
    fn split_block(&self, block: Block, size: usize) -> (Vec<Block>, f64) {
        let half = size / 2;
        let d = &block.data;
        let mut children: [Vec<Complex64>; 4] =
            std::array::from_fn(|_| Vec::with_capacity(half * half));

        for i in 0..half {
            let top = i * size;
            let bottom = (i + half) * size;
            for j in 0..half {
                let a = d[top + j];
                let b = d[top + j + half];
                let c = d[bottom + j];
                let dd = d[bottom + j + half];
                children[0].push((a + dd) * 0.5);
                children[1].push((b + c) * 0.5);
                children[2].push(Complex64::new(0.0, 0.5) * (b - c));
                children[3].push((a - dd) * 0.5);
            }
        }

        let mut kept = Vec::with_capacity(4);
        let mut pruned = 0.0;
        for (letter, data) in children.into_iter().enumerate() {
            let max = data.iter().map(|z| z.norm()).fold(0.0, f64::max);
            if self.keeps(max) {
                kept.push(Block {
                    code: (block.code << 2) | letter as u64,
                    data,
                });
            } else {
                pruned += data.iter().map(Complex64::norm_sqr).sum::<f64>() / half as f64;
            }
        }
        (kept, pruned)
    }
}

/// Decompose `matrix` keeping at most `max_terms` terms with
/// `|c| >= tolerance`, using the default qubit ceiling and the global rayon
/// pool. The Hermiticity check uses the same tolerance.
pub fn decompose(
    matrix: &OperatorMatrix,
    max_terms: usize,
    tolerance: f64,
) -> QfeaResult<PauliDecomposition> {
    Decomposer::new(max_terms, tolerance).decompose(matrix)
}

/// A block of the quadrant split, tagged with its label prefix.
struct Block {
    /// Label prefix, two bits per letter (I=0, X=1, Y=2, Z=3), first letter
    /// in the most significant position.
    code: u64,
    data: Vec<Complex64>,
}

const LETTERS: [PauliOp; 4] = [PauliOp::I, PauliOp::X, PauliOp::Y, PauliOp::Z];

fn decode_label(code: u64, n_qubits: u32) -> PauliString {
    let ops = (0..n_qubits)
        .map(|k| LETTERS[((code >> (2 * (n_qubits - 1 - k))) & 3) as usize])
        .collect();
    PauliString::from_label_ops(ops)
}

/// Descending |c|, then label.
fn sort_canonical(terms: &mut [PauliTerm]) {
    terms.sort_by(|a, b| {
        b.coeff
            .abs()
            .total_cmp(&a.coeff.abs())
            .then_with(|| a.pauli.cmp(&b.pauli))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_label() {
        // X=1, Z=3, I=0 → 0b01_11_00
        assert_eq!(decode_label(0b01_11_00, 3).label(), "XZI");
        assert_eq!(decode_label(0, 0).label(), "");
    }

    #[test]
    fn test_label_codes_sort_like_labels() {
        let labels: Vec<String> = (0..16).map(|c| decode_label(c, 2).label()).collect();
        let mut sorted = labels.clone();
        sorted.sort();
        assert_eq!(labels, sorted);
    }

    #[test]
    fn test_split_block_single_qubit() {
        let m = OperatorMatrix::from_rows(&[vec![3.0, 1.0], vec![1.0, -1.0]]).unwrap();
        let d = Decomposer::new(16, 0.0);
        let (children, pruned) = d.split_block(
            Block {
                code: 0,
                data: m.data().to_vec(),
            },
            2,
        );
        // I: 1, X: 1, Y: 0 (pruned), Z: 2
        let coeffs: Vec<(u64, f64)> = children.iter().map(|b| (b.code, b.data[0].re)).collect();
        assert_eq!(coeffs, vec![(0, 1.0), (1, 1.0), (3, 2.0)]);
        assert_eq!(pruned, 0.0);
    }

    #[test]
    fn test_pruned_weight_counts_toward_residual() {
        let m = OperatorMatrix::from_rows(&[vec![1.0, 1e-3], vec![1e-3, 1.0]]).unwrap();
        let d = decompose(&m, 16, 1e-2).unwrap();
        assert_eq!(d.n_terms(), 1);
        assert!((d.residual_error() - 1e-6).abs() < 1e-15);
    }
}
