//! Classical reference eigen-data for cross-checking the evolution.

use nalgebra::SymmetricEigen;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{QfeaError, QfeaResult};
use crate::evolution::EnergyTrace;
use crate::operator::OperatorMatrix;
use crate::statevector::QuantumState;

const EIGEN_EPS: f64 = 1e-13;
const MAX_SWEEPS_PER_DIM: usize = 200;
const POPULATION_THRESHOLD: f64 = 1e-12;

/// One eigenvalue with its normalized eigenvector on the physical block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Eigenpair {
    /// Eigenvalue.
    pub value: f64,
    /// Eigenvector, length = physical dimension.
    pub vector: Vec<Complex64>,
}

impl Eigenpair {
    /// Eigenvector zero-extended to `dim` amplitudes.
    pub fn padded_vector(&self, dim: usize) -> Vec<Complex64> {
        let mut v = self.vector.clone();
        v.resize(dim.max(v.len()), Complex64::new(0.0, 0.0));
        v
    }
}

/// The `count` lowest eigenpairs of the physical block of `hamiltonian`,
/// ascending. `count` is clamped to the physical dimension.
pub fn eigen_reference(hamiltonian: &OperatorMatrix, count: usize) -> QfeaResult<Vec<Eigenpair>> {
    let block = hamiltonian.physical_block();
    let dim = block.dim();
    let max_sweeps = MAX_SWEEPS_PER_DIM * dim.max(1);
    let eigen = SymmetricEigen::try_new(block.to_dmatrix(), EIGEN_EPS, max_sweeps)
        .ok_or_else(|| {
            QfeaError::Spectral(format!(
                "Hermitian eigensolver did not converge for a {dim}x{dim} matrix"
            ))
        })?;

    let mut order: Vec<usize> = (0..dim).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));
    order.truncate(count.min(dim));

    debug!(dim, count = order.len(), "reference spectrum computed");

    Ok(order
        .into_iter()
        .map(|i| Eigenpair {
            value: eigen.eigenvalues[i],
            vector: eigen.eigenvectors.column(i).iter().copied().collect(),
        })
        .collect())
}

/// Agreement between an energy trace and the reference spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    /// Mean of the trace energies.
    pub mean_energy: f64,
    /// Population variance of the trace energies.
    pub energy_variance: f64,
    /// Lowest eigenvalue with non-negligible population in the initial state.
    pub min_populated: f64,
    /// Highest eigenvalue with non-negligible population in the initial state.
    pub max_populated: f64,
    /// Whether `mean_energy` lies within `[min_populated, max_populated]`.
    pub within_span: bool,
}

/// Compare a trace against `spectrum`, which should be the full spectrum of
/// the Hamiltonian the trace was recorded under.
///
/// Amplitude on padded indices counts as population of eigenvalue 0, the
/// value the padded Hamiltonian assigns there.
pub fn check_consistency(
    trace: &EnergyTrace,
    spectrum: &[Eigenpair],
    initial_state: &QuantumState,
) -> QfeaResult<ConsistencyReport> {
    if trace.samples.is_empty() {
        return Err(QfeaError::invalid("energy trace has no samples"));
    }
    let physical = spectrum.first().map_or(0, |p| p.vector.len());
    if physical > initial_state.dim() {
        return Err(QfeaError::invalid(format!(
            "spectrum has dimension {physical} but state has {} amplitudes",
            initial_state.dim()
        )));
    }

    let energies: Vec<f64> = trace.samples.iter().map(|&(_, e)| e).collect();
    let n = energies.len() as f64;
    let mean_energy = energies.iter().sum::<f64>() / n;
    let energy_variance = energies.iter().map(|e| (e - mean_energy).powi(2)).sum::<f64>() / n;

    let amps = initial_state.amplitudes();
    let mut populated: Vec<f64> = spectrum
        .iter()
        .filter(|p| {
            let overlap: Complex64 = p.vector.iter().zip(amps).map(|(v, a)| v.conj() * a).sum();
            overlap.norm_sqr() > POPULATION_THRESHOLD
        })
        .map(|p| p.value)
        .collect();
    if amps[physical..].iter().any(|a| a.norm_sqr() > POPULATION_THRESHOLD) {
        populated.push(0.0);
    }

    let min_populated = populated.iter().copied().fold(f64::INFINITY, f64::min);
    let max_populated = populated.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let slack = 1e-9 * max_populated.abs().max(min_populated.abs()).max(1.0);
    let within_span =
        mean_energy >= min_populated - slack && mean_energy <= max_populated + slack;

    Ok(ConsistencyReport {
        mean_energy,
        energy_variance,
        min_populated,
        max_populated,
        within_span,
    })
}
