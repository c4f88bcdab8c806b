//! Error types for the QFEA core.

use thiserror::Error;

use crate::evolution::EnergyTrace;

/// Errors produced anywhere in the assemble → decompose → synthesize →
/// evolve pipeline, and by the spectral reference.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QfeaError {
    /// Malformed input: non-Hermitian matrix, unsupported size, non-finite
    /// parameter, mismatched state dimension.
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// Human-readable description including the offending value.
        reason: String,
    },

    /// Stiffness and mass matrices have different dimensions.
    #[error("Stiffness matrix is {stiffness}x{stiffness} but mass matrix is {mass}x{mass}")]
    DimensionMismatch {
        /// Stiffness dimension.
        stiffness: usize,
        /// Mass dimension.
        mass: usize,
    },

    /// Mass matrix is not positive-definite (Cholesky failed).
    #[error("Mass matrix ({dim}x{dim}) is not positive-definite; Cholesky factorization failed")]
    SingularMass {
        /// Dimension of the mass matrix.
        dim: usize,
    },

    /// Trotter synthesis was given a decomposition with no terms.
    #[error("Pauli decomposition is empty; no terms to synthesise")]
    EmptyDecomposition,

    /// Trotter repetition count must be at least 1.
    #[error("steps must be at least 1, got {0}")]
    InvalidSteps(u32),

    /// Operator needs more qubits than the configured ceiling.
    #[error("System requires {qubits} qubits, maximum allowed is {limit}")]
    QubitLimitExceeded {
        /// Qubits required.
        qubits: u32,
        /// Configured ceiling.
        limit: u32,
    },

    /// Wall-clock budget exhausted; carries the partial energy trace.
    #[error("Evolution timed out after {elapsed_ms} ms ({completed}/{requested} repetitions)")]
    Timeout {
        /// Elapsed wall-clock time in milliseconds.
        elapsed_ms: u128,
        /// Repetitions completed before the deadline.
        completed: u32,
        /// Repetitions requested.
        requested: u32,
        /// Samples recorded before the deadline.
        partial: Box<EnergyTrace>,
    },

    /// Numerical consistency violation during evolution.
    #[error("Simulation error: {0}")]
    Simulation(String),

    /// Eigensolver failure.
    #[error("Spectral error: {0}")]
    Spectral(String),

    /// Artifact serialization failed.
    #[error("Export error: {0}")]
    Export(String),

    /// File I/O failed.
    #[error("I/O error: {0}")]
    Io(String),
}

impl QfeaError {
    /// Shorthand for [`QfeaError::InvalidInput`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for QfeaError {
    fn from(e: serde_json::Error) -> Self {
        QfeaError::Export(e.to_string())
    }
}

/// Result type for QFEA operations.
pub type QfeaResult<T> = Result<T, QfeaError>;
