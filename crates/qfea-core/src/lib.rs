//! `qfea-core`: quantum time evolution of finite-element structural models.
//!
//! Turns a stiffness/mass pair `(K, M)` into the mass-normalized Hamiltonian
//! `H = L⁻¹ K L⁻ᴴ`, expands it as a bounded sum of weighted Pauli strings,
//! builds a Trotter-Suzuki schedule for `exp(-i H t)` and evolves a state
//! vector under it:
//!
//! - **assemble**: Cholesky mass normalization and power-of-two padding
//! - **decompose**: breadth-first quadrant split into Pauli coefficients
//! - **trotter** / **synthesis**: rotation schedules and their gate lowering
//! - **evolution**: exact Pauli rotations with per-step energy sampling
//! - **spectral**: classical eigen-data for cross-checking
//!
//! # Quick start
//!
//! ```rust
//! use qfea_core::{
//!     MaterialProperties, OperatorMatrix, PipelineRequest, SimulationConfig, TrotterOrder,
//!     build_hamiltonian, reference_spectrum, run_pipeline,
//! };
//!
//! let k = OperatorMatrix::from_rows(&[vec![2.0, -1.0], vec![-1.0, 2.0]]).unwrap();
//! let m = OperatorMatrix::identity(2);
//! let steel = MaterialProperties::new(200e9, 0.3, 7850.0);
//!
//! let h = build_hamiltonian(&k, &m, &steel).unwrap();
//! let request = PipelineRequest::new(1.0, 20, TrotterOrder::Second, 16, 1e-12);
//! let report = run_pipeline(&h, &request, &SimulationConfig::default()).unwrap();
//!
//! assert_eq!(report.decomposition_summary.kept_terms, 2);
//! assert_eq!(report.energy_trace.samples.len(), 20);
//!
//! let spectrum = reference_spectrum(&h, 2).unwrap();
//! assert!((spectrum[0] - 1.0).abs() < 1e-10);
//! assert!((spectrum[1] - 3.0).abs() < 1e-10);
//! ```

pub mod analysis;
pub mod assemble;
pub mod cache;
pub mod config;
pub mod decompose;
pub mod error;
pub mod evolution;
pub mod export;
pub mod operator;
pub mod pauli;
pub mod pipeline;
pub mod spectral;
pub mod statevector;
pub mod synthesis;
pub mod trotter;

pub use assemble::{AssembledSystem, Assembler, MaterialProperties, assemble, assemble_system};
pub use cache::DecompositionCache;
pub use config::{ConfigError, SimulationConfig};
pub use decompose::{Decomposer, Parallelism, PauliDecomposition, decompose};
pub use error::{QfeaError, QfeaResult};
pub use evolution::{EnergyTrace, Evolution, Evolver, InitialState, evolve};
pub use operator::OperatorMatrix;
pub use pauli::{PauliOp, PauliString, PauliTerm};
pub use pipeline::{
    Pipeline, PipelineReport, PipelineRequest, build_hamiltonian, reference_spectrum, run_batch,
    run_pipeline,
};
pub use spectral::{Eigenpair, eigen_reference};
pub use statevector::QuantumState;
pub use synthesis::{Circuit, CircuitMetrics, Gate};
pub use trotter::{TrotterEvolution, TrotterOrder, TrotterSchedule, synthesize};
