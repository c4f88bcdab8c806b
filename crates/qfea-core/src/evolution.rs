//! Time evolution of a state vector under a Trotter schedule.
//!
//! Schedule entries are applied strictly in order as exact Pauli rotations.
//! After every full repetition the energy `Re⟨ψ|H|ψ⟩` is sampled at time
//! `k · t / steps`. The wall-clock budget is checked at repetition
//! boundaries only; a run that runs out of time returns what it has with
//! `EnergyTrace::complete == false`.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SimulationConfig;
use crate::decompose::DEFAULT_MAX_QUBITS;
use crate::error::{QfeaError, QfeaResult};
use crate::operator::OperatorMatrix;
use crate::spectral::eigen_reference;
use crate::statevector::QuantumState;
use crate::trotter::TrotterSchedule;

/// Default imaginary-residual tolerance on energy samples.
pub const DEFAULT_IMAGINARY_TOLERANCE: f64 = 1e-8;

/// Starting state when the caller supplies none.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialState {
    /// Equal superposition over all basis states.
    #[default]
    Uniform,
    /// Lowest eigenvector of the Hamiltonian.
    Ground,
    /// A single computational basis state.
    Basis(usize),
}

/// Energy samples `(time, energy)` in recording order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyTrace {
    /// Samples, one per completed repetition.
    pub samples: Vec<(f64, f64)>,
    /// False if the run stopped at the deadline.
    pub complete: bool,
}

impl EnergyTrace {
    /// Record a sample.
    pub fn push(&mut self, time: f64, energy: f64) {
        self.samples.push((time, energy));
    }

    /// Sample count.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Energies without timestamps.
    pub fn energies(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|&(_, e)| e)
    }

    /// Mean energy, `None` if empty.
    pub fn mean(&self) -> Option<f64> {
        (!self.is_empty()).then(|| self.energies().sum::<f64>() / self.len() as f64)
    }

    /// Population variance, `None` if empty.
    pub fn variance(&self) -> Option<f64> {
        let mean = self.mean()?;
        Some(self.energies().map(|e| (e - mean).powi(2)).sum::<f64>() / self.len() as f64)
    }

    /// Largest `|E(t) − reference|`.
    pub fn max_drift(&self, reference: f64) -> f64 {
        self.energies().map(|e| (e - reference).abs()).fold(0.0, f64::max)
    }
}

/// One basis state of the final distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasisAmplitude {
    /// Basis index.
    pub index: usize,
    /// Index as a bitstring, most significant qubit first.
    pub bitstring: String,
    /// Real part of the amplitude.
    pub amplitude_re: f64,
    /// Imaginary part of the amplitude.
    pub amplitude_im: f64,
    /// `|amplitude|²`.
    pub probability: f64,
    /// False for indices introduced by padding.
    pub physical: bool,
}

/// Expectations of the stiffness-only and mass-only operators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergySplit {
    /// `⟨ψ|M|ψ⟩`.
    pub kinetic: f64,
    /// `⟨ψ|K|ψ⟩`.
    pub potential: f64,
}

/// Result of one evolution run.
#[derive(Debug, Clone, Serialize)]
pub struct Evolution {
    /// State after the last completed repetition.
    pub state: QuantumState,
    /// Per-repetition energy samples.
    pub trace: EnergyTrace,
    /// Energy of the initial state.
    pub initial_energy: f64,
    /// Repetitions applied.
    pub completed_steps: u32,
    /// Repetitions requested.
    pub requested_steps: u32,
    /// Wall-clock time spent.
    pub elapsed: Duration,
    valid_dim: usize,
}

impl Evolution {
    /// `Err(Timeout)` carrying the partial trace if the run was cut short.
    pub fn require_complete(self) -> QfeaResult<Self> {
        if self.trace.complete {
            return Ok(self);
        }
        Err(QfeaError::Timeout {
            elapsed_ms: self.elapsed.as_millis(),
            completed: self.completed_steps,
            requested: self.requested_steps,
            partial: Box::new(self.trace),
        })
    }

    /// The `top` most probable basis states, descending by probability
    /// (ties by index).
    pub fn distribution(&self, top: usize) -> Vec<BasisAmplitude> {
        let amps = self.state.amplitudes();
        let mut order: Vec<usize> = (0..amps.len()).collect();
        order.sort_by(|&a, &b| {
            amps[b]
                .norm_sqr()
                .total_cmp(&amps[a].norm_sqr())
                .then(a.cmp(&b))
        });
        order
            .into_iter()
            .take(top)
            .map(|i| BasisAmplitude {
                index: i,
                bitstring: self.state.bitstring(i),
                amplitude_re: amps[i].re,
                amplitude_im: amps[i].im,
                probability: amps[i].norm_sqr(),
                physical: i < self.valid_dim,
            })
            .collect()
    }

    /// Maximum `|E(t) − E(0)|` over the trace.
    pub fn energy_drift(&self) -> f64 {
        self.trace.max_drift(self.initial_energy)
    }
}

/// Evolution engine configuration.
#[derive(Debug, Clone)]
pub struct Evolver {
    max_qubits: u32,
    timeout: Option<Duration>,
    imaginary_tolerance: f64,
    initial_state: InitialState,
}

impl Default for Evolver {
    fn default() -> Self {
        Self {
            max_qubits: DEFAULT_MAX_QUBITS,
            timeout: None,
            imaginary_tolerance: DEFAULT_IMAGINARY_TOLERANCE,
            initial_state: InitialState::default(),
        }
    }
}

impl Evolver {
    /// Evolver without a deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits and defaults from a configuration.
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            max_qubits: config.limits.max_qubits,
            timeout: Some(config.timeout()),
            imaginary_tolerance: config.evolution.imaginary_tolerance,
            initial_state: config.evolution.initial_state,
        }
    }

    /// Qubit ceiling.
    #[must_use]
    pub fn with_max_qubits(mut self, max_qubits: u32) -> Self {
        self.max_qubits = max_qubits;
        self
    }

    /// Wall-clock budget.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Allowed imaginary part of an energy sample, relative to
    /// `max(1, |energy|)`.
    #[must_use]
    pub fn with_imaginary_tolerance(mut self, tol: f64) -> Self {
        self.imaginary_tolerance = tol;
        self
    }

    /// Starting state used when `evolve` gets `None`.
    #[must_use]
    pub fn with_initial_state(mut self, initial: InitialState) -> Self {
        self.initial_state = initial;
        self
    }

    /// Build the configured default starting state for `hamiltonian`.
    pub fn prepare(&self, hamiltonian: &OperatorMatrix) -> QfeaResult<QuantumState> {
        let n = hamiltonian.n_qubits();
        match self.initial_state {
            InitialState::Uniform => Ok(QuantumState::uniform(n)),
            InitialState::Basis(i) => {
                if i >= hamiltonian.dim() {
                    return Err(QfeaError::invalid(format!(
                        "basis state {i} out of range for {} amplitudes",
                        hamiltonian.dim()
                    )));
                }
                Ok(QuantumState::basis(n, i))
            }
            InitialState::Ground => {
                let ground = eigen_reference(hamiltonian, 1)?
                    .into_iter()
                    .next()
                    .ok_or_else(|| QfeaError::Spectral("empty spectrum".into()))?;
                QuantumState::from_amplitudes(ground.padded_vector(hamiltonian.dim()))
            }
        }
    }

    /// Run `schedule` from `initial_state` (or the configured default),
    /// sampling the energy of `hamiltonian` after every repetition.
    pub fn evolve(
        &self,
        hamiltonian: &OperatorMatrix,
        schedule: &TrotterSchedule,
        initial_state: Option<QuantumState>,
    ) -> QfeaResult<Evolution> {
        let n_qubits = hamiltonian.n_qubits();
        if n_qubits > self.max_qubits {
            return Err(QfeaError::QubitLimitExceeded {
                qubits: n_qubits,
                limit: self.max_qubits,
            });
        }
        if !hamiltonian.is_power_of_two() {
            return Err(QfeaError::invalid(format!(
                "Hamiltonian dimension {} is not a power of two; pad it first",
                hamiltonian.dim()
            )));
        }
        if schedule.n_qubits() != n_qubits {
            return Err(QfeaError::invalid(format!(
                "schedule acts on {} qubits but Hamiltonian has {n_qubits}",
                schedule.n_qubits()
            )));
        }
        let mut state = match initial_state {
            Some(s) => s,
            None => self.prepare(hamiltonian)?,
        };
        if state.dim() != hamiltonian.dim() {
            return Err(QfeaError::invalid(format!(
                "initial state has {} amplitudes but Hamiltonian is {1}x{1}",
                state.dim(),
                hamiltonian.dim()
            )));
        }

        let start = Instant::now();
        let initial_energy = self.energy(hamiltonian, &state)?;
        let step_time = schedule.step_time();
        let mut trace = EnergyTrace::default();
        let mut completed = 0u32;

        debug!(
            n_qubits,
            entries = schedule.len(),
            steps = schedule.steps(),
            initial_energy,
            "starting evolution"
        );

        for repetition in schedule.repetitions() {
            if self.timeout.is_some_and(|t| start.elapsed() >= t) {
                break;
            }
            for entry in repetition {
                state.apply_pauli_rotation(&entry.term.pauli, entry.angle)?;
            }
            completed += 1;
            trace.push(f64::from(completed) * step_time, self.energy(hamiltonian, &state)?);
        }

        let elapsed = start.elapsed();
        trace.complete = completed == schedule.steps();
        if trace.complete {
            info!(
                steps = completed,
                elapsed_ms = elapsed.as_millis() as u64,
                drift = trace.max_drift(initial_energy),
                "evolution complete"
            );
        } else {
            warn!(
                completed,
                requested = schedule.steps(),
                elapsed_ms = elapsed.as_millis() as u64,
                "evolution stopped at deadline"
            );
        }

        Ok(Evolution {
            state,
            trace,
            initial_energy,
            completed_steps: completed,
            requested_steps: schedule.steps(),
            elapsed,
            valid_dim: hamiltonian.valid_dim(),
        })
    }

    fn energy(&self, hamiltonian: &OperatorMatrix, state: &QuantumState) -> QfeaResult<f64> {
        let e = state.expectation(hamiltonian)?;
        if e.im.abs() > self.imaginary_tolerance * e.re.abs().max(1.0) {
            return Err(QfeaError::Simulation(format!(
                "energy has imaginary part {:.3e} (real part {:.6e}); Hamiltonian is not Hermitian",
                e.im, e.re
            )));
        }
        Ok(e.re)
    }
}

/// Run with the default evolver.
pub fn evolve(
    hamiltonian: &OperatorMatrix,
    schedule: &TrotterSchedule,
    initial_state: Option<QuantumState>,
) -> QfeaResult<Evolution> {
    Evolver::new().evolve(hamiltonian, schedule, initial_state)
}

/// Expectations of the stiffness-only and mass-only operators in `state`.
pub fn energy_split(
    state: &QuantumState,
    stiffness: &OperatorMatrix,
    mass: &OperatorMatrix,
) -> QfeaResult<EnergySplit> {
    Ok(EnergySplit {
        kinetic: state.expectation(mass)?.re,
        potential: state.expectation(stiffness)?.re,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_statistics() {
        let mut t = EnergyTrace::default();
        assert_eq!(t.mean(), None);
        t.push(0.5, 1.0);
        t.push(1.0, 3.0);
        assert_eq!(t.mean(), Some(2.0));
        assert_eq!(t.variance(), Some(1.0));
        assert_eq!(t.max_drift(1.0), 2.0);
    }

    #[test]
    fn test_initial_state_serde() {
        let s: InitialState = serde_json::from_str("\"ground\"").unwrap();
        assert_eq!(s, InitialState::Ground);
        let s: InitialState = serde_json::from_str(r#"{"basis":2}"#).unwrap();
        assert_eq!(s, InitialState::Basis(2));
    }
}
