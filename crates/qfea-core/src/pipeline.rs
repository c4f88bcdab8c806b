//! End-to-end entry points: assemble, decompose, synthesize, evolve, report.

use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::{
    ComplexityEstimate, HamiltonianAnalysis, analyze_hamiltonian, estimate_classical_complexity,
};
use crate::assemble::{AssembledSystem, MaterialProperties, assemble};
use crate::cache::DecompositionCache;
use crate::config::SimulationConfig;
use crate::decompose::{Decomposer, DecompositionSummary, Parallelism, PauliDecomposition};
use crate::error::QfeaResult;
use crate::evolution::{
    BasisAmplitude, EnergySplit, EnergyTrace, Evolution, Evolver, InitialState, energy_split,
};
use crate::operator::OperatorMatrix;
use crate::spectral::{ConsistencyReport, Eigenpair, check_consistency, eigen_reference};
use crate::statevector::QuantumState;
use crate::synthesis::{Circuit, CircuitMetrics};
use crate::trotter::{
    TrotterOrder, TrotterSchedule, suggest_order, synthesize, trotter_error_bound,
};

/// Assemble the padded mass-normalized Hamiltonian from K, M and material.
pub fn build_hamiltonian(
    stiffness: &OperatorMatrix,
    mass: &OperatorMatrix,
    material: &MaterialProperties,
) -> QfeaResult<OperatorMatrix> {
    assemble(stiffness, mass, material)
}

/// Parameters of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRequest {
    /// Total evolution time.
    pub time: f64,
    /// Trotter repetitions.
    pub steps: u32,
    /// Product-formula order.
    pub order: TrotterOrder,
    /// Pauli term budget.
    pub max_pauli_terms: usize,
    /// Coefficient drop threshold.
    pub tolerance: f64,
    /// Overrides the configured initial state.
    #[serde(default)]
    pub initial_state: Option<InitialState>,
}

impl PipelineRequest {
    /// Request with explicit parameters.
    pub fn new(
        time: f64,
        steps: u32,
        order: TrotterOrder,
        max_pauli_terms: usize,
        tolerance: f64,
    ) -> Self {
        Self {
            time,
            steps,
            order,
            max_pauli_terms,
            tolerance,
            initial_state: None,
        }
    }

    /// Request for `time` with every other parameter from `config`.
    pub fn from_config(config: &SimulationConfig, time: f64) -> Self {
        Self::new(
            time,
            config.trotter.default_steps,
            config.trotter.default_order,
            config.limits.max_pauli_terms,
            config.decomposition.tolerance,
        )
    }

    /// Start from `initial` instead of the configured state.
    #[must_use]
    pub fn with_initial_state(mut self, initial: InitialState) -> Self {
        self.initial_state = Some(initial);
        self
    }
}

/// Final state overview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalStateSummary {
    /// State norm after evolution.
    pub norm: f64,
    /// Energy before the first repetition.
    pub initial_energy: f64,
    /// Last sampled energy.
    pub final_energy: Option<f64>,
    /// Largest `|E(t) − E(0)|`.
    pub energy_drift: f64,
    /// Most probable basis states.
    pub top_states: Vec<BasisAmplitude>,
    /// Stiffness/mass split, when K and M are known.
    pub energy_split: Option<EnergySplit>,
}

/// Everything a caller reports about one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Decomposition overview.
    pub decomposition_summary: DecompositionSummary,
    /// Lowered circuit size.
    pub circuit_metrics: CircuitMetrics,
    /// Per-repetition energies; `complete == false` after a timeout.
    pub energy_trace: EnergyTrace,
    /// Final state overview.
    pub final_state_summary: FinalStateSummary,
    /// Order the run used.
    pub order: TrotterOrder,
    /// Commutator-free error bound of the schedule.
    pub trotter_error_bound: f64,
    /// Order the accuracy threshold recommends.
    pub suggested_order: TrotterOrder,
    /// Hamiltonian statistics.
    pub analysis: HamiltonianAnalysis,
    /// Dense classical simulation cost.
    pub classical_complexity: ComplexityEstimate,
    /// Wall-clock time of the whole run.
    pub elapsed_ms: u64,
}

/// Every artifact of one run.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// Pauli decomposition of the Hamiltonian.
    pub decomposition: Arc<PauliDecomposition>,
    /// Trotter schedule.
    pub schedule: TrotterSchedule,
    /// Gate-level lowering of the schedule.
    pub circuit: Circuit,
    /// State the evolution started from.
    pub initial_state: QuantumState,
    /// Evolution result.
    pub evolution: Evolution,
    /// Summary.
    pub report: PipelineReport,
}

/// Pipeline run together with its classical cross-check.
#[derive(Debug, Clone)]
pub struct ValidatedRun {
    /// The pipeline run.
    pub run: PipelineRun,
    /// Full reference spectrum of the physical block.
    pub spectrum: Vec<Eigenpair>,
    /// Trace against spectrum.
    pub consistency: ConsistencyReport,
}

/// Pipeline bound to a configuration and an optional shared cache.
pub struct Pipeline<'a> {
    config: &'a SimulationConfig,
    cache: Option<&'a DecompositionCache>,
}

impl<'a> Pipeline<'a> {
    /// Pipeline without a cache.
    pub fn new(config: &'a SimulationConfig) -> Self {
        Self { config, cache: None }
    }

    /// Reuse decompositions through `cache`.
    #[must_use]
    pub fn with_cache(mut self, cache: &'a DecompositionCache) -> Self {
        self.cache = Some(cache);
        self
    }

    fn decomposer(&self, request: &PipelineRequest) -> Decomposer {
        let parallelism = match self.config.limits.parallel_jobs {
            1 => Parallelism::Sequential,
            threads => Parallelism::Parallel { threads },
        };
        Decomposer::new(request.max_pauli_terms, request.tolerance)
            .with_hermiticity_tolerance(self.config.decomposition.hermiticity_tolerance)
            .with_max_qubits(self.config.limits.max_qubits)
            .with_parallelism(parallelism)
    }

    fn evolver(&self, request: &PipelineRequest) -> Evolver {
        let evolver = Evolver::from_config(self.config);
        match request.initial_state {
            Some(initial) => evolver.with_initial_state(initial),
            None => evolver,
        }
    }

    /// Run on a Hamiltonian.
    pub fn run(
        &self,
        hamiltonian: &OperatorMatrix,
        request: &PipelineRequest,
    ) -> QfeaResult<PipelineRun> {
        self.run_inner(hamiltonian, None, request)
    }

    /// Run on an assembled system, adding the stiffness/mass energy split.
    pub fn run_system(
        &self,
        system: &AssembledSystem,
        request: &PipelineRequest,
    ) -> QfeaResult<PipelineRun> {
        self.run_inner(&system.hamiltonian, Some(system), request)
    }

    fn run_inner(
        &self,
        hamiltonian: &OperatorMatrix,
        system: Option<&AssembledSystem>,
        request: &PipelineRequest,
    ) -> QfeaResult<PipelineRun> {
        let start = Instant::now();
        info!(
            dim = hamiltonian.dim(),
            time = request.time,
            steps = request.steps,
            order = ?request.order,
            max_terms = request.max_pauli_terms,
            "pipeline started"
        );

        let decomposer = self.decomposer(request);
        let decomposition = match self.cache {
            Some(cache) => cache.get_or_decompose(hamiltonian, &decomposer)?,
            None => Arc::new(decomposer.decompose(hamiltonian)?),
        };

        let schedule = synthesize(&decomposition, request.time, request.steps, request.order)?;
        let circuit = schedule.to_circuit(true)?;
        let metrics = CircuitMetrics::of(&circuit, decomposition.n_terms());

        let evolver = self.evolver(request);
        let initial_state = evolver.prepare(hamiltonian)?;
        let evolution = evolver.evolve(hamiltonian, &schedule, Some(initial_state.clone()))?;

        let split = system
            .map(|s| energy_split(&evolution.state, &s.stiffness, &s.mass))
            .transpose()?;

        let final_state_summary = FinalStateSummary {
            norm: evolution.state.norm(),
            initial_energy: evolution.initial_energy,
            final_energy: evolution.trace.samples.last().map(|&(_, e)| e),
            energy_drift: evolution.energy_drift(),
            top_states: evolution.distribution(self.config.evolution.top_states),
            energy_split: split,
        };

        let report = PipelineReport {
            decomposition_summary: decomposition.summary(),
            circuit_metrics: metrics,
            energy_trace: evolution.trace.clone(),
            final_state_summary,
            order: request.order,
            trotter_error_bound: trotter_error_bound(
                &decomposition,
                request.time,
                request.steps,
                request.order,
            ),
            suggested_order: suggest_order(
                &decomposition,
                request.time,
                request.steps,
                self.config.trotter.accuracy_threshold,
            ),
            analysis: analyze_hamiltonian(
                hamiltonian,
                &decomposition,
                self.config.decomposition.hermiticity_tolerance,
            ),
            classical_complexity: estimate_classical_complexity(
                decomposition.n_qubits(),
                decomposition.n_terms(),
            ),
            elapsed_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            kept_terms = decomposition.n_terms(),
            residual_error = decomposition.residual_error(),
            gates = metrics.gate_count,
            depth = metrics.depth,
            complete = report.energy_trace.complete,
            elapsed_ms = report.elapsed_ms,
            "pipeline finished"
        );

        Ok(PipelineRun {
            decomposition,
            schedule,
            circuit,
            initial_state,
            evolution,
            report,
        })
    }

    /// Run the pipeline and the full reference spectrum concurrently, then
    /// compare them.
    pub fn run_with_reference(
        &self,
        hamiltonian: &OperatorMatrix,
        request: &PipelineRequest,
    ) -> QfeaResult<ValidatedRun> {
        self.validated(hamiltonian, None, request)
    }

    /// [`Pipeline::run_with_reference`] on an assembled system, keeping the
    /// stiffness/mass energy split.
    pub fn run_system_with_reference(
        &self,
        system: &AssembledSystem,
        request: &PipelineRequest,
    ) -> QfeaResult<ValidatedRun> {
        self.validated(&system.hamiltonian, Some(system), request)
    }

    fn validated(
        &self,
        hamiltonian: &OperatorMatrix,
        system: Option<&AssembledSystem>,
        request: &PipelineRequest,
    ) -> QfeaResult<ValidatedRun> {
        let (run, spectrum) = rayon::join(
            || self.run_inner(hamiltonian, system, request),
            || eigen_reference(hamiltonian, hamiltonian.valid_dim()),
        );
        let (run, spectrum) = (run?, spectrum?);
        let consistency = check_consistency(&run.evolution.trace, &spectrum, &run.initial_state)?;
        Ok(ValidatedRun {
            run,
            spectrum,
            consistency,
        })
    }

    /// Run independent requests in parallel, sharing the cache.
    pub fn run_batch(
        &self,
        jobs: &[(OperatorMatrix, PipelineRequest)],
    ) -> Vec<QfeaResult<PipelineReport>> {
        jobs.par_iter()
            .map(|(h, request)| self.run(h, request).map(|r| r.report))
            .collect()
    }
}

/// Decompose, synthesize and evolve `hamiltonian`, returning the report.
///
/// A run cut short by the configured timeout still succeeds; its trace has
/// `complete == false`.
pub fn run_pipeline(
    hamiltonian: &OperatorMatrix,
    request: &PipelineRequest,
    config: &SimulationConfig,
) -> QfeaResult<PipelineReport> {
    Pipeline::new(config).run(hamiltonian, request).map(|r| r.report)
}

/// The `count` lowest eigenvalues of the physical block, ascending.
pub fn reference_spectrum(hamiltonian: &OperatorMatrix, count: usize) -> QfeaResult<Vec<f64>> {
    Ok(eigen_reference(hamiltonian, count)?
        .into_iter()
        .map(|p| p.value)
        .collect())
}

/// Run independent requests in parallel with a shared default-size cache.
pub fn run_batch(
    jobs: &[(OperatorMatrix, PipelineRequest)],
    config: &SimulationConfig,
) -> Vec<QfeaResult<PipelineReport>> {
    let cache = DecompositionCache::default();
    Pipeline::new(config).with_cache(&cache).run_batch(jobs)
}
