//! Simulate command implementation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use qfea_core::export::{self, ExportConfig};
use qfea_core::pipeline::{Pipeline, PipelineRequest, PipelineRun};
use qfea_core::spectral::ConsistencyReport;
use qfea_core::{Eigenpair, SimulationConfig};

use super::common::{self, MaterialArgs, SystemArgs};

/// Options of one simulate invocation.
pub struct SimulateOptions {
    pub time: f64,
    pub steps: Option<u32>,
    pub order: Option<String>,
    pub max_terms: Option<usize>,
    pub tolerance: Option<f64>,
    pub initial: Option<String>,
    pub reference: bool,
    pub export_dir: Option<PathBuf>,
}

impl SimulateOptions {
    /// Resolve command-line overrides against the configuration.
    fn request(&self, config: &SimulationConfig) -> Result<PipelineRequest> {
        let mut request = PipelineRequest::from_config(config, self.time);
        if let Some(steps) = self.steps {
            request.steps = steps;
        }
        if let Some(order) = &self.order {
            request.order = common::parse_order(order)?;
        }
        if let Some(max_terms) = self.max_terms {
            request.max_pauli_terms = max_terms;
        }
        if let Some(tolerance) = self.tolerance {
            request.tolerance = tolerance;
        }
        if let Some(initial) = &self.initial {
            request.initial_state = Some(common::parse_initial_state(initial)?);
        }
        Ok(request)
    }
}

/// Execute the simulate command.
pub fn execute(
    config: &SimulationConfig,
    system: &SystemArgs,
    material: &MaterialArgs,
    options: &SimulateOptions,
) -> Result<()> {
    let request = options.request(config)?;
    println!(
        "{} Simulating t = {} with {} {:?}-order Trotter steps",
        style("→").cyan().bold(),
        style(request.time).yellow(),
        style(request.steps).yellow(),
        request.order
    );

    let assembled = common::assemble(system, material)?;
    let pipeline = Pipeline::new(config);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Decomposing and evolving...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let outcome = if options.reference {
        pipeline
            .run_system_with_reference(&assembled, &request)
            .map(|v| (v.run, Some((v.spectrum, v.consistency))))
    } else {
        pipeline.run_system(&assembled, &request).map(|run| (run, None))
    };
    spinner.finish_and_clear();
    let (run, reference) = outcome.context("Pipeline failed")?;

    print_run(&run);
    if let Some((spectrum, consistency)) = &reference {
        print_reference(spectrum, consistency);
    }

    if let Some(dir) = &options.export_dir {
        write_exports(dir, &run, reference.as_ref().map(|(s, _)| s.as_slice()))?;
        println!("\n  Exports: {}", style(dir.display()).green());
    }

    Ok(())
}

fn print_run(run: &PipelineRun) {
    let report = &run.report;
    let summary = &report.decomposition_summary;
    let metrics = &report.circuit_metrics;
    let fs = &report.final_state_summary;

    if report.energy_trace.complete {
        println!("{} Simulation complete", style("✓").green().bold());
    } else {
        println!(
            "{} Timed out after {} of {} repetitions; results are partial",
            style("!").yellow().bold(),
            run.evolution.completed_steps,
            run.evolution.requested_steps
        );
    }

    println!("\n  Decomposition:");
    println!(
        "    {} qubits, {} terms kept of {}, residual {:.3e}",
        summary.n_qubits, summary.kept_terms, summary.total_terms, summary.residual_error
    );
    println!("\n  Circuit:");
    println!(
        "    {} gates ({} CX), depth {}",
        metrics.gate_count, metrics.two_qubit_gates, metrics.depth
    );
    println!(
        "    Error bound {:.3e}, suggested order {:?}",
        report.trotter_error_bound, report.suggested_order
    );

    println!("\n  Energy:");
    println!("    E(0)      = {:+.9}", fs.initial_energy);
    if let Some(e) = fs.final_energy {
        println!("    E(final)  = {e:+.9}");
    }
    println!(
        "    max drift = {}",
        style(format!("{:.3e}", fs.energy_drift)).yellow()
    );
    if let Some(split) = &fs.energy_split {
        println!(
            "    ⟨K⟩ = {:+.6}  ⟨M⟩ = {:+.6}",
            split.potential, split.kinetic
        );
    }

    if !fs.top_states.is_empty() {
        println!("\n  Most probable basis states:");
        for b in &fs.top_states {
            let bar: String = "█".repeat((b.probability * 50.0).round() as usize);
            let label = if b.physical {
                style(&b.bitstring).cyan()
            } else {
                style(&b.bitstring).dim()
            };
            println!(
                "    |{}⟩ {:>7.3}% {}",
                label,
                b.probability * 100.0,
                style(bar).green()
            );
        }
    }

    println!("\n  Time: {} ms", style(report.elapsed_ms).yellow());
}

fn print_reference(spectrum: &[Eigenpair], consistency: &ConsistencyReport) {
    println!("\n  Reference spectrum:");
    for (i, p) in spectrum.iter().take(8).enumerate() {
        println!("    λ{i} = {:+.9}", p.value);
    }
    if spectrum.len() > 8 {
        println!("    ... and {} more", spectrum.len() - 8);
    }
    let verdict = if consistency.within_span {
        style("consistent").green().bold()
    } else {
        style("outside populated span").red().bold()
    };
    println!(
        "    mean E = {:+.6} in [{:+.6}, {:+.6}]: {}",
        consistency.mean_energy, consistency.min_populated, consistency.max_populated, verdict
    );
}

/// Write every artifact of `run` under `dir`.
pub fn write_exports(dir: &Path, run: &PipelineRun, spectrum: Option<&[Eigenpair]>) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory: {}", dir.display()))?;
    let cfg = ExportConfig::default();

    export::to_file(
        &export::pauli_terms(&run.decomposition),
        &dir.join("pauli_terms.json"),
        &cfg,
    )?;
    export::to_file(
        &export::circuit_description(&run.schedule),
        &dir.join("circuit_description.json"),
        &cfg,
    )?;
    export::to_file(
        &export::energy_pairs(&run.evolution.trace),
        &dir.join("energy_trace.json"),
        &cfg,
    )?;
    export::to_file(&run.report, &dir.join("report.json"), &cfg)?;
    export::qasm_to_file(&run.circuit, &dir.join("circuit.qasm"))?;
    if let Some(spectrum) = spectrum {
        let values: Vec<f64> = spectrum.iter().map(|p| p.value).collect();
        export::to_file(&values, &dir.join("spectrum.json"), &cfg)?;
    }
    Ok(())
}
