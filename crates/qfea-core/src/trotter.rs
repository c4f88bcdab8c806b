//! Trotter-Suzuki product-formula schedules.
//!
//! Approximates `exp(-i H t)` for `H = Σ_k c_k P_k` by splitting the
//! evolution into `steps` repetitions. Every schedule entry stands for the
//! exact rotation `exp(-i · angle/2 · P_k)`.
//!
//! # First order (Lie-Trotter)
//!
//!   exp(-i H t) ≈ [∏_k exp(-i c_k P_k t/s)]^s,   angle_k = 2 c_k t/s
//!
//! Error: O(t² / s).
//!
//! # Second order (Strang)
//!
//!   S₂(τ) = [∏_k exp(-i c_k P_k τ/2)] · [∏_k↓ exp(-i c_k P_k τ/2)]
//!
//! so every entry carries half the first-order angle, `c_k t/s`, and one
//! repetition is a forward sweep followed by the reverse sweep.
//! Error: O(t³ / s²).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::decompose::PauliDecomposition;
use crate::error::{QfeaError, QfeaResult};
use crate::pauli::PauliTerm;

/// Product-formula order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrotterOrder {
    /// Lie-Trotter.
    #[default]
    First,
    /// Symmetric Strang splitting.
    Second,
}

/// One rotation `exp(-i · angle/2 · P)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Pauli term the rotation is generated by.
    pub term: PauliTerm,
    /// Rotation angle.
    pub angle: f64,
}

/// Ordered rotation sequence approximating `exp(-i H t)`.
///
/// Only [`synthesize`] and [`TrotterEvolution`] build schedules, so `steps`
/// is never zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrotterSchedule {
    entries: Vec<ScheduleEntry>,
    order: TrotterOrder,
    steps: u32,
    time: f64,
    n_qubits: u32,
}

impl TrotterSchedule {
    /// All entries in application order.
    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    /// Product-formula order.
    pub fn order(&self) -> TrotterOrder {
        self.order
    }

    /// Repetition count.
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Total evolution time.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Time advanced by one repetition.
    pub fn step_time(&self) -> f64 {
        self.time / f64::from(self.steps)
    }

    /// Register width.
    pub fn n_qubits(&self) -> u32 {
        self.n_qubits
    }

    /// Total entry count.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Never true for a schedule built by [`synthesize`].
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries making up one repetition.
    pub fn entries_per_repetition(&self) -> usize {
        self.entries.len() / self.steps as usize
    }

    /// Entries grouped by repetition.
    pub fn repetitions(&self) -> impl Iterator<Item = &[ScheduleEntry]> {
        self.entries.chunks(self.entries_per_repetition().max(1))
    }
}

/// Builder for Trotter schedules over a decomposition.
pub struct TrotterEvolution<'a> {
    decomposition: &'a PauliDecomposition,
    time: f64,
    steps: u32,
}

impl<'a> TrotterEvolution<'a> {
    /// Evolve under `decomposition` for `time`, split into `steps` repetitions.
    pub fn new(decomposition: &'a PauliDecomposition, time: f64, steps: u32) -> Self {
        Self {
            decomposition,
            time,
            steps,
        }
    }

    /// Lie-Trotter schedule: `terms × steps` entries.
    pub fn first_order(&self) -> QfeaResult<TrotterSchedule> {
        self.validate()?;
        let angle_scale = 2.0 * self.time / f64::from(self.steps);
        let terms = self.decomposition.terms();

        debug!(
            n_terms = terms.len(),
            steps = self.steps,
            n_qubits = self.decomposition.n_qubits(),
            "building first-order Trotter schedule"
        );

        let mut entries = Vec::with_capacity(terms.len() * self.steps as usize);
        for _ in 0..self.steps {
            entries.extend(terms.iter().map(|t| entry(t, angle_scale)));
        }
        Ok(self.schedule(entries, TrotterOrder::First))
    }

    /// Strang schedule: `2 × terms × steps` entries.
    pub fn second_order(&self) -> QfeaResult<TrotterSchedule> {
        self.validate()?;
        let angle_scale = self.time / f64::from(self.steps);
        let terms = self.decomposition.terms();

        debug!(
            n_terms = terms.len(),
            steps = self.steps,
            n_qubits = self.decomposition.n_qubits(),
            "building second-order Trotter schedule"
        );

        let mut entries = Vec::with_capacity(2 * terms.len() * self.steps as usize);
        for _ in 0..self.steps {
            entries.extend(terms.iter().map(|t| entry(t, angle_scale)));
            entries.extend(terms.iter().rev().map(|t| entry(t, angle_scale)));
        }
        Ok(self.schedule(entries, TrotterOrder::Second))
    }

    /// Schedule of the given order.
    pub fn build(&self, order: TrotterOrder) -> QfeaResult<TrotterSchedule> {
        match order {
            TrotterOrder::First => self.first_order(),
            TrotterOrder::Second => self.second_order(),
        }
    }

    fn validate(&self) -> QfeaResult<()> {
        if self.decomposition.n_terms() == 0 {
            return Err(QfeaError::EmptyDecomposition);
        }
        if self.steps == 0 {
            return Err(QfeaError::InvalidSteps(0));
        }
        if !self.time.is_finite() {
            return Err(QfeaError::invalid(format!(
                "evolution time must be finite, got {}",
                self.time
            )));
        }
        Ok(())
    }

    fn schedule(&self, entries: Vec<ScheduleEntry>, order: TrotterOrder) -> TrotterSchedule {
        TrotterSchedule {
            entries,
            order,
            steps: self.steps,
            time: self.time,
            n_qubits: self.decomposition.n_qubits(),
        }
    }
}

fn entry(term: &PauliTerm, angle_scale: f64) -> ScheduleEntry {
    ScheduleEntry {
        term: term.clone(),
        angle: term.coeff * angle_scale,
    }
}

/// Build a Trotter schedule for `exp(-i H t)`.
pub fn synthesize(
    decomposition: &PauliDecomposition,
    time: f64,
    steps: u32,
    order: TrotterOrder,
) -> QfeaResult<TrotterSchedule> {
    TrotterEvolution::new(decomposition, time, steps).build(order)
}

/// Commutator-free upper bound on the product-formula error in operator
/// norm, with `λ = Σ|c_k|`:
///
/// * first order: `(λt)² / (2s)`
/// * second order: `(λt)³ / (6s²)`
pub fn trotter_error_bound(
    decomposition: &PauliDecomposition,
    time: f64,
    steps: u32,
    order: TrotterOrder,
) -> f64 {
    let lt = decomposition.lambda() * time.abs();
    let s = f64::from(steps.max(1));
    match order {
        TrotterOrder::First => lt * lt / (2.0 * s),
        TrotterOrder::Second => lt * lt * lt / (6.0 * s * s),
    }
}

/// First order if its bound is within `threshold`, second order otherwise.
pub fn suggest_order(
    decomposition: &PauliDecomposition,
    time: f64,
    steps: u32,
    threshold: f64,
) -> TrotterOrder {
    if trotter_error_bound(decomposition, time, steps, TrotterOrder::First) <= threshold {
        TrotterOrder::First
    } else {
        TrotterOrder::Second
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decomp() -> PauliDecomposition {
        PauliDecomposition::from_terms(
            1,
            vec![PauliTerm::from_label("Z", 1.0), PauliTerm::from_label("X", 0.5)],
        )
        .unwrap()
    }

    #[test]
    fn test_repetitions_chunking() {
        let d = decomp();
        let s = synthesize(&d, 1.0, 3, TrotterOrder::Second).unwrap();
        assert_eq!(s.entries_per_repetition(), 4);
        assert_eq!(s.repetitions().count(), 3);
        let first: Vec<String> = s
            .repetitions()
            .next()
            .unwrap()
            .iter()
            .map(|e| e.term.pauli.label())
            .collect();
        assert_eq!(first, ["Z", "X", "X", "Z"]);
    }

    #[test]
    fn test_order_serde() {
        assert_eq!(serde_json::to_string(&TrotterOrder::Second).unwrap(), "\"second\"");
    }
}
