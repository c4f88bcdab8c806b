//! Dense state-vector engine.
//!
//! Covers exactly what the evolution needs: the gate set of
//! [`crate::synthesis::Gate`] and direct Pauli rotations
//! `exp(-i θ/2 P) = cos(θ/2) I − i sin(θ/2) P`, applied pairwise in place.
//! Basis index bit q is qubit q.

use num_complex::Complex64;
use serde::Serialize;

use crate::error::{QfeaError, QfeaResult};
use crate::operator::OperatorMatrix;
use crate::pauli::PauliString;
use crate::synthesis::{Circuit, Gate};

const NORM_TOLERANCE: f64 = 1e-8;

/// Normalized amplitude vector of dimension 2^n.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantumState {
    amplitudes: Vec<Complex64>,
    num_qubits: u32,
}

impl QuantumState {
    /// `|0…0⟩`.
    pub fn zero(num_qubits: u32) -> Self {
        Self::basis(num_qubits, 0)
    }

    /// `|index⟩`; index is reduced modulo 2^n.
    pub fn basis(num_qubits: u32, index: usize) -> Self {
        let size = 1usize << num_qubits;
        let mut amplitudes = vec![Complex64::new(0.0, 0.0); size];
        amplitudes[index % size] = Complex64::new(1.0, 0.0);
        Self {
            amplitudes,
            num_qubits,
        }
    }

    /// Equal superposition over all 2^n basis states.
    pub fn uniform(num_qubits: u32) -> Self {
        let size = 1usize << num_qubits;
        let a = Complex64::new(1.0 / (size as f64).sqrt(), 0.0);
        Self {
            amplitudes: vec![a; size],
            num_qubits,
        }
    }

    /// Wrap explicit amplitudes. Length must be a power of two and the
    /// vector must be normalized.
    pub fn from_amplitudes(amplitudes: Vec<Complex64>) -> QfeaResult<Self> {
        let len = amplitudes.len();
        if len == 0 || !len.is_power_of_two() {
            return Err(QfeaError::invalid(format!(
                "state length {len} is not a power of two"
            )));
        }
        if amplitudes.iter().any(|a| !a.re.is_finite() || !a.im.is_finite()) {
            return Err(QfeaError::invalid("state has non-finite amplitudes"));
        }
        let state = Self {
            amplitudes,
            num_qubits: len.trailing_zeros(),
        };
        let norm = state.norm();
        if (norm - 1.0).abs() > NORM_TOLERANCE {
            return Err(QfeaError::invalid(format!(
                "state is not normalized (norm {norm})"
            )));
        }
        Ok(state)
    }

    /// Register width.
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    /// Vector length.
    pub fn dim(&self) -> usize {
        self.amplitudes.len()
    }

    /// Amplitudes by basis index.
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    /// Euclidean norm.
    pub fn norm(&self) -> f64 {
        self.amplitudes.iter().map(Complex64::norm_sqr).sum::<f64>().sqrt()
    }

    /// `|ψ_i|²` by basis index.
    pub fn probabilities(&self) -> Vec<f64> {
        self.amplitudes.iter().map(Complex64::norm_sqr).collect()
    }

    /// `⟨ψ|A|ψ⟩`.
    pub fn expectation(&self, op: &OperatorMatrix) -> QfeaResult<Complex64> {
        if op.dim() != self.dim() {
            return Err(QfeaError::invalid(format!(
                "operator is {0}x{0} but state has {1} amplitudes",
                op.dim(),
                self.dim()
            )));
        }
        Ok(op.expectation(&self.amplitudes))
    }

    /// Bitstring of a basis index, most significant qubit first.
    pub fn bitstring(&self, index: usize) -> String {
        format!("{:0width$b}", index, width = self.num_qubits as usize)
    }

    // =========================================================================
    // Pauli rotations
    // =========================================================================

    /// Apply `exp(-i θ/2 P)` exactly.
    pub fn apply_pauli_rotation(&mut self, pauli: &PauliString, theta: f64) -> QfeaResult<()> {
        if pauli.n_qubits() != self.num_qubits {
            return Err(QfeaError::invalid(format!(
                "Pauli string {pauli} acts on {} qubits but state has {}",
                pauli.n_qubits(),
                self.num_qubits
            )));
        }
        let c = (theta / 2.0).cos();
        let s = Complex64::new(0.0, -(theta / 2.0).sin());
        let x = pauli.x_mask();
        let z = pauli.z_mask();
        let y = pauli.y_phase();
        let phase = |j: usize| {
            if (j & z).count_ones() % 2 == 0 { y } else { -y }
        };

        if x == 0 {
            for (j, amp) in self.amplitudes.iter_mut().enumerate() {
                *amp *= c + s * phase(j);
            }
            return Ok(());
        }

        let pivot = 1usize << (usize::BITS - 1 - x.leading_zeros());
        for j in 0..self.amplitudes.len() {
            if j & pivot == 0 {
                let k = j ^ x;
                let a = self.amplitudes[j];
                let b = self.amplitudes[k];
                self.amplitudes[j] = c * a + s * phase(k) * b;
                self.amplitudes[k] = c * b + s * phase(j) * a;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Gates
    // =========================================================================

    /// Apply one gate.
    pub fn apply_gate(&mut self, gate: &Gate) -> QfeaResult<()> {
        if let Some(q) = gate.qubits().into_iter().find(|&q| q >= self.num_qubits) {
            return Err(QfeaError::invalid(format!(
                "gate on qubit {q} but state has {} qubits",
                self.num_qubits
            )));
        }
        match *gate {
            Gate::H { qubit } => self.apply_h(qubit as usize),
            Gate::S { qubit } => self.apply_phase(qubit as usize, Complex64::new(0.0, 1.0)),
            Gate::Sdg { qubit } => self.apply_phase(qubit as usize, Complex64::new(0.0, -1.0)),
            Gate::Cx { control, target } => self.apply_cx(control as usize, target as usize),
            Gate::Rz { theta, qubit } => self.apply_rz(qubit as usize, theta),
        }
        Ok(())
    }

    /// Apply every gate of `circuit` in order.
    pub fn run(&mut self, circuit: &Circuit) -> QfeaResult<()> {
        if circuit.num_qubits() != self.num_qubits {
            return Err(QfeaError::invalid(format!(
                "circuit has {} qubits but state has {}",
                circuit.num_qubits(),
                self.num_qubits
            )));
        }
        circuit.gates().iter().try_for_each(|g| self.apply_gate(g))
    }

    fn apply_h(&mut self, qubit: usize) {
        let mask = 1 << qubit;
        let sqrt2_inv = 1.0 / 2.0_f64.sqrt();
        for i in 0..self.amplitudes.len() {
            if i & mask == 0 {
                let j = i | mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = sqrt2_inv * (a + b);
                self.amplitudes[j] = sqrt2_inv * (a - b);
            }
        }
    }

    fn apply_phase(&mut self, qubit: usize, phase: Complex64) {
        let mask = 1 << qubit;
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if i & mask != 0 {
                *amp *= phase;
            }
        }
    }

    fn apply_rz(&mut self, qubit: usize, theta: f64) {
        let mask = 1 << qubit;
        let phase_0 = Complex64::from_polar(1.0, -theta / 2.0);
        let phase_1 = Complex64::from_polar(1.0, theta / 2.0);
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            *amp *= if i & mask == 0 { phase_0 } else { phase_1 };
        }
    }

    fn apply_cx(&mut self, control: usize, target: usize) {
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        for i in 0..self.amplitudes.len() {
            if (i & ctrl_mask != 0) && (i & tgt_mask == 0) {
                self.amplitudes.swap(i, i | tgt_mask);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-10
    }

    #[test]
    fn test_bell_state() {
        let mut sv = QuantumState::zero(2);
        sv.apply_h(0);
        sv.apply_cx(0, 1);

        let sqrt2_inv = 1.0 / 2.0_f64.sqrt();
        assert!(approx_eq(sv.amplitudes[0], Complex64::new(sqrt2_inv, 0.0)));
        assert!(approx_eq(sv.amplitudes[1], Complex64::new(0.0, 0.0)));
        assert!(approx_eq(sv.amplitudes[3], Complex64::new(sqrt2_inv, 0.0)));
    }

    #[test]
    fn test_x_rotation_by_pi_flips() {
        // exp(-i π/2 X)|0⟩ = -i|1⟩
        let mut sv = QuantumState::zero(1);
        sv.apply_pauli_rotation(&"X".parse().unwrap(), std::f64::consts::PI)
            .unwrap();
        assert!(approx_eq(sv.amplitudes[0], Complex64::new(0.0, 0.0)));
        assert!(approx_eq(sv.amplitudes[1], Complex64::new(0.0, -1.0)));
    }

    #[test]
    fn test_z_rotation_matches_rz() {
        let mut a = QuantumState::uniform(2);
        let mut b = a.clone();
        a.apply_pauli_rotation(&"IZ".parse().unwrap(), 0.7).unwrap();
        b.apply_rz(0, 0.7);
        for (x, y) in a.amplitudes().iter().zip(b.amplitudes()) {
            assert!(approx_eq(*x, *y));
        }
    }

    #[test]
    fn test_rotation_matches_dense_exponential() {
        // exp(-i θ/2 P) = cos(θ/2) I − i sin(θ/2) P
        let p: PauliString = "YX".parse().unwrap();
        let theta = 0.9_f64;
        let amps: Vec<Complex64> = (0..4)
            .map(|i| Complex64::new(0.5 + 0.1 * i as f64, 0.2 * i as f64))
            .collect();
        let n = amps.iter().map(Complex64::norm_sqr).sum::<f64>().sqrt();
        let amps: Vec<Complex64> = amps.into_iter().map(|a| a / n).collect();
        let mut sv = QuantumState::from_amplitudes(amps.clone()).unwrap();
        sv.apply_pauli_rotation(&p, theta).unwrap();

        let pm = p.to_matrix().apply(&amps);
        let c = (theta / 2.0).cos();
        let s = Complex64::new(0.0, -(theta / 2.0).sin());
        for i in 0..4 {
            assert!(approx_eq(sv.amplitudes[i], c * amps[i] + s * pm[i]));
        }
    }

    #[test]
    fn test_from_amplitudes_validation() {
        assert!(QuantumState::from_amplitudes(vec![Complex64::new(1.0, 0.0); 3]).is_err());
        assert!(QuantumState::from_amplitudes(vec![Complex64::new(1.0, 0.0); 2]).is_err());
        assert!(QuantumState::from_amplitudes(vec![Complex64::new(1.0, 0.0)]).is_ok());
    }

    #[test]
    fn test_bitstring_msb_first() {
        let sv = QuantumState::zero(3);
        assert_eq!(sv.bitstring(1), "001");
        assert_eq!(sv.bitstring(6), "110");
    }
}
