//! Pauli-string data structures.
//!
//! A Hermitian operator on n qubits is written as a sum of weighted Pauli
//! strings:
//!
//!   H = Σ_k  c_k · P_k,   P_k ∈ {I, X, Y, Z}^⊗n,  c_k ∈ ℝ
//!
//! Labels are dense and big-endian: character 0 acts on the most significant
//! bit of the basis index (qubit n−1), the last character on qubit 0.
//!
//! # Example
//!
//! ```rust
//! use qfea_core::pauli::{PauliOp, PauliString, PauliTerm};
//!
//! let p: PauliString = "XZI".parse().unwrap();
//! assert_eq!(p.n_qubits(), 3);
//! assert_eq!(p.ops(), vec![(1, PauliOp::Z), (2, PauliOp::X)]);
//!
//! let term = PauliTerm::new(p, -0.5);
//! assert_eq!(term.pauli.label(), "XZI");
//! ```

use std::fmt;
use std::str::FromStr;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{QfeaError, QfeaResult};
use crate::operator::OperatorMatrix;

/// Single-qubit Pauli operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PauliOp {
    /// Identity. Contributes a global phase when exponentiated.
    I,
    /// Pauli-X.
    X,
    /// Pauli-Y.
    Y,
    /// Pauli-Z.
    Z,
}

impl PauliOp {
    /// Label character.
    pub fn as_char(self) -> char {
        match self {
            PauliOp::I => 'I',
            PauliOp::X => 'X',
            PauliOp::Y => 'Y',
            PauliOp::Z => 'Z',
        }
    }

    /// Parse a label character (case-insensitive).
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'I' => Some(PauliOp::I),
            'X' => Some(PauliOp::X),
            'Y' => Some(PauliOp::Y),
            'Z' => Some(PauliOp::Z),
            _ => None,
        }
    }

    /// Flips the computational basis bit (X or Y).
    fn flips(self) -> bool {
        matches!(self, PauliOp::X | PauliOp::Y)
    }

    /// Applies a sign on the |1⟩ component (Z or Y).
    fn phases(self) -> bool {
        matches!(self, PauliOp::Z | PauliOp::Y)
    }
}

/// Dense tensor product of single-qubit Paulis, one per qubit, in label order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PauliString {
    ops: Vec<PauliOp>,
}

impl PauliString {
    /// The all-identity string on `n_qubits` qubits.
    pub fn identity(n_qubits: u32) -> Self {
        Self {
            ops: vec![PauliOp::I; n_qubits as usize],
        }
    }

    /// Build directly from label-ordered operators.
    pub fn from_label_ops(ops: Vec<PauliOp>) -> Self {
        Self { ops }
    }

    /// Build from sparse `(qubit, op)` pairs on an `n_qubits`-wide register.
    /// Unlisted qubits are identity.
    pub fn from_ops(
        n_qubits: u32,
        ops: impl IntoIterator<Item = (u32, PauliOp)>,
    ) -> QfeaResult<Self> {
        let mut s = Self::identity(n_qubits);
        for (q, op) in ops {
            if q >= n_qubits {
                return Err(QfeaError::invalid(format!(
                    "Pauli operator on qubit {q} but register only has {n_qubits} qubits"
                )));
            }
            s.ops[(n_qubits - 1 - q) as usize] = op;
        }
        Ok(s)
    }

    /// Parse a label such as `"IXYZ"`.
    pub fn from_label(label: &str) -> QfeaResult<Self> {
        label
            .chars()
            .map(|c| {
                PauliOp::from_char(c).ok_or_else(|| {
                    QfeaError::invalid(format!(
                        "invalid Pauli label character '{c}' in \"{label}\""
                    ))
                })
            })
            .collect::<QfeaResult<Vec<_>>>()
            .map(Self::from_label_ops)
    }

    /// Label string over {I, X, Y, Z}.
    pub fn label(&self) -> String {
        self.ops.iter().map(|op| op.as_char()).collect()
    }

    /// Register width.
    pub fn n_qubits(&self) -> u32 {
        self.ops.len() as u32
    }

    /// Label-ordered operators.
    pub fn label_ops(&self) -> &[PauliOp] {
        &self.ops
    }

    /// Operator acting on `qubit`.
    pub fn op_on(&self, qubit: u32) -> PauliOp {
        self.ops[self.ops.len() - 1 - qubit as usize]
    }

    /// Non-identity `(qubit, op)` pairs, sorted by qubit index ascending.
    pub fn ops(&self) -> Vec<(u32, PauliOp)> {
        (0..self.n_qubits())
            .map(|q| (q, self.op_on(q)))
            .filter(|(_, op)| *op != PauliOp::I)
            .collect()
    }

    /// Number of non-identity factors.
    pub fn weight(&self) -> usize {
        self.ops.iter().filter(|op| **op != PauliOp::I).count()
    }

    /// True if every factor is the identity.
    pub fn is_identity(&self) -> bool {
        self.weight() == 0
    }

    /// Basis-index bits flipped by this string.
    pub fn x_mask(&self) -> usize {
        self.mask(PauliOp::flips)
    }

    /// Basis-index bits that pick up a sign.
    pub fn z_mask(&self) -> usize {
        self.mask(PauliOp::phases)
    }

    fn mask(&self, pred: fn(PauliOp) -> bool) -> usize {
        (0..self.n_qubits())
            .filter(|&q| pred(self.op_on(q)))
            .fold(0, |m, q| m | (1 << q))
    }

    /// Global factor `i^{#Y}` from writing each Y as `i·X·Z`.
    pub fn y_phase(&self) -> Complex64 {
        let ys = self.ops.iter().filter(|op| **op == PauliOp::Y).count();
        match ys % 4 {
            0 => Complex64::new(1.0, 0.0),
            1 => Complex64::new(0.0, 1.0),
            2 => Complex64::new(-1.0, 0.0),
            _ => Complex64::new(0.0, -1.0),
        }
    }

    /// `P|j⟩ = phase · |k⟩`; returns `(k, phase)`.
    pub fn apply_to_basis(&self, j: usize) -> (usize, Complex64) {
        let sign = if (j & self.z_mask()).count_ones() % 2 == 0 {
            1.0
        } else {
            -1.0
        };
        (j ^ self.x_mask(), self.y_phase() * sign)
    }

    /// Dense `2^n × 2^n` matrix of this string.
    pub fn to_matrix(&self) -> OperatorMatrix {
        let dim = 1usize << self.n_qubits();
        let mut data = vec![Complex64::new(0.0, 0.0); dim * dim];
        let (x, z, y) = (self.x_mask(), self.z_mask(), self.y_phase());
        for j in 0..dim {
            let sign = if (j & z).count_ones() % 2 == 0 { 1.0 } else { -1.0 };
            data[(j ^ x) * dim + j] = y * sign;
        }
        OperatorMatrix::from_row_major(dim, data)
            .expect("Pauli matrix has 4^n finite entries by construction")
    }
}

impl fmt::Display for PauliString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl FromStr for PauliString {
    type Err = QfeaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s)
    }
}

impl From<PauliString> for String {
    fn from(p: PauliString) -> Self {
        p.label()
    }
}

impl TryFrom<String> for PauliString {
    type Error = QfeaError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_label(&s)
    }
}

/// A single weighted Pauli term: `coeff · pauli`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PauliTerm {
    /// The Pauli string.
    pub pauli: PauliString,
    /// Real coefficient.
    pub coeff: f64,
}

impl PauliTerm {
    /// Create a new term.
    pub fn new(pauli: PauliString, coeff: f64) -> Self {
        Self { pauli, coeff }
    }

    /// Shorthand from a label; panics on an invalid label.
    ///
    /// Intended for tests and literals.
    pub fn from_label(label: &str, coeff: f64) -> Self {
        Self::new(
            PauliString::from_label(label).expect("invalid Pauli label literal"),
            coeff,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn test_label_roundtrip() {
        let p = PauliString::from_label("ixYz").unwrap();
        assert_eq!(p.label(), "IXYZ");
        assert_eq!(p.to_string(), "IXYZ");
        assert!(PauliString::from_label("IXA").is_err());
    }

    #[test]
    fn test_big_endian_qubit_order() {
        let p = PauliString::from_label("XI").unwrap();
        assert_eq!(p.op_on(1), PauliOp::X);
        assert_eq!(p.op_on(0), PauliOp::I);
        assert_eq!(p.x_mask(), 0b10);
    }

    #[test]
    fn test_from_ops_matches_label() {
        let p = PauliString::from_ops(3, [(0, PauliOp::Z), (2, PauliOp::Y)]).unwrap();
        assert_eq!(p.label(), "YIZ");
        assert!(PauliString::from_ops(2, [(2, PauliOp::X)]).is_err());
    }

    #[test]
    fn test_single_qubit_matrices() {
        let y = PauliString::from_label("Y").unwrap().to_matrix();
        assert_eq!(y.get(0, 1), c(0.0, -1.0));
        assert_eq!(y.get(1, 0), c(0.0, 1.0));

        let z = PauliString::from_label("Z").unwrap().to_matrix();
        assert_eq!(z.get(0, 0), c(1.0, 0.0));
        assert_eq!(z.get(1, 1), c(-1.0, 0.0));

        let x = PauliString::from_label("X").unwrap().to_matrix();
        assert_eq!(x.get(0, 1), c(1.0, 0.0));
        assert_eq!(x.get(0, 0), c(0.0, 0.0));
    }

    #[test]
    fn test_tensor_product_order() {
        // X ⊗ Z = [[0, Z], [Z, 0]]
        let m = PauliString::from_label("XZ").unwrap().to_matrix();
        assert_eq!(m.get(0, 2), c(1.0, 0.0));
        assert_eq!(m.get(1, 3), c(-1.0, 0.0));
        assert_eq!(m.get(2, 0), c(1.0, 0.0));
        assert_eq!(m.get(3, 1), c(-1.0, 0.0));
        assert!(m.check_hermitian(0.0).is_ok());
    }

    #[test]
    fn test_serde_as_label() {
        let t = PauliTerm::from_label("XY", 0.25);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, r#"{"pauli":"XY","coeff":0.25}"#);
        let back: PauliTerm = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
