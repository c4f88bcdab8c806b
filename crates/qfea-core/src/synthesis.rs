//! Gate-level lowering of Trotter schedules.
//!
//! Each schedule entry `exp(-i · θ/2 · P)` becomes
//!
//!   basis change · CX ladder · Rz(θ) · CX ladder† · basis change†
//!
//! with the basis change taking every X factor to Z through H and every Y
//! factor through Sdg·H. The ladder folds the parity of the active qubits
//! onto the highest one so a single Rz applies the whole string.
//!
//! Gate count per entry with k active qubits: 2(k−1) CX, at most 4k basis
//! gates and one Rz. Identity entries are a global phase and emit nothing.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::error::{QfeaError, QfeaResult};
use crate::pauli::PauliOp;
use crate::trotter::{ScheduleEntry, TrotterOrder, TrotterSchedule};

/// The gate set used by lowered schedules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "gate", rename_all = "lowercase")]
pub enum Gate {
    /// Hadamard.
    H { qubit: u32 },
    /// Phase gate.
    S { qubit: u32 },
    /// Inverse phase gate.
    Sdg { qubit: u32 },
    /// Controlled-X.
    Cx { control: u32, target: u32 },
    /// `exp(-i θ/2 Z)`.
    Rz { theta: f64, qubit: u32 },
}

impl Gate {
    /// Qubits the gate acts on.
    pub fn qubits(&self) -> Vec<u32> {
        match *self {
            Gate::H { qubit }
            | Gate::S { qubit }
            | Gate::Sdg { qubit }
            | Gate::Rz { qubit, .. } => vec![qubit],
            Gate::Cx { control, target } => vec![control, target],
        }
    }

    /// True for CX.
    pub fn is_two_qubit(&self) -> bool {
        matches!(self, Gate::Cx { .. })
    }
}

/// Flat gate list on a fixed-width register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    name: String,
    num_qubits: u32,
    gates: Vec<Gate>,
}

impl Circuit {
    /// Empty circuit on `num_qubits` qubits.
    pub fn with_size(name: impl Into<String>, num_qubits: u32) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            gates: Vec::new(),
        }
    }

    /// Circuit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register width.
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    /// Gates in application order.
    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    /// Total gate count.
    pub fn gate_count(&self) -> usize {
        self.gates.len()
    }

    /// CX count.
    pub fn two_qubit_count(&self) -> usize {
        self.gates.iter().filter(|g| g.is_two_qubit()).count()
    }

    /// Number of layers when every gate is placed as early as its qubits allow.
    pub fn depth(&self) -> usize {
        let mut level = vec![0usize; self.num_qubits as usize];
        let mut depth = 0;
        for gate in &self.gates {
            let qubits = gate.qubits();
            let d = qubits.iter().map(|&q| level[q as usize]).max().unwrap_or(0) + 1;
            for q in qubits {
                level[q as usize] = d;
            }
            depth = depth.max(d);
        }
        depth
    }

    /// Append a Hadamard.
    pub fn h(&mut self, qubit: u32) -> QfeaResult<&mut Self> {
        self.push(Gate::H { qubit })
    }

    /// Append an S.
    pub fn s(&mut self, qubit: u32) -> QfeaResult<&mut Self> {
        self.push(Gate::S { qubit })
    }

    /// Append an Sdg.
    pub fn sdg(&mut self, qubit: u32) -> QfeaResult<&mut Self> {
        self.push(Gate::Sdg { qubit })
    }

    /// Append a CX.
    pub fn cx(&mut self, control: u32, target: u32) -> QfeaResult<&mut Self> {
        if control == target {
            return Err(QfeaError::invalid(format!(
                "CX control and target are both qubit {control}"
            )));
        }
        self.push(Gate::Cx { control, target })
    }

    /// Append an Rz.
    pub fn rz(&mut self, theta: f64, qubit: u32) -> QfeaResult<&mut Self> {
        self.push(Gate::Rz { theta, qubit })
    }

    fn push(&mut self, gate: Gate) -> QfeaResult<&mut Self> {
        if let Some(q) = gate.qubits().into_iter().find(|&q| q >= self.num_qubits) {
            return Err(QfeaError::invalid(format!(
                "gate on qubit {q} but circuit has {} qubits",
                self.num_qubits
            )));
        }
        self.gates.push(gate);
        Ok(self)
    }

    /// OpenQASM 3 source.
    pub fn to_qasm3(&self) -> String {
        let mut out = String::from("OPENQASM 3.0;\ninclude \"stdgates.inc\";\n\n");
        if self.num_qubits > 0 {
            let _ = writeln!(out, "qubit[{}] q;\n", self.num_qubits);
        }
        for gate in &self.gates {
            let _ = match *gate {
                Gate::H { qubit } => writeln!(out, "h q[{qubit}];"),
                Gate::S { qubit } => writeln!(out, "s q[{qubit}];"),
                Gate::Sdg { qubit } => writeln!(out, "sdg q[{qubit}];"),
                Gate::Cx { control, target } => writeln!(out, "cx q[{control}], q[{target}];"),
                Gate::Rz { theta, qubit } => writeln!(out, "rz({theta}) q[{qubit}];"),
            };
        }
        out
    }
}

/// Append the gates for `exp(-i · angle/2 · P)`.
pub fn append_exp_pauli(circuit: &mut Circuit, entry: &ScheduleEntry) -> QfeaResult<()> {
    let ops = entry.term.pauli.ops();
    let Some(&(target, _)) = ops.last() else {
        return Ok(());
    };

    basis_change(circuit, &ops, false)?;
    let qubits: Vec<u32> = ops.iter().map(|(q, _)| *q).collect();
    for w in qubits.windows(2) {
        circuit.cx(w[0], w[1])?;
    }
    circuit.rz(entry.angle, target)?;
    for w in qubits.windows(2).rev() {
        circuit.cx(w[0], w[1])?;
    }
    basis_change(circuit, &ops, true)?;
    Ok(())
}

/// X → H, Y → Sdg·H on the way in; H and H·S on the way out.
fn basis_change(circuit: &mut Circuit, ops: &[(u32, PauliOp)], undo: bool) -> QfeaResult<()> {
    for &(q, op) in ops {
        match (op, undo) {
            (PauliOp::X, _) => {
                circuit.h(q)?;
            }
            (PauliOp::Y, false) => {
                circuit.sdg(q)?.h(q)?;
            }
            (PauliOp::Y, true) => {
                circuit.h(q)?.s(q)?;
            }
            (PauliOp::Z | PauliOp::I, _) => {}
        }
    }
    Ok(())
}

impl TrotterSchedule {
    /// Lower to gates, optionally preceded by an H layer preparing the
    /// uniform superposition.
    pub fn to_circuit(&self, prepare_uniform: bool) -> QfeaResult<Circuit> {
        let name = match self.order() {
            TrotterOrder::First => "trotter1",
            TrotterOrder::Second => "trotter2",
        };
        let mut circuit = Circuit::with_size(name, self.n_qubits());
        if prepare_uniform {
            for q in 0..self.n_qubits() {
                circuit.h(q)?;
            }
        }
        for entry in self.entries() {
            append_exp_pauli(&mut circuit, entry)?;
        }
        Ok(circuit)
    }
}

/// Size and shape of a lowered schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitMetrics {
    /// Register width.
    pub qubits: u32,
    /// Total gates.
    pub gate_count: usize,
    /// Circuit depth.
    pub depth: usize,
    /// Pauli terms the schedule was built from.
    pub pauli_term_count: usize,
    /// CX count.
    pub two_qubit_gates: usize,
}

impl CircuitMetrics {
    /// Metrics of `circuit`, built from `pauli_term_count` terms.
    pub fn of(circuit: &Circuit, pauli_term_count: usize) -> Self {
        Self {
            qubits: circuit.num_qubits(),
            gate_count: circuit.gate_count(),
            depth: circuit.depth(),
            pauli_term_count,
            two_qubit_gates: circuit.two_qubit_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pauli::PauliTerm;

    fn entry(label: &str, angle: f64) -> ScheduleEntry {
        ScheduleEntry {
            term: PauliTerm::from_label(label, 1.0),
            angle,
        }
    }

    #[test]
    fn test_zz_rotation_gates() {
        let mut c = Circuit::with_size("t", 2);
        append_exp_pauli(&mut c, &entry("ZZ", 0.4)).unwrap();
        assert_eq!(
            c.gates(),
            &[
                Gate::Cx { control: 0, target: 1 },
                Gate::Rz { theta: 0.4, qubit: 1 },
                Gate::Cx { control: 0, target: 1 },
            ]
        );
    }

    #[test]
    fn test_y_basis_change() {
        let mut c = Circuit::with_size("t", 1);
        append_exp_pauli(&mut c, &entry("Y", 0.1)).unwrap();
        assert_eq!(
            c.gates(),
            &[
                Gate::Sdg { qubit: 0 },
                Gate::H { qubit: 0 },
                Gate::Rz { theta: 0.1, qubit: 0 },
                Gate::H { qubit: 0 },
                Gate::S { qubit: 0 },
            ]
        );
    }

    #[test]
    fn test_identity_entry_is_empty() {
        let mut c = Circuit::with_size("t", 3);
        append_exp_pauli(&mut c, &entry("III", 1.0)).unwrap();
        assert_eq!(c.gate_count(), 0);
        assert_eq!(c.depth(), 0);
    }

    #[test]
    fn test_depth_and_bounds() {
        let mut c = Circuit::with_size("t", 3);
        c.h(0).unwrap().h(1).unwrap().h(2).unwrap();
        assert_eq!(c.depth(), 1);
        c.cx(0, 1).unwrap();
        c.rz(0.5, 2).unwrap();
        assert_eq!(c.depth(), 2);
        c.cx(1, 2).unwrap();
        assert_eq!(c.depth(), 3);
        assert_eq!(c.two_qubit_count(), 2);
        assert!(c.h(3).is_err());
        assert!(c.cx(1, 1).is_err());
    }

    #[test]
    fn test_qasm3_output() {
        let mut c = Circuit::with_size("t", 2);
        c.h(0).unwrap().cx(0, 1).unwrap().rz(0.5, 1).unwrap();
        let qasm = c.to_qasm3();
        assert!(qasm.starts_with("OPENQASM 3.0;"));
        assert!(qasm.contains("qubit[2] q;"));
        assert!(qasm.contains("h q[0];"));
        assert!(qasm.contains("cx q[0], q[1];"));
        assert!(qasm.contains("rz(0.5) q[1];"));
    }
}
