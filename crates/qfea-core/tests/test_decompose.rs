//! Tests for the Pauli decomposer.

use qfea_core::decompose::{Decomposer, Parallelism, decompose};
use qfea_core::operator::OperatorMatrix;
use qfea_core::pauli::PauliTerm;
use qfea_core::{PauliDecomposition, QfeaError};

/// Deterministic dense symmetric test matrix.
fn symmetric(dim: usize) -> OperatorMatrix {
    let rows: Vec<Vec<f64>> = (0..dim)
        .map(|i| {
            (0..dim)
                .map(|j| ((7 * (i + j) + i * j) % 11) as f64 - 5.0)
                .collect()
        })
        .collect();
    OperatorMatrix::from_rows(&rows).unwrap()
}

fn assert_close(a: &OperatorMatrix, b: &OperatorMatrix, tol: f64) {
    assert_eq!(a.dim(), b.dim());
    for i in 0..a.dim() {
        for j in 0..a.dim() {
            let d = (a.get(i, j) - b.get(i, j)).norm();
            assert!(d < tol, "entry ({i}, {j}) differs by {d}");
        }
    }
}

// ---------------------------------------------------------------------------
// Concrete scenarios
// ---------------------------------------------------------------------------

#[test]
fn all_ones_2x2_is_identity_plus_x() {
    let m = OperatorMatrix::from_rows(&[vec![1.0, 1.0], vec![1.0, 1.0]]).unwrap();
    let d = decompose(&m, 10, 1e-12).unwrap();
    assert_eq!(d.n_qubits(), 1);
    assert_eq!(d.n_terms(), 2);
    assert_eq!(d.total_terms(), 2);
    assert_eq!(d.residual_error(), 0.0);

    // Equal magnitudes: ties broken by label.
    assert_eq!(d.terms()[0], PauliTerm::from_label("I", 1.0));
    assert_eq!(d.terms()[1], PauliTerm::from_label("X", 1.0));
}

#[test]
fn diagonal_matrix_has_only_iz_terms() {
    let m = OperatorMatrix::from_rows(&[
        vec![1.0, 0.0, 0.0, 0.0],
        vec![0.0, 2.0, 0.0, 0.0],
        vec![0.0, 0.0, 3.0, 0.0],
        vec![0.0, 0.0, 0.0, 4.0],
    ])
    .unwrap();
    let d = decompose(&m, 100, 1e-12).unwrap();
    for t in d.terms() {
        assert!(t.pauli.label().chars().all(|c| c == 'I' || c == 'Z'));
    }
    // tr(M)/4 = 2.5 on II; ZI carries the high-bit split: (1+2−3−4)/4 = −1.
    assert_eq!(d.terms()[0], PauliTerm::from_label("II", 2.5));
    assert_eq!(d.terms()[1], PauliTerm::from_label("ZI", -1.0));
    assert_eq!(d.terms()[2], PauliTerm::from_label("IZ", -0.5));
}

#[test]
fn imaginary_offdiagonal_gives_y() {
    // Y = [[0, -i], [i, 0]]
    let y = qfea_core::PauliString::from_label("Y").unwrap().to_matrix();
    let d = decompose(&y, 10, 1e-12).unwrap();
    assert_eq!(d.terms(), &[PauliTerm::from_label("Y", 1.0)]);
}

// ---------------------------------------------------------------------------
// Round trip and truncation
// ---------------------------------------------------------------------------

#[test]
fn full_budget_round_trip_is_lossless() {
    for dim in [2, 4, 8, 16] {
        let m = symmetric(dim);
        let d = decompose(&m, usize::MAX, 0.0).unwrap();
        assert_eq!(d.residual_error(), 0.0);
        assert_close(&d.reconstruct(), &m, 1e-10);
    }
}

#[test]
fn padded_matrix_reconstructs_padded_matrix() {
    let k = symmetric(5).padded();
    assert_eq!(k.dim(), 8);
    let d = decompose(&k, usize::MAX, 0.0).unwrap();
    assert_close(&d.reconstruct(), &k, 1e-10);
}

#[test]
fn truncation_is_monotone() {
    let m = symmetric(8);
    let mut last = f64::INFINITY;
    for budget in [0, 1, 2, 4, 8, 16, 32, 64] {
        let d = decompose(&m, budget, 1e-12).unwrap();
        assert!(d.n_terms() <= budget);
        assert!(d.residual_error() <= last + 1e-12);
        last = d.residual_error();
    }
}

#[test]
fn residual_plus_kept_weight_is_parseval() {
    let m = symmetric(8);
    let total = m.frobenius_norm().powi(2) / 8.0;
    for budget in [0, 3, 10, 64] {
        let d = decompose(&m, budget, 0.0).unwrap();
        let sum = d.kept_weight() + d.residual_error();
        assert!((sum - total).abs() < 1e-9 * total, "budget {budget}: {sum} vs {total}");
    }
}

#[test]
fn zero_budget_returns_empty_with_full_residual() {
    let m = symmetric(4);
    let d = decompose(&m, 0, 1e-12).unwrap();
    assert_eq!(d.n_terms(), 0);
    assert!(d.total_terms() > 0);
    assert!(d.is_truncated());
    let full = m.frobenius_norm().powi(2) / 4.0;
    assert!((d.residual_error() - full).abs() < 1e-9);
}

#[test]
fn terms_sorted_by_descending_magnitude() {
    let d = decompose(&symmetric(16), 50, 1e-12).unwrap();
    for w in d.terms().windows(2) {
        assert!(w[0].coeff.abs() >= w[1].coeff.abs());
    }
}

#[test]
fn tolerance_drops_small_terms_into_residual() {
    let m = OperatorMatrix::from_rows(&[vec![1.0, 1e-6], vec![1e-6, 1.0]]).unwrap();
    let d = Decomposer::new(10, 1e-3)
        .with_hermiticity_tolerance(1e-9)
        .decompose(&m)
        .unwrap();
    assert_eq!(d.terms(), &[PauliTerm::from_label("I", 1.0)]);
    assert_eq!(d.total_terms(), 1);
    assert!((d.residual_error() - 1e-12).abs() < 1e-20);
}

// ---------------------------------------------------------------------------
// Determinism
// ---------------------------------------------------------------------------

#[test]
fn result_independent_of_parallelism() {
    let m = symmetric(32);
    let reference = Decomposer::new(200, 1e-12)
        .with_parallelism(Parallelism::Sequential)
        .decompose(&m)
        .unwrap();
    for p in [
        Parallelism::Parallel { threads: 0 },
        Parallelism::Parallel { threads: 1 },
        Parallelism::Parallel { threads: 3 },
    ] {
        let d = Decomposer::new(200, 1e-12)
            .with_parallelism(p)
            .decompose(&m)
            .unwrap();
        assert_eq!(d, reference, "{p:?}");
    }
}

#[test]
fn repeated_runs_are_identical() {
    let m = symmetric(16);
    let a = decompose(&m, 40, 1e-12).unwrap();
    let b = decompose(&m, 40, 1e-12).unwrap();
    assert_eq!(a, b);
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn non_power_of_two_is_invalid_input() {
    let m = symmetric(3);
    assert!(matches!(
        decompose(&m, 10, 1e-12),
        Err(QfeaError::InvalidInput { .. })
    ));
}

#[test]
fn non_hermitian_is_invalid_input() {
    let m = OperatorMatrix::from_rows(&[vec![1.0, 2.0], vec![0.0, 1.0]]).unwrap();
    let err = decompose(&m, 10, 1e-12).unwrap_err();
    assert!(matches!(err, QfeaError::InvalidInput { .. }));
}

#[test]
fn hermiticity_near_miss_is_rejected_not_corrected() {
    let m = OperatorMatrix::from_rows(&[vec![1.0, 1.0], vec![1.0 + 1e-6, 1.0]]).unwrap();
    assert!(
        Decomposer::new(10, 1e-12)
            .with_hermiticity_tolerance(1e-9)
            .decompose(&m)
            .is_err()
    );
    assert!(
        Decomposer::new(10, 1e-12)
            .with_hermiticity_tolerance(1e-5)
            .decompose(&m)
            .is_ok()
    );
}

#[test]
fn qubit_ceiling_enforced() {
    let m = OperatorMatrix::identity(8);
    assert!(matches!(
        Decomposer::new(10, 1e-12).with_max_qubits(2).decompose(&m),
        Err(QfeaError::QubitLimitExceeded { qubits: 3, limit: 2 })
    ));
}

#[test]
fn negative_tolerance_rejected() {
    assert!(decompose(&OperatorMatrix::identity(2), 10, -1.0).is_err());
    assert!(decompose(&OperatorMatrix::identity(2), 10, f64::NAN).is_err());
}

// ---------------------------------------------------------------------------
// Explicit construction
// ---------------------------------------------------------------------------

#[test]
fn from_terms_sorts_and_rejects_duplicates() {
    let d = PauliDecomposition::from_terms(
        2,
        vec![PauliTerm::from_label("XX", 0.1), PauliTerm::from_label("ZI", -2.0)],
    )
    .unwrap();
    assert_eq!(d.terms()[0].pauli.label(), "ZI");
    assert!((d.lambda() - 2.1).abs() < 1e-12);

    assert!(
        PauliDecomposition::from_terms(
            1,
            vec![PauliTerm::from_label("X", 1.0), PauliTerm::from_label("X", 2.0)],
        )
        .is_err()
    );
    assert!(PauliDecomposition::from_terms(2, vec![PauliTerm::from_label("X", 1.0)]).is_err());
}
