//! Tests for the reference eigensolver and trace consistency checks.

use qfea_core::evolution::EnergyTrace;
use qfea_core::operator::OperatorMatrix;
use qfea_core::spectral::{check_consistency, eigen_reference};
use qfea_core::statevector::QuantumState;

fn chain(n: usize) -> OperatorMatrix {
    let rows: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            (0..n)
                .map(|j| match i.abs_diff(j) {
                    0 => 2.0,
                    1 => -1.0,
                    _ => 0.0,
                })
                .collect()
        })
        .collect();
    OperatorMatrix::from_rows(&rows).unwrap()
}

#[test]
fn eigenvalues_ascending() {
    let eig = eigen_reference(&chain(4), 4).unwrap();
    assert_eq!(eig.len(), 4);
    for w in eig.windows(2) {
        assert!(w[0].value <= w[1].value);
    }
    // 2 − 2cos(kπ/5)
    for (k, p) in eig.iter().enumerate() {
        let expected = 2.0 - 2.0 * ((k + 1) as f64 * std::f64::consts::PI / 5.0).cos();
        assert!((p.value - expected).abs() < 1e-10, "{} vs {expected}", p.value);
    }
}

#[test]
fn count_is_clamped_to_physical_dimension() {
    let h = chain(3).padded();
    let eig = eigen_reference(&h, 10).unwrap();
    assert_eq!(eig.len(), 3);
    assert_eq!(eig[0].vector.len(), 3);
    assert_eq!(eig[0].padded_vector(4).len(), 4);

    let lowest = eigen_reference(&h, 1).unwrap();
    assert_eq!(lowest.len(), 1);
    assert!((lowest[0].value - (2.0 - 2f64.sqrt())).abs() < 1e-10);
}

#[test]
fn eigenvectors_are_normalized_eigenvectors() {
    let h = chain(4);
    for p in eigen_reference(&h, 4).unwrap() {
        let norm: f64 = p.vector.iter().map(|a| a.norm_sqr()).sum();
        assert!((norm - 1.0).abs() < 1e-10);
        let hv = h.apply(&p.vector);
        for (a, v) in hv.iter().zip(&p.vector) {
            assert!((a - v * p.value).norm() < 1e-9);
        }
    }
}

#[test]
fn consistency_of_exact_trace() {
    let h = OperatorMatrix::from_rows(&[vec![1.0, 0.0], vec![0.0, 3.0]]).unwrap();
    let spectrum = eigen_reference(&h, 2).unwrap();
    let state = QuantumState::uniform(1);
    let mut trace = EnergyTrace::default();
    for k in 1..=4 {
        trace.push(k as f64 * 0.1, 2.0);
    }
    trace.complete = true;

    let report = check_consistency(&trace, &spectrum, &state).unwrap();
    assert_eq!(report.mean_energy, 2.0);
    assert_eq!(report.energy_variance, 0.0);
    assert!((report.min_populated - 1.0).abs() < 1e-12);
    assert!((report.max_populated - 3.0).abs() < 1e-12);
    assert!(report.within_span);
}

#[test]
fn unpopulated_levels_narrow_the_span() {
    let h = OperatorMatrix::from_rows(&[vec![1.0, 0.0], vec![0.0, 3.0]]).unwrap();
    let spectrum = eigen_reference(&h, 2).unwrap();
    // Only the lower level is populated, so a mean of 2 is out of span.
    let state = QuantumState::basis(1, 0);
    let mut trace = EnergyTrace::default();
    trace.push(0.5, 2.0);

    let report = check_consistency(&trace, &spectrum, &state).unwrap();
    assert_eq!(report.min_populated, report.max_populated);
    assert!(!report.within_span);
}

#[test]
fn padded_population_counts_as_zero_energy() {
    let h = chain(3).padded();
    let spectrum = eigen_reference(&h, 3).unwrap();
    let state = QuantumState::basis(2, 3);
    let mut trace = EnergyTrace::default();
    trace.push(1.0, 0.0);
    let report = check_consistency(&trace, &spectrum, &state).unwrap();
    assert_eq!(report.min_populated, 0.0);
    assert_eq!(report.max_populated, 0.0);
    assert!(report.within_span);
}

#[test]
fn empty_trace_rejected() {
    let spectrum = eigen_reference(&chain(2), 2).unwrap();
    assert!(check_consistency(&EnergyTrace::default(), &spectrum, &QuantumState::zero(1)).is_err());
}
