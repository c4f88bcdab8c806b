//! Dense Hermitian operator storage.
//!
//! An [`OperatorMatrix`] is a square, row-major, complex matrix together with
//! the dimension of its *physical* block. Padding to a power of two is an
//! explicit transform ([`OperatorMatrix::padded`]) that keeps the original
//! dimension around, so padded basis states can be told apart from physical
//! ones without every consumer having to special-case padding.
//!
//! ```rust
//! use qfea_core::operator::OperatorMatrix;
//!
//! let k = OperatorMatrix::from_rows(&[
//!     vec![2.0, -1.0, 0.0],
//!     vec![-1.0, 2.0, -1.0],
//!     vec![0.0, -1.0, 2.0],
//! ]).unwrap();
//! let padded = k.padded();
//! assert_eq!(padded.dim(), 4);
//! assert_eq!(padded.n_qubits(), 2);
//! assert!(!padded.is_valid_index(3));
//! ```

use nalgebra::DMatrix;
use num_complex::Complex64;
use rayon::prelude::*;
use serde::Serialize;

use crate::error::{QfeaError, QfeaResult};

/// Square complex matrix, row-major, with a recorded physical dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperatorMatrix {
    dim: usize,
    /// Leading block that carries physical degrees of freedom. Equal to
    /// `dim` unless the matrix was produced by [`OperatorMatrix::padded`].
    valid_dim: usize,
    data: Vec<Complex64>,
}

impl OperatorMatrix {
    /// Build from row-major complex entries.
    pub fn from_row_major(dim: usize, data: Vec<Complex64>) -> QfeaResult<Self> {
        if dim == 0 {
            return Err(QfeaError::invalid("matrix dimension must be at least 1"));
        }
        if data.len() != dim * dim {
            return Err(QfeaError::invalid(format!(
                "expected {} entries for a {dim}x{dim} matrix, got {}",
                dim * dim,
                data.len()
            )));
        }
        if let Some(pos) = data.iter().position(|z| !z.re.is_finite() || !z.im.is_finite()) {
            return Err(QfeaError::invalid(format!(
                "non-finite entry at ({}, {})",
                pos / dim,
                pos % dim
            )));
        }
        Ok(Self {
            dim,
            valid_dim: dim,
            data,
        })
    }

    /// Build from row-major real entries.
    pub fn from_real(dim: usize, data: &[f64]) -> QfeaResult<Self> {
        Self::from_row_major(dim, data.iter().map(|&x| Complex64::new(x, 0.0)).collect())
    }

    /// Build from a list of real rows. All rows must have the same length as
    /// the number of rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> QfeaResult<Self> {
        let dim = rows.len();
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != dim) {
            return Err(QfeaError::invalid(format!(
                "matrix is not square: row {i} has {} entries, expected {dim}",
                row.len()
            )));
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        Self::from_real(dim, &flat)
    }

    /// The `dim × dim` identity.
    pub fn identity(dim: usize) -> Self {
        let mut data = vec![Complex64::new(0.0, 0.0); dim * dim];
        for i in 0..dim {
            data[i * dim + i] = Complex64::new(1.0, 0.0);
        }
        Self {
            dim,
            valid_dim: dim,
            data,
        }
    }

    /// Convert from an nalgebra matrix. The result is unpadded.
    pub fn from_dmatrix(m: &DMatrix<Complex64>) -> QfeaResult<Self> {
        if m.nrows() != m.ncols() {
            return Err(QfeaError::invalid(format!(
                "matrix is not square: {}x{}",
                m.nrows(),
                m.ncols()
            )));
        }
        let dim = m.nrows();
        let data = (0..dim)
            .flat_map(|i| (0..dim).map(move |j| (i, j)))
            .map(|(i, j)| m[(i, j)])
            .collect();
        Self::from_row_major(dim, data)
    }

    /// Convert to an nalgebra matrix (full padded dimension).
    pub fn to_dmatrix(&self) -> DMatrix<Complex64> {
        DMatrix::from_row_slice(self.dim, self.dim, &self.data)
    }

    /// Matrix dimension N.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Dimension of the physical (unpadded) block.
    pub fn valid_dim(&self) -> usize {
        self.valid_dim
    }

    /// Qubits needed to index this matrix: `ceil(log2(N))`.
    pub fn n_qubits(&self) -> u32 {
        self.dim.next_power_of_two().trailing_zeros()
    }

    /// True if `N` is a power of two.
    pub fn is_power_of_two(&self) -> bool {
        self.dim.is_power_of_two()
    }

    /// True if this matrix carries zero-padding beyond its physical block.
    pub fn is_padded(&self) -> bool {
        self.valid_dim < self.dim
    }

    /// True if basis index `i` belongs to the physical block.
    pub fn is_valid_index(&self, i: usize) -> bool {
        i < self.valid_dim
    }

    /// Per-basis-state validity mask.
    pub fn valid_mask(&self) -> Vec<bool> {
        (0..self.dim).map(|i| self.is_valid_index(i)).collect()
    }

    /// Entry `(i, j)`.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> Complex64 {
        self.data[i * self.dim + j]
    }

    /// Row-major entries.
    pub fn data(&self) -> &[Complex64] {
        &self.data
    }

    /// Row `i`.
    pub fn row(&self, i: usize) -> &[Complex64] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    /// Largest `|M_ij − conj(M_ji)|` and where it occurs.
    pub fn max_hermitian_deviation(&self) -> (f64, usize, usize) {
        let mut worst = (0.0, 0, 0);
        for i in 0..self.dim {
            for j in (i + 1)..self.dim {
                let dev = (self.get(i, j) - self.get(j, i).conj()).norm();
                if dev > worst.0 {
                    worst = (dev, i, j);
                }
            }
            // Diagonal of a Hermitian matrix is real.
            let diag_im = self.get(i, i).im.abs() * 2.0;
            if diag_im > worst.0 {
                worst = (diag_im, i, i);
            }
        }
        worst
    }

    /// Reject the matrix unless it is Hermitian within `tolerance`.
    pub fn check_hermitian(&self, tolerance: f64) -> QfeaResult<()> {
        let (dev, i, j) = self.max_hermitian_deviation();
        if dev > tolerance {
            return Err(QfeaError::invalid(format!(
                "{}x{} matrix is not Hermitian: |M[{i},{j}] - conj(M[{j},{i}])| = {dev:.3e} \
                 exceeds tolerance {tolerance:.3e}",
                self.dim, self.dim
            )));
        }
        Ok(())
    }

    /// `(M + Mᴴ) / 2`. Only called on explicit request; validation never
    /// symmetrizes on its own.
    #[must_use]
    pub fn symmetrized(&self) -> Self {
        let n = self.dim;
        let mut data = self.data.clone();
        for i in 0..n {
            for j in 0..n {
                data[i * n + j] = (self.get(i, j) + self.get(j, i).conj()) * 0.5;
            }
        }
        Self {
            dim: n,
            valid_dim: self.valid_dim,
            data,
        }
    }

    /// Embed into the next power-of-two dimension with zero padding.
    ///
    /// The physical dimension is preserved; a matrix that is already a power
    /// of two is returned unchanged.
    #[must_use]
    pub fn padded(&self) -> Self {
        let target = self.dim.next_power_of_two();
        if target == self.dim {
            return self.clone();
        }
        let mut data = vec![Complex64::new(0.0, 0.0); target * target];
        for i in 0..self.dim {
            data[i * target..i * target + self.dim].copy_from_slice(self.row(i));
        }
        Self {
            dim: target,
            valid_dim: self.valid_dim,
            data,
        }
    }

    /// The leading `valid_dim × valid_dim` block as an unpadded matrix.
    #[must_use]
    pub fn physical_block(&self) -> Self {
        if !self.is_padded() {
            return self.clone();
        }
        let v = self.valid_dim;
        let data = (0..v)
            .flat_map(|i| self.row(i)[..v].iter().copied())
            .collect();
        Self {
            dim: v,
            valid_dim: v,
            data,
        }
    }

    /// Matrix–vector product `M·v`.
    pub fn apply(&self, v: &[Complex64]) -> Vec<Complex64> {
        debug_assert_eq!(v.len(), self.dim);
        self.data
            .par_chunks(self.dim)
            .map(|row| row.iter().zip(v).map(|(a, b)| a * b).sum())
            .collect()
    }

    /// `⟨v|M|v⟩`. Real for Hermitian `M` up to rounding.
    pub fn expectation(&self, v: &[Complex64]) -> Complex64 {
        let mv = self.apply(v);
        v.iter().zip(&mv).map(|(a, b)| a.conj() * b).sum()
    }

    /// Trace.
    pub fn trace(&self) -> Complex64 {
        (0..self.dim).map(|i| self.get(i, i)).sum()
    }

    /// Frobenius norm `sqrt(Σ |M_ij|²)`.
    pub fn frobenius_norm(&self) -> f64 {
        self.data.iter().map(Complex64::norm_sqr).sum::<f64>().sqrt()
    }

    /// Largest entry magnitude.
    pub fn max_abs(&self) -> f64 {
        self.data.iter().map(|z| z.norm()).fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_n_qubits_rounds_up() {
        assert_eq!(OperatorMatrix::identity(1).n_qubits(), 0);
        assert_eq!(OperatorMatrix::identity(2).n_qubits(), 1);
        assert_eq!(OperatorMatrix::identity(3).n_qubits(), 2);
        assert_eq!(OperatorMatrix::identity(8).n_qubits(), 3);
        assert_eq!(OperatorMatrix::identity(9).n_qubits(), 4);
    }

    #[test]
    fn test_padded_keeps_physical_block() {
        let m = OperatorMatrix::from_rows(&[
            vec![1.0, 2.0, 3.0],
            vec![2.0, 4.0, 5.0],
            vec![3.0, 5.0, 6.0],
        ])
        .unwrap();
        let p = m.padded();
        assert_eq!(p.dim(), 4);
        assert_eq!(p.valid_dim(), 3);
        assert!(p.is_padded());
        assert_eq!(p.get(2, 1), Complex64::new(5.0, 0.0));
        assert_eq!(p.get(3, 3), Complex64::new(0.0, 0.0));
        assert_eq!(p.valid_mask(), vec![true, true, true, false]);
        assert_eq!(p.physical_block(), m);
    }

    #[test]
    fn test_padded_power_of_two_is_noop() {
        let m = OperatorMatrix::identity(4);
        assert_eq!(m.padded(), m);
        assert!(!m.is_padded());
    }

    #[test]
    fn test_rejects_non_square_rows() {
        let err = OperatorMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, QfeaError::InvalidInput { .. }));
    }

    #[test]
    fn test_rejects_nan() {
        let err = OperatorMatrix::from_real(2, &[1.0, f64::NAN, 0.0, 1.0]).unwrap_err();
        assert!(err.to_string().contains("non-finite"));
    }

    #[test]
    fn test_hermitian_check() {
        let sym = OperatorMatrix::from_rows(&[vec![1.0, 0.5], vec![0.5, 1.0]]).unwrap();
        assert!(sym.check_hermitian(0.0).is_ok());

        let asym = OperatorMatrix::from_rows(&[vec![1.0, 0.5], vec![0.5 + 1e-6, 1.0]]).unwrap();
        assert!(asym.check_hermitian(1e-9).is_err());
        assert!(asym.check_hermitian(1e-5).is_ok());
        assert!(asym.symmetrized().check_hermitian(0.0).is_ok());
    }

    #[test]
    fn test_expectation_of_identity_is_norm() {
        let m = OperatorMatrix::identity(4);
        let v = vec![Complex64::new(0.5, 0.0); 4];
        let e = m.expectation(&v);
        assert!((e.re - 1.0).abs() < 1e-12);
        assert!(e.im.abs() < 1e-12);
    }

    #[test]
    fn test_dmatrix_roundtrip() {
        let m = OperatorMatrix::from_rows(&[vec![1.0, 2.0], vec![2.0, 3.0]]).unwrap();
        let back = OperatorMatrix::from_dmatrix(&m.to_dmatrix()).unwrap();
        assert_eq!(back, m);
    }
}
