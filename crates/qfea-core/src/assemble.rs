//! Hamiltonian assembly from finite-element stiffness and mass matrices.
//!
//! The generalized eigenproblem `K x = λ M x` is turned into a standard
//! Hermitian one with the same spectrum by mass normalization:
//!
//!   M = L Lᴴ  (Cholesky),   H = L⁻¹ K L⁻ᴴ
//!
//! computed with two lower-triangular solves, `H = L⁻¹ (L⁻¹ K)ᴴ`, which is
//! valid because K is Hermitian. The result is padded to the next power of
//! two so it can be handed straight to the decomposer.

use nalgebra::Cholesky;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{QfeaError, QfeaResult};
use crate::operator::OperatorMatrix;

/// Default Hermiticity tolerance for K and M.
pub const DEFAULT_HERMITICITY_TOLERANCE: f64 = 1e-9;

/// Largest `|Im|/Re` accepted on a Cholesky pivot.
const PIVOT_IMAG_TOLERANCE: f64 = 1e-8;

/// Scalar material properties. Already folded into K and M upstream; carried
/// here only for validation and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialProperties {
    /// Young's modulus (Pa).
    pub young_modulus: f64,
    /// Poisson ratio (dimensionless).
    pub poisson_ratio: f64,
    /// Density (kg/m³).
    pub density: f64,
}

impl MaterialProperties {
    /// Create a new property set.
    pub fn new(young_modulus: f64, poisson_ratio: f64, density: f64) -> Self {
        Self {
            young_modulus,
            poisson_ratio,
            density,
        }
    }

    /// Reject non-physical values.
    pub fn validate(&self) -> QfeaResult<()> {
        if !(self.young_modulus.is_finite() && self.young_modulus > 0.0) {
            return Err(QfeaError::invalid(format!(
                "Young's modulus must be positive, got {}",
                self.young_modulus
            )));
        }
        if !(self.density.is_finite() && self.density > 0.0) {
            return Err(QfeaError::invalid(format!(
                "density must be positive, got {}",
                self.density
            )));
        }
        if !(self.poisson_ratio > -1.0 && self.poisson_ratio < 0.5) {
            return Err(QfeaError::invalid(format!(
                "Poisson ratio must lie in (-1, 0.5), got {}",
                self.poisson_ratio
            )));
        }
        Ok(())
    }
}

/// The assembled Hamiltonian together with the (padded) operators it came
/// from, for the kinetic/potential energy split.
#[derive(Debug, Clone)]
pub struct AssembledSystem {
    /// Mass-normalized stiffness, padded to a power of two.
    pub hamiltonian: OperatorMatrix,
    /// Stiffness matrix, padded.
    pub stiffness: OperatorMatrix,
    /// Mass matrix, padded.
    pub mass: OperatorMatrix,
    /// Material the matrices were assembled with.
    pub material: MaterialProperties,
}

/// Hamiltonian assembler.
#[derive(Debug, Clone)]
pub struct Assembler {
    hermiticity_tolerance: f64,
}

impl Default for Assembler {
    fn default() -> Self {
        Self {
            hermiticity_tolerance: DEFAULT_HERMITICITY_TOLERANCE,
        }
    }
}

impl Assembler {
    /// Assembler with the default tolerance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allowed asymmetry in K and M.
    #[must_use]
    pub fn with_hermiticity_tolerance(mut self, tol: f64) -> Self {
        self.hermiticity_tolerance = tol;
        self
    }

    /// Build `H = L⁻¹ K L⁻ᴴ` and retain K and M.
    pub fn assemble_system(
        &self,
        stiffness: &OperatorMatrix,
        mass: &OperatorMatrix,
        material: &MaterialProperties,
    ) -> QfeaResult<AssembledSystem> {
        material.validate()?;

        let k = stiffness.physical_block();
        let m = mass.physical_block();
        if k.dim() != m.dim() {
            return Err(QfeaError::DimensionMismatch {
                stiffness: k.dim(),
                mass: m.dim(),
            });
        }
        k.check_hermitian(self.hermiticity_tolerance)?;
        m.check_hermitian(self.hermiticity_tolerance)?;

        let dim = k.dim();
        let chol = Cholesky::new(m.to_dmatrix()).ok_or(QfeaError::SingularMass { dim })?;
        let l = chol.l();

        // Complex Cholesky takes the square root of a negative pivot instead
        // of failing: M is positive definite iff L has a real positive diagonal.
        let pivot_floor = f64::EPSILON * m.max_abs().sqrt();
        let definite = l
            .diagonal()
            .iter()
            .all(|d| d.re > pivot_floor && d.im.abs() <= PIVOT_IMAG_TOLERANCE * d.re);
        if !definite {
            return Err(QfeaError::SingularMass { dim });
        }

        // y = L⁻¹ K,  H = L⁻¹ yᴴ
        let y = l
            .solve_lower_triangular(&k.to_dmatrix())
            .ok_or(QfeaError::SingularMass { dim })?;
        let h = l
            .solve_lower_triangular(&y.adjoint())
            .ok_or(QfeaError::SingularMass { dim })?;

        // The two solves round differently above and below the diagonal.
        let h = (&h + h.adjoint()) * Complex64::new(0.5, 0.0);
        let hamiltonian = OperatorMatrix::from_dmatrix(&h)?.padded();

        info!(
            dofs = dim,
            padded_dim = hamiltonian.dim(),
            n_qubits = hamiltonian.n_qubits(),
            young_modulus = material.young_modulus,
            "Hamiltonian assembled"
        );

        Ok(AssembledSystem {
            hamiltonian,
            stiffness: k.padded(),
            mass: m.padded(),
            material: *material,
        })
    }

    /// Build `H = L⁻¹ K L⁻ᴴ`.
    pub fn assemble(
        &self,
        stiffness: &OperatorMatrix,
        mass: &OperatorMatrix,
        material: &MaterialProperties,
    ) -> QfeaResult<OperatorMatrix> {
        self.assemble_system(stiffness, mass, material)
            .map(|s| s.hamiltonian)
    }
}

/// Build the padded mass-normalized Hamiltonian with the default tolerance.
pub fn assemble(
    stiffness: &OperatorMatrix,
    mass: &OperatorMatrix,
    material: &MaterialProperties,
) -> QfeaResult<OperatorMatrix> {
    Assembler::new().assemble(stiffness, mass, material)
}

/// Like [`assemble`], additionally retaining padded K and M.
pub fn assemble_system(
    stiffness: &OperatorMatrix,
    mass: &OperatorMatrix,
    material: &MaterialProperties,
) -> QfeaResult<AssembledSystem> {
    Assembler::new().assemble_system(stiffness, mass, material)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_validation() {
        assert!(MaterialProperties::new(200e9, 0.3, 7850.0).validate().is_ok());
        assert!(MaterialProperties::new(-1.0, 0.3, 7850.0).validate().is_err());
        assert!(MaterialProperties::new(200e9, 0.5, 7850.0).validate().is_err());
        assert!(MaterialProperties::new(200e9, 0.3, f64::NAN).validate().is_err());
    }
}
