//! Normal-coordinate basis for a crystal. A force-constant matrix is
//! diagonalized into orthonormal eigenpairs, and a
//! [GeneralizedCoordinateVector] of six Voigt strains plus one amplitude per
//! eigenpair is mapped to and from a concrete distorted [Structure].

use std::{error::Error, fmt::Display};

use crystal::{StructureError, Structure};
use serde::{Deserialize, Serialize};

pub use basis::*;
pub use coords::*;
pub use fc::*;
pub use gcv::*;

mod basis;
mod coords;
mod fc;
mod gcv;


pub type Dmat = nalgebra::DMatrix<f64>;
pub type Dvec = nalgebra::DVector<f64>;

/// Numerical tolerances used when building and using an [Eigenbasis]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasisConfig {
    /// allowed deviation of each eigenvector norm from 1 and of each pairwise
    /// dot product from 0
    pub orthonormality: f64,

    /// largest difference between the 3-component blocks of two atoms for an
    /// eigenvector to still count as a rigid translation
    pub translation: f64,

    /// largest |eigenvalue| a translational mode may have
    pub translational_eigenvalue: f64,

    /// projected amplitudes smaller than this are set to zero
    pub snap: f64,
}

impl Default for BasisConfig {
    fn default() -> Self {
        Self {
            orthonormality: 1e-8,
            translation: 1e-5,
            translational_eigenvalue: 1e-3,
            snap: 1e-10,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexError {
    pub index: usize,
    pub len: usize,
}

impl Display for IndexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "index {} out of range for generalized coordinate of length {}",
            self.index, self.len
        )
    }
}

impl Error for IndexError {}

#[derive(Clone, Debug, PartialEq)]
pub enum BasisError {
    /// the eigenbasis violates one of its invariants. this means the input
    /// force constants are bad, so it is not worth retrying
    Inconsistent(String),

    /// a matrix, structure, or vector of the wrong size
    Dimension { expected: usize, got: usize },

    Index(IndexError),

    Structure(StructureError),

    Load(String),
}

impl Display for BasisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BasisError::Inconsistent(s) => {
                write!(f, "inconsistent eigenbasis: {s}")
            }
            BasisError::Dimension { expected, got } => {
                write!(f, "expected dimension {expected}, got {got}")
            }
            BasisError::Index(e) => write!(f, "{e}"),
            BasisError::Structure(e) => write!(f, "{e}"),
            BasisError::Load(s) => {
                write!(f, "failed to load force constants: {s}")
            }
        }
    }
}

impl Error for BasisError {}

impl From<IndexError> for BasisError {
    fn from(e: IndexError) -> Self {
        Self::Index(e)
    }
}

impl From<StructureError> for BasisError {
    fn from(e: StructureError) -> Self {
        Self::Structure(e)
    }
}

/// Something that turns a [GeneralizedCoordinateVector] into a [Structure] and
/// knows how energy gradients along its modes relate to Cartesian forces.
pub trait StructureProvider {
    /// the number of mode amplitudes in each generalized coordinate vector
    fn nmodes(&self) -> usize;

    /// the zero vector, corresponding to the reference structure
    fn zero(&self) -> GeneralizedCoordinateVector {
        GeneralizedCoordinateVector::zeros(self.nmodes())
    }

    fn structure(
        &self,
        vector: &GeneralizedCoordinateVector,
    ) -> Result<Structure, BasisError>;

    /// the derivative of the energy with respect to the amplitude of `mode`,
    /// given the Cartesian `forces` on a structure. forces are the negative
    /// gradient, so this is `-(F · v_mode)`
    fn mode_gradient(
        &self,
        forces: &[f64],
        mode: usize,
    ) -> Result<f64, BasisError>;
}
