//! periodic crystal structures: atoms, cells, and the displacement field
//! between two structures with the same atoms

use std::{error::Error, fmt::Display};

use nalgebra as na;

pub use atom::*;
pub use lattice::Lattice;
pub use structure::Structure;

pub mod atom;
mod lattice;
mod structure;

pub type Vec3 = na::Vector3<f64>;
pub type Mat3 = na::Matrix3<f64>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StructureError {
    SingularLattice,
    Mismatch(String),
    Parse(String),
    Io(String),
}

impl Display for StructureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StructureError::SingularLattice => {
                write!(f, "lattice vectors are linearly dependent")
            }
            StructureError::Mismatch(s) => {
                write!(f, "structure mismatch: {s}")
            }
            StructureError::Parse(s) => write!(f, "parse error: {s}"),
            StructureError::Io(s) => write!(f, "{s}"),
        }
    }
}

impl Error for StructureError {}
