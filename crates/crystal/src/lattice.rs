use serde::{Deserialize, Serialize};

use crate::{Mat3, StructureError, Vec3};

/// A periodic cell. The rows of `matrix` are the cell vectors a, b, and c in
/// Å, so a Cartesian position is `fracᵀ · matrix`. The inverse of the
/// transpose is kept alongside so fractional conversions don't have to invert
/// anything.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "[[f64; 3]; 3]", into = "[[f64; 3]; 3]")]
pub struct Lattice {
    matrix: Mat3,
    inv_t: Mat3,
}

// the inverse is derived from the matrix, so only compare the matrix
impl PartialEq for Lattice {
    fn eq(&self, other: &Self) -> bool {
        self.matrix == other.matrix
    }
}

impl TryFrom<[[f64; 3]; 3]> for Lattice {
    type Error = StructureError;

    fn try_from(rows: [[f64; 3]; 3]) -> Result<Self, Self::Error> {
        Self::from_rows(&rows)
    }
}

impl From<Lattice> for [[f64; 3]; 3] {
    fn from(lat: Lattice) -> Self {
        let m = lat.matrix;
        [
            [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
            [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
            [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
        ]
    }
}

impl Lattice {
    /// build a Lattice from a matrix whose rows are the cell vectors. returns
    /// [StructureError::SingularLattice] if the vectors are linearly
    /// dependent
    pub fn new(matrix: Mat3) -> Result<Self, StructureError> {
        let inv_t = matrix
            .transpose()
            .try_inverse()
            .ok_or(StructureError::SingularLattice)?;
        Ok(Self { matrix, inv_t })
    }

    pub fn from_rows(rows: &[[f64; 3]; 3]) -> Result<Self, StructureError> {
        Self::new(Mat3::from_row_slice(rows.as_flattened()))
    }

    pub fn cubic(a: f64) -> Result<Self, StructureError> {
        Self::orthorhombic(a, a, a)
    }

    pub fn orthorhombic(a: f64, b: f64, c: f64) -> Result<Self, StructureError> {
        Self::new(Mat3::from_diagonal(&Vec3::new(a, b, c)))
    }

    pub fn matrix(&self) -> &Mat3 {
        &self.matrix
    }

    pub fn volume(&self) -> f64 {
        self.matrix.determinant().abs()
    }

    /// fractional coordinates of the Cartesian position `cart`
    pub fn to_frac(&self, cart: &Vec3) -> Vec3 {
        self.inv_t * cart
    }

    /// Cartesian position of the fractional coordinates `frac`
    pub fn to_cart(&self, frac: &Vec3) -> Vec3 {
        self.matrix.transpose() * frac
    }

    /// apply the deformation gradient `f` to each cell vector, `a' = f · a`.
    /// in terms of the row matrix this is `L' = L · fᵀ`
    pub fn deformed(&self, f: &Mat3) -> Result<Self, StructureError> {
        Self::new(self.matrix * f.transpose())
    }

    /// the deformation gradient taking `reference` to `self`, so that
    /// `reference.deformed(&self.deformation_from(reference))` reproduces
    /// `self`
    pub fn deformation_from(&self, reference: &Lattice) -> Mat3 {
        self.matrix.transpose() * reference.inv_t
    }
}
