use std::path::Path;

use crate::{BasisError, Dmat};

/// A symmetric matrix of second derivatives of the energy with respect to
/// Cartesian atomic displacements. The input is averaged with its transpose on
/// construction, so the stored matrix is exactly symmetric.
#[derive(Clone, Debug, PartialEq)]
pub struct ForceConstantMatrix(Dmat);

impl ForceConstantMatrix {
    pub fn new(mat: Dmat) -> Result<Self, BasisError> {
        let (rows, cols) = mat.shape();
        if rows != cols {
            return Err(BasisError::Dimension {
                expected: rows,
                got: cols,
            });
        }
        if rows % 3 != 0 {
            return Err(BasisError::Dimension {
                expected: 3 * (rows / 3 + 1),
                got: rows,
            });
        }
        let sym = (&mat + mat.transpose()) * 0.5;
        Ok(Self(sym))
    }

    /// build from `data` in row-major order. the number of entries must be a
    /// perfect square
    pub fn from_row_slice(data: &[f64]) -> Result<Self, BasisError> {
        let n = (data.len() as f64).sqrt().round() as usize;
        if n * n != data.len() {
            return Err(BasisError::Load(format!(
                "{} entries do not form a square matrix",
                data.len()
            )));
        }
        Self::new(Dmat::from_row_slice(n, n, data))
    }

    /// Load a force-constant matrix from `filename`. JSON files hold an array
    /// of rows. Anything else is read as whitespace-separated numbers in
    /// row-major order, with any line breaks.
    pub fn load(filename: impl AsRef<Path>) -> Result<Self, BasisError> {
        let path = filename.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            BasisError::Load(format!("{}: {e}", path.display()))
        })?;
        if path.extension().is_some_and(|ext| ext == "json") {
            let rows: Vec<Vec<f64>> = serde_json::from_str(&contents)
                .map_err(|e| BasisError::Load(e.to_string()))?;
            let n = rows.len();
            if rows.iter().any(|r| r.len() != n) {
                return Err(BasisError::Load(
                    "force constant rows have unequal lengths".to_owned(),
                ));
            }
            let data: Vec<_> = rows.into_iter().flatten().collect();
            return Self::from_row_slice(&data);
        }
        let data = contents
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<Vec<f64>, _>>()
            .map_err(|e| BasisError::Load(e.to_string()))?;
        Self::from_row_slice(&data)
    }

    pub fn matrix(&self) -> &Dmat {
        &self.0
    }

    /// the number of rows, 3 times the number of atoms
    pub fn dim(&self) -> usize {
        self.0.nrows()
    }

    pub fn natoms(&self) -> usize {
        self.dim() / 3
    }
}
