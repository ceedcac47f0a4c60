use std::cmp::Ordering;

use nalgebra::SymmetricEigen;

use crate::{BasisConfig, BasisError, Dmat, Dvec, ForceConstantMatrix};

/// compute the eigen decomposition of the symmetric matrix `mat` and return
/// the eigenvalues in ascending order along with the matching eigenvectors as
/// the columns of the returned matrix
pub fn symm_eigen_decomp(mat: Dmat) -> (Dvec, Dmat) {
    let SymmetricEigen {
        eigenvectors: vecs,
        eigenvalues: vals,
    } = SymmetricEigen::new(mat);
    let mut pairs: Vec<_> = vals.iter().enumerate().collect();
    pairs.sort_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let (rows, cols) = vecs.shape();
    let mut ret = Dmat::zeros(rows, cols);
    for (i, (j, _)) in pairs.iter().enumerate() {
        ret.set_column(i, &vecs.column(*j));
    }
    (
        Dvec::from_iterator(vals.len(), pairs.iter().map(|a| *a.1)),
        ret,
    )
}

#[derive(Clone, Debug, PartialEq)]
pub struct EigenPair {
    pub value: f64,
    pub vector: Dvec,
    /// whether `vector` moves every atom by the same amount
    pub translational: bool,
}

/// returns true if every atom's 3-component block of `v` matches the first
/// atom's within `tol`
fn is_translation(v: &Dvec, tol: f64) -> bool {
    let first = v.rows(0, 3);
    v.as_slice().chunks(3).all(|block| {
        block.iter().zip(first.iter()).all(|(a, b)| (a - b).abs() < tol)
    })
}

/// The eigenpairs of a force-constant matrix, sorted by ascending eigenvalue.
/// The eigenvectors form an orthonormal basis for the Cartesian displacements
/// of the structure the matrix belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct Eigenbasis {
    pairs: Vec<EigenPair>,
    config: BasisConfig,
}

impl Eigenbasis {
    /// Diagonalize `fc` for a structure of `natoms` atoms and check that the
    /// result is a proper basis: one eigenpair per Cartesian degree of
    /// freedom, unit eigenvectors, mutually orthogonal, and no translational
    /// mode with a restoring force.
    pub fn diagonalize(
        fc: &ForceConstantMatrix,
        natoms: usize,
        config: BasisConfig,
    ) -> Result<Self, BasisError> {
        let (vals, vecs) = symm_eigen_decomp(fc.matrix().clone());
        if vals.len() != 3 * natoms {
            return Err(BasisError::Inconsistent(format!(
                "{} eigenpairs for {natoms} atoms",
                vals.len()
            )));
        }
        let pairs = vals
            .iter()
            .zip(vecs.column_iter())
            .map(|(&value, v)| {
                let vector = v.into_owned();
                EigenPair {
                    translational: is_translation(&vector, config.translation),
                    value,
                    vector,
                }
            })
            .collect();
        let ret = Self { pairs, config };
        ret.validate()?;
        let ntrans = ret.translational().len();
        log::debug!(
            "diagonalized {}x{} force constants: {ntrans} translational modes",
            fc.dim(),
            fc.dim()
        );
        Ok(ret)
    }

    fn validate(&self) -> Result<(), BasisError> {
        let tol = self.config.orthonormality;
        for (i, p) in self.pairs.iter().enumerate() {
            let norm = p.vector.norm();
            if (norm - 1.0).abs() > tol {
                return Err(BasisError::Inconsistent(format!(
                    "eigenvector {i} has norm {norm}"
                )));
            }
            if p.translational
                && p.value.abs() > self.config.translational_eigenvalue
            {
                return Err(BasisError::Inconsistent(format!(
                    "translational mode {i} has eigenvalue {}",
                    p.value
                )));
            }
            for (j, q) in self.pairs.iter().enumerate().skip(i + 1) {
                let dot = p.vector.dot(&q.vector);
                if dot.abs() > tol {
                    return Err(BasisError::Inconsistent(format!(
                        "eigenvectors {i} and {j} have dot product {dot}"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn pairs(&self) -> &[EigenPair] {
        &self.pairs
    }

    pub fn get(&self, mode: usize) -> Option<&EigenPair> {
        self.pairs.get(mode)
    }

    pub fn config(&self) -> &BasisConfig {
        &self.config
    }

    /// the number of eigenpairs
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn eigenvalues(&self) -> Vec<f64> {
        self.pairs.iter().map(|p| p.value).collect()
    }

    /// indices of the rigid-translation modes
    pub fn translational(&self) -> Vec<usize> {
        self.pairs
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.translational.then_some(i))
            .collect()
    }

    /// indices of the modes with a restoring force
    pub fn physical(&self) -> Vec<usize> {
        self.pairs
            .iter()
            .enumerate()
            .filter_map(|(i, p)| (!p.translational).then_some(i))
            .collect()
    }
}
