//! oracles that compute their results in-process, immediately on submission

use crystal::{Mat3, Structure};
use normal::{Dvec, ForceConstantMatrix, NSTRAIN, Strain};

use crate::{Calculation, Oracle, OracleError, Poll};

/// Wraps a closure computing a [Calculation] directly from a [Structure]. The
/// closure runs during `submit`, so every poll is immediately done.
pub struct Analytic<F>(pub F);

impl<F> Oracle for Analytic<F>
where
    F: Fn(&Structure) -> Calculation,
{
    type Handle = Calculation;

    fn submit(&self, structure: &Structure) -> Result<Calculation, OracleError> {
        Ok((self.0)(structure))
    }

    fn poll(&self, handle: &Calculation) -> Result<Poll, OracleError> {
        Ok(Poll::Done(handle.clone()))
    }
}

/// A harmonic model of the surface around `reference`: `E = ½ uᵀKu` for the
/// minimum-image displacement `u`, with forces `-Ku`, plus an optional
/// diagonal elastic energy `½ Σ cᵢ eᵢ²` in the Voigt strains of the cell.
#[derive(Clone, Debug)]
pub struct Harmonic {
    fc: ForceConstantMatrix,
    reference: Structure,
    elastic: [f64; NSTRAIN],
}

impl Harmonic {
    pub fn new(
        fc: ForceConstantMatrix,
        reference: Structure,
    ) -> Result<Self, OracleError> {
        if fc.dim() != 3 * reference.len() {
            return Err(OracleError::Failed(format!(
                "{}x{} force constants for {} atoms",
                fc.dim(),
                fc.dim(),
                reference.len()
            )));
        }
        Ok(Self {
            fc,
            reference,
            elastic: [0.0; NSTRAIN],
        })
    }

    /// set the diagonal elastic constants, in Voigt order
    pub fn with_elastic(mut self, elastic: [f64; NSTRAIN]) -> Self {
        self.elastic = elastic;
        self
    }

    pub fn calculate(
        &self,
        structure: &Structure,
    ) -> Result<Calculation, OracleError> {
        let fail =
            |e: crystal::StructureError| OracleError::Failed(e.to_string());
        let e = structure.lattice.deformation_from(&self.reference.lattice)
            - Mat3::identity();
        let strain = Strain::from_tensor(&e).to_array();
        let unstrained = structure.with_lattice(self.reference.lattice.clone());
        let u = Dvec::from(
            unstrained.displacement_from(&self.reference).map_err(fail)?,
        );
        let ku = self.fc.matrix() * &u;
        let elastic: f64 = self
            .elastic
            .iter()
            .zip(strain)
            .map(|(c, e)| c * e * e)
            .sum();
        Ok(Calculation {
            energy: 0.5 * u.dot(&ku) + 0.5 * elastic,
            forces: (-ku).as_slice().to_vec(),
        })
    }
}

impl Oracle for Harmonic {
    type Handle = Calculation;

    fn submit(&self, structure: &Structure) -> Result<Calculation, OracleError> {
        self.calculate(structure)
    }

    fn poll(&self, handle: &Calculation) -> Result<Poll, OracleError> {
        Ok(Poll::Done(handle.clone()))
    }
}
