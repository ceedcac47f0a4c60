use crystal::{Mat3, Structure};

use crate::{
    BasisError, Dvec, Eigenbasis, GeneralizedCoordinateVector, Strain,
    StructureProvider,
};

impl Eigenbasis {
    /// the dimension of the eigenvectors, 3 times the number of atoms
    pub fn dim(&self) -> usize {
        self.pairs().first().map_or(0, |p| p.vector.len())
    }

    fn check_reference(&self, reference: &Structure) -> Result<(), BasisError> {
        if 3 * reference.len() != self.dim() || self.len() != self.dim() {
            return Err(BasisError::Dimension {
                expected: self.dim(),
                got: 3 * reference.len(),
            });
        }
        Ok(())
    }

    /// Express `structure` in generalized coordinates relative to `reference`.
    /// The strain is the deformation of the cell relative to the reference
    /// cell. Once the strain is undone, the minimum-image displacement of the
    /// atoms is projected onto each eigenvector to get the amplitudes.
    pub fn encode(
        &self,
        structure: &Structure,
        reference: &Structure,
    ) -> Result<GeneralizedCoordinateVector, BasisError> {
        self.check_reference(reference)?;
        let e = structure.lattice.deformation_from(&reference.lattice)
            - Mat3::identity();
        let strain = Strain::from_tensor(&e);

        let unstrained = structure.with_lattice(reference.lattice.clone());
        let disp = Dvec::from(unstrained.displacement_from(reference)?);
        let snap = self.config().snap;
        let amplitudes = self
            .pairs()
            .iter()
            .map(|p| {
                let a = p.vector.dot(&disp);
                if a.abs() < snap { 0.0 } else { a }
            })
            .collect();
        Ok(GeneralizedCoordinateVector::new(strain, amplitudes))
    }

    /// Build the structure at `vector` relative to `reference`: displace the
    /// atoms by `Σ aᵢ vᵢ`, then deform the cell by the strain, carrying the
    /// atoms along in fractional coordinates.
    pub fn decode(
        &self,
        vector: &GeneralizedCoordinateVector,
        reference: &Structure,
    ) -> Result<Structure, BasisError> {
        self.check_reference(reference)?;
        if vector.nmodes() != self.len() {
            return Err(BasisError::Dimension {
                expected: self.len(),
                got: vector.nmodes(),
            });
        }
        let mut disp = Dvec::zeros(self.dim());
        for (a, p) in vector.amplitudes().iter().zip(self.pairs()) {
            if *a != 0.0 {
                disp.axpy(*a, &p.vector, 1.0);
            }
        }
        let displaced = reference.displaced(disp.as_slice())?;
        if vector.strain.is_zero() {
            return Ok(displaced);
        }
        let lattice = displaced.lattice.deformed(&vector.strain.deformation())?;
        Ok(displaced.with_lattice(lattice))
    }
}

/// An [Eigenbasis] bundled with the reference structure it was computed for
#[derive(Clone, Debug)]
pub struct NormalCoordinates {
    basis: Eigenbasis,
    reference: Structure,
}

impl NormalCoordinates {
    pub fn new(
        basis: Eigenbasis,
        reference: Structure,
    ) -> Result<Self, BasisError> {
        basis.check_reference(&reference)?;
        Ok(Self { basis, reference })
    }

    pub fn basis(&self) -> &Eigenbasis {
        &self.basis
    }

    pub fn reference(&self) -> &Structure {
        &self.reference
    }

    pub fn encode(
        &self,
        structure: &Structure,
    ) -> Result<GeneralizedCoordinateVector, BasisError> {
        self.basis.encode(structure, &self.reference)
    }

    pub fn decode(
        &self,
        vector: &GeneralizedCoordinateVector,
    ) -> Result<Structure, BasisError> {
        self.basis.decode(vector, &self.reference)
    }
}

impl StructureProvider for NormalCoordinates {
    fn nmodes(&self) -> usize {
        self.basis.len()
    }

    fn structure(
        &self,
        vector: &GeneralizedCoordinateVector,
    ) -> Result<Structure, BasisError> {
        self.decode(vector)
    }

    fn mode_gradient(
        &self,
        forces: &[f64],
        mode: usize,
    ) -> Result<f64, BasisError> {
        let pair = self.basis.get(mode).ok_or(BasisError::Index(
            crate::IndexError {
                index: crate::NSTRAIN + mode,
                len: crate::NSTRAIN + self.basis.len(),
            },
        ))?;
        if forces.len() != pair.vector.len() {
            return Err(BasisError::Dimension {
                expected: pair.vector.len(),
                got: forces.len(),
            });
        }
        let dot: f64 =
            forces.iter().zip(pair.vector.iter()).map(|(f, v)| f * v).sum();
        Ok(-dot)
    }
}
