use crystal::Mat3;
use serde::{Deserialize, Serialize};

use crate::IndexError;

/// the number of Voigt strain components at the front of a generalized
/// coordinate vector
pub const NSTRAIN: usize = 6;

/// Voigt engineering strains. The shear components are the sum of the two
/// off-diagonal tensor entries they stand for
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Strain {
    pub xx: f64,
    pub yy: f64,
    pub zz: f64,
    pub yz: f64,
    pub xz: f64,
    pub xy: f64,
}

impl Strain {
    pub fn to_array(&self) -> [f64; NSTRAIN] {
        [self.xx, self.yy, self.zz, self.yz, self.xz, self.xy]
    }

    pub fn from_array(a: [f64; NSTRAIN]) -> Self {
        let [xx, yy, zz, yz, xz, xy] = a;
        Self {
            xx,
            yy,
            zz,
            yz,
            xz,
            xy,
        }
    }

    fn slot(&mut self, i: usize) -> Option<&mut f64> {
        match i {
            0 => Some(&mut self.xx),
            1 => Some(&mut self.yy),
            2 => Some(&mut self.zz),
            3 => Some(&mut self.yz),
            4 => Some(&mut self.xz),
            5 => Some(&mut self.xy),
            _ => None,
        }
    }

    /// read the engineering strains off the (not necessarily symmetric) strain
    /// tensor `e`
    pub fn from_tensor(e: &Mat3) -> Self {
        Self {
            xx: e[(0, 0)],
            yy: e[(1, 1)],
            zz: e[(2, 2)],
            yz: e[(1, 2)] + e[(2, 1)],
            xz: e[(0, 2)] + e[(2, 0)],
            xy: e[(0, 1)] + e[(1, 0)],
        }
    }

    /// The deformation gradient `I + e` with the shears placed in the upper
    /// triangle only. [Strain::from_tensor] recovers `self` from
    /// `deformation() - I`.
    pub fn deformation(&self) -> Mat3 {
        Mat3::new(
            1.0 + self.xx,
            self.xy,
            self.xz,
            0.0,
            1.0 + self.yy,
            self.yz,
            0.0,
            0.0,
            1.0 + self.zz,
        )
    }

    pub fn is_zero(&self) -> bool {
        self.to_array().iter().all(|&x| x == 0.0)
    }
}

/// A point in generalized coordinates: six strains followed by one amplitude
/// per eigenpair of an [crate::Eigenbasis], in ascending eigenvalue order.
/// Serializes as the flat list of all `6 + n` components.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct GeneralizedCoordinateVector {
    pub strain: Strain,
    amplitudes: Vec<f64>,
}

impl TryFrom<Vec<f64>> for GeneralizedCoordinateVector {
    type Error = IndexError;

    fn try_from(flat: Vec<f64>) -> Result<Self, Self::Error> {
        Self::from_flat(&flat)
    }
}

impl From<GeneralizedCoordinateVector> for Vec<f64> {
    fn from(v: GeneralizedCoordinateVector) -> Self {
        v.flat()
    }
}

impl std::fmt::Display for GeneralizedCoordinateVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, x) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{x:.6}")?;
        }
        write!(f, "]")
    }
}

impl GeneralizedCoordinateVector {
    pub fn zeros(nmodes: usize) -> Self {
        Self {
            strain: Strain::default(),
            amplitudes: vec![0.0; nmodes],
        }
    }

    pub fn new(strain: Strain, amplitudes: Vec<f64>) -> Self {
        Self { strain, amplitudes }
    }

    /// build from the flattened form. `flat` must hold at least the six
    /// strains
    pub fn from_flat(flat: &[f64]) -> Result<Self, IndexError> {
        if flat.len() < NSTRAIN {
            return Err(IndexError {
                index: NSTRAIN - 1,
                len: flat.len(),
            });
        }
        let mut strain = [0.0; NSTRAIN];
        strain.copy_from_slice(&flat[..NSTRAIN]);
        Ok(Self {
            strain: Strain::from_array(strain),
            amplitudes: flat[NSTRAIN..].to_vec(),
        })
    }

    /// the total number of components, `6 + nmodes`
    pub fn dim(&self) -> usize {
        NSTRAIN + self.amplitudes.len()
    }

    pub fn nmodes(&self) -> usize {
        self.amplitudes.len()
    }

    pub fn amplitudes(&self) -> &[f64] {
        &self.amplitudes
    }

    pub fn amplitude(&self, mode: usize) -> Result<f64, IndexError> {
        self.amplitudes.get(mode).copied().ok_or(IndexError {
            index: NSTRAIN + mode,
            len: self.dim(),
        })
    }

    pub fn set_amplitude(
        &mut self,
        mode: usize,
        value: f64,
    ) -> Result<(), IndexError> {
        let len = self.dim();
        let a = self.amplitudes.get_mut(mode).ok_or(IndexError {
            index: NSTRAIN + mode,
            len,
        })?;
        *a = value;
        Ok(())
    }

    fn slot(&mut self, index: usize) -> Result<&mut f64, IndexError> {
        let len = self.dim();
        let err = IndexError { index, len };
        if index < NSTRAIN {
            self.strain.slot(index).ok_or(err)
        } else {
            self.amplitudes.get_mut(index - NSTRAIN).ok_or(err)
        }
    }

    /// the component at `index` of the flattened vector
    pub fn get(&self, index: usize) -> Result<f64, IndexError> {
        if index < NSTRAIN {
            Ok(self.strain.to_array()[index])
        } else {
            self.amplitudes.get(index - NSTRAIN).copied().ok_or(IndexError {
                index,
                len: self.dim(),
            })
        }
    }

    pub fn set(&mut self, index: usize, value: f64) -> Result<(), IndexError> {
        *self.slot(index)? = value;
        Ok(())
    }

    /// add `delta` to the component at `index` of the flattened vector
    pub fn displace(
        &mut self,
        index: usize,
        delta: f64,
    ) -> Result<(), IndexError> {
        *self.slot(index)? += delta;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.strain
            .to_array()
            .into_iter()
            .chain(self.amplitudes.iter().copied())
    }

    pub fn flat(&self) -> Vec<f64> {
        self.iter().collect()
    }

    /// Round each component to a multiple of `resolution`, giving an exact key
    /// for vectors that only differ by floating point noise.
    pub fn key(&self, resolution: f64) -> Vec<i64> {
        self.iter().map(|x| (x / resolution).round() as i64).collect()
    }
}
