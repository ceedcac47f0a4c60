use std::{fmt::Display, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Atom, Lattice, StructureError, Vec3};

/// a periodic crystal structure: a [Lattice] and the Cartesian positions of the
/// atoms in one cell
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub lattice: Lattice,
    pub atoms: Vec<Atom>,
}

impl Display for Structure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let m = self.lattice.matrix();
        for i in 0..3 {
            writeln!(
                f,
                "{:15.10} {:15.10} {:15.10}",
                m[(i, 0)],
                m[(i, 1)],
                m[(i, 2)]
            )?;
        }
        for atom in &self.atoms {
            writeln!(f, "{atom}")?;
        }
        Ok(())
    }
}

impl FromStr for Structure {
    type Err = StructureError;

    /// parse a Structure from three lines of cell vectors followed by one
    /// `symbol x y z` line per atom in Cartesian coordinates. blank lines and
    /// lines starting with `#` are skipped
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lines = s
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'));
        let mut rows = [[0.0; 3]; 3];
        for row in rows.iter_mut() {
            let line = lines.next().ok_or_else(|| {
                StructureError::Parse("missing lattice vector".to_owned())
            })?;
            let fields: Vec<f64> = line
                .split_whitespace()
                .map(str::parse)
                .collect::<Result<_, _>>()
                .map_err(|_| {
                    StructureError::Parse(format!(
                        "failed to parse lattice vector `{line}`"
                    ))
                })?;
            if fields.len() != 3 {
                return Err(StructureError::Parse(format!(
                    "lattice vector `{line}` should have 3 fields"
                )));
            }
            row.copy_from_slice(&fields);
        }
        let lattice = Lattice::from_rows(&rows)?;
        let atoms = lines.map(str::parse).collect::<Result<Vec<_>, _>>()?;
        Ok(Self { lattice, atoms })
    }
}

impl Structure {
    pub fn new(lattice: Lattice, atoms: Vec<Atom>) -> Self {
        Self { lattice, atoms }
    }

    /// load a Structure from `filename`. files ending in `.json` are
    /// deserialized directly, anything else goes through [FromStr]
    pub fn load(filename: impl AsRef<Path>) -> Result<Self, StructureError> {
        let path = filename.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            StructureError::Io(format!("failed to read {}: {e}", path.display()))
        })?;
        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&contents)
                .map_err(|e| StructureError::Parse(e.to_string()))
        } else {
            contents.parse()
        }
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// return a copy of `self` on `lattice`, keeping the fractional coordinates
    /// of each atom fixed
    pub fn with_lattice(&self, lattice: Lattice) -> Self {
        let atoms = self
            .atoms
            .iter()
            .map(|a| {
                let frac = self.lattice.to_frac(&a.coord());
                let mut a = *a;
                a.set_coord(lattice.to_cart(&frac));
                a
            })
            .collect();
        Self { lattice, atoms }
    }

    /// return a copy of `self` with each atom moved by the corresponding
    /// Cartesian triple in `disp`
    pub fn displaced(&self, disp: &[f64]) -> Result<Self, StructureError> {
        if disp.len() != 3 * self.len() {
            return Err(StructureError::Mismatch(format!(
                "displacement of length {} for {} atoms",
                disp.len(),
                self.len()
            )));
        }
        let mut ret = self.clone();
        for (atom, d) in ret.atoms.iter_mut().zip(disp.chunks(3)) {
            *atom += Vec3::new(d[0], d[1], d[2]);
        }
        Ok(ret)
    }

    /// the flattened Cartesian displacement of each atom in `self` from the
    /// same atom in `reference` under the minimum-image convention of the
    /// reference lattice. the atoms must appear in the same order with the
    /// same species
    pub fn displacement_from(
        &self,
        reference: &Structure,
    ) -> Result<Vec<f64>, StructureError> {
        if self.len() != reference.len() {
            return Err(StructureError::Mismatch(format!(
                "{} atoms compared to a reference with {}",
                self.len(),
                reference.len()
            )));
        }
        let lat = &reference.lattice;
        let mut ret = Vec::with_capacity(3 * self.len());
        for (i, (a, r)) in self.atoms.iter().zip(&reference.atoms).enumerate() {
            if a.atomic_number != r.atomic_number {
                return Err(StructureError::Mismatch(format!(
                    "atom {i} is {} but {} in the reference",
                    a.label(),
                    r.label()
                )));
            }
            let d = lat.to_frac(&a.coord()) - lat.to_frac(&r.coord());
            let d = d.map(|x| x - x.round());
            ret.extend(lat.to_cart(&d).iter());
        }
        Ok(ret)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn srtio3() -> Structure {
        "
# cubic perovskite
3.9 0.0 0.0
0.0 3.9 0.0
0.0 0.0 3.9
Sr 0.0  0.0  0.0
Ti 1.95 1.95 1.95
O  1.95 1.95 0.0
O  1.95 0.0  1.95
O  0.0  1.95 1.95
"
        .parse()
        .unwrap()
    }

    #[test]
    fn parse() {
        let s = srtio3();
        assert_eq!(s.len(), 5);
        assert_eq!(s.atoms[1], Atom::new(22, 1.95, 1.95, 1.95));
        assert_abs_diff_eq!(s.lattice.volume(), 3.9f64.powi(3), epsilon = 1e-10);
    }

    #[test]
    fn parse_errors() {
        assert!("1.0 0.0 0.0\n0.0 1.0 0.0\n".parse::<Structure>().is_err());
        assert!(
            "1.0 0.0\n0.0 1.0 0.0\n0.0 0.0 1.0"
                .parse::<Structure>()
                .is_err()
        );
    }

    #[test]
    fn minimum_image() {
        let reference = srtio3();
        let mut moved = reference.clone();
        // Sr wraps across the cell boundary
        moved.atoms[0].x = 3.9 - 0.01;
        moved.atoms[1].z += 0.02;
        let got = moved.displacement_from(&reference).unwrap();
        let mut want = vec![0.0; 15];
        want[0] = -0.01;
        want[5] = 0.02;
        assert_abs_diff_eq!(&got[..], &want[..], epsilon = 1e-12);
    }

    #[test]
    fn displaced_round_trip() {
        let reference = srtio3();
        let disp: Vec<_> = (0..15).map(|i| 0.001 * i as f64).collect();
        let got = reference
            .displaced(&disp)
            .unwrap()
            .displacement_from(&reference)
            .unwrap();
        assert_abs_diff_eq!(&got[..], &disp[..], epsilon = 1e-12);
        assert!(reference.displaced(&disp[1..]).is_err());
    }

    #[test]
    fn species_mismatch() {
        let reference = srtio3();
        let mut other = reference.clone();
        other.atoms.swap(0, 1);
        assert!(other.displacement_from(&reference).is_err());
    }

    #[test]
    fn keeps_fractional_coordinates() {
        let s = srtio3();
        let lat = Lattice::orthorhombic(4.0, 4.0, 4.2).unwrap();
        let got = s.with_lattice(lat);
        assert_abs_diff_eq!(got.atoms[1].x, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(got.atoms[1].z, 2.1, epsilon = 1e-12);
    }

    #[test]
    fn load_json() {
        let s = srtio3();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ref.json");
        std::fs::write(&path, serde_json::to_string(&s).unwrap()).unwrap();
        assert_eq!(Structure::load(&path).unwrap(), s);
        let path = dir.path().join("ref.txt");
        std::fs::write(&path, s.to_string()).unwrap();
        assert_eq!(Structure::load(&path).unwrap(), s);
    }
}
