use std::{
    fmt::Display,
    ops::{Add, AddAssign},
    str::FromStr,
};

use approx::AbsDiffEq;
use serde::{Deserialize, Serialize};

use crate::{StructureError, Vec3};

/// an atom in Cartesian coordinates, in Å
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Atom {
    pub atomic_number: usize,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        self.abs_diff_eq(other, Self::default_epsilon())
    }
}

impl AbsDiffEq for Atom {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        1e-8
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        let close = |a: f64, b: f64| (a - b).abs() < epsilon;
        self.atomic_number == other.atomic_number
            && close(self.x, other.x)
            && close(self.y, other.y)
            && close(self.z, other.z)
    }
}

impl Add<Vec3> for Atom {
    type Output = Atom;

    fn add(self, rhs: Vec3) -> Self::Output {
        Atom {
            x: self.x + rhs[0],
            y: self.y + rhs[1],
            z: self.z + rhs[2],
            ..self
        }
    }
}

impl AddAssign<Vec3> for Atom {
    fn add_assign(&mut self, rhs: Vec3) {
        *self = *self + rhs
    }
}

impl Display for Atom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:2} {:15.10} {:15.10} {:15.10}",
            self.label(),
            self.x,
            self.y,
            self.z
        )
    }
}

impl FromStr for Atom {
    type Err = StructureError;

    /// parse an Atom from a line like
    ///  Sr 1.0 1.0 1.0
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<_> = s.split_whitespace().collect();
        if fields.len() != 4 {
            return Err(StructureError::Parse(format!(
                "wrong number of fields in atom line `{s}`"
            )));
        }
        let mut coord = [0.0; 3];
        for (c, field) in coord.iter_mut().zip(&fields[1..]) {
            *c = field.parse().map_err(|_| {
                StructureError::Parse(format!(
                    "failed to parse `{field}` as a coordinate"
                ))
            })?;
        }
        Self::from_label(fields[0], coord[0], coord[1], coord[2]).ok_or_else(
            || {
                StructureError::Parse(format!(
                    "unknown atomic symbol `{}`",
                    fields[0]
                ))
            },
        )
    }
}

pub const NUMBER_TO_SYMBOL: [&str; 87] = [
    "X", "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg",
    "Al", "Si", "P", "S", "Cl", "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn",
    "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As", "Se", "Br", "Kr", "Rb",
    "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm",
    "Sm", "Eu", "Gd", "Tb", "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta",
    "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl", "Pb", "Bi", "Po", "At",
    "Rn",
];

fn symbol_to_number(s: &str) -> Option<usize> {
    NUMBER_TO_SYMBOL.iter().position(|&x| x == s)
}

fn titlecase(s: &str) -> String {
    let mut cs = s.chars();
    let Some(first) = cs.next() else {
        return String::new();
    };
    let mut ret = first.to_uppercase().to_string();
    for c in cs {
        ret.push_str(&c.to_lowercase().to_string());
    }
    ret
}

impl Atom {
    pub fn new(atomic_number: usize, x: f64, y: f64, z: f64) -> Self {
        Self {
            atomic_number,
            x,
            y,
            z,
        }
    }

    /// construct an Atom from its atomic symbol, ignoring case. returns `None`
    /// if the symbol is not recognized
    pub fn from_label(symbol: &str, x: f64, y: f64, z: f64) -> Option<Self> {
        let num = symbol_to_number(symbol)
            .or_else(|| symbol_to_number(&titlecase(symbol)))?;
        Some(Self::new(num, x, y, z))
    }

    #[inline]
    pub fn label(&self) -> &str {
        NUMBER_TO_SYMBOL.get(self.atomic_number).copied().unwrap_or("X")
    }

    pub fn coord(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    pub fn set_coord(&mut self, coord: Vec3) {
        self.x = coord[0];
        self.y = coord[1];
        self.z = coord[2];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titlecase() {
        assert_eq!(super::titlecase("TI"), "Ti");
        assert_eq!(super::titlecase("Ti"), "Ti");
        assert_eq!(super::titlecase("ti"), "Ti");
        assert_eq!(super::titlecase("O"), "O");
        assert_eq!(super::titlecase("o"), "O");
    }

    #[test]
    fn parse() {
        let got: Atom = "ba 0.5 0.25 1.0".parse().unwrap();
        assert_eq!(got, Atom::new(56, 0.5, 0.25, 1.0));
        assert_eq!(got.label(), "Ba");
        assert!("Qq 0.0 0.0 0.0".parse::<Atom>().is_err());
        assert!("O 0.0 0.0".parse::<Atom>().is_err());
        assert!("O 0.0 x 0.0".parse::<Atom>().is_err());
    }
}
