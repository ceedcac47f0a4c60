//! multivariate Taylor expansions of the energy in strain and normal-mode
//! displacement variables, truncated at fourth order

use std::{error::Error, fmt::Display, sync::Arc};

use serde::{Deserialize, Serialize};

pub use checks::*;
pub mod checks;

#[cfg(test)]
mod tests;

/// the number of Voigt strain components
pub const NSTRAIN: usize = 6;

/// the highest order of term an expansion can hold
pub const MAX_ORDER: usize = 4;

const VOIGT: [&str; NSTRAIN] = ["xx", "yy", "zz", "yz", "xz", "xy"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaylorError {
    /// a term whose sorted multiplicities have no known prefactor
    UnknownShape(Vec<u8>),
    /// a multiplicity vector that doesn't match the variable list
    Length { expected: usize, got: usize },
    /// an index past the end of the variable list
    Index(usize),
    /// a flattened coordinate too short for a variable of the expansion
    Coordinate { index: usize, len: usize },
}

impl Display for TaylorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaylorError::UnknownShape(s) => {
                write!(f, "no prefactor for a term of shape {s:?}")
            }
            TaylorError::Length { expected, got } => write!(
                f,
                "multiplicity vector of length {got} for {expected} variables"
            ),
            TaylorError::Index(i) => write!(f, "variable index {i} out of range"),
            TaylorError::Coordinate { index, len } => write!(
                f,
                "coordinate index {index} out of range for length {len}"
            ),
        }
    }
}

impl Error for TaylorError {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    Strain,
    Displacement,
}

/// One independent variable of the expansion. Strain variables index the six
/// Voigt components, displacement variables index the eigenpairs of the
/// normal-coordinate basis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variable {
    pub kind: Kind,
    pub index: usize,
    /// whether the variable is odd under inversion of the reference structure
    pub centrosymmetric: bool,
}

impl Variable {
    pub const fn new(kind: Kind, index: usize, centrosymmetric: bool) -> Self {
        Self {
            kind,
            index,
            centrosymmetric,
        }
    }

    pub const fn strain(index: usize) -> Self {
        Self::new(Kind::Strain, index, false)
    }

    pub const fn displacement(index: usize) -> Self {
        Self::new(Kind::Displacement, index, false)
    }

    /// mark `self` as odd under inversion
    pub const fn centrosymmetric(mut self) -> Self {
        self.centrosymmetric = true;
        self
    }

    pub const fn is_strain(&self) -> bool {
        matches!(self.kind, Kind::Strain)
    }

    pub const fn is_displacement(&self) -> bool {
        matches!(self.kind, Kind::Displacement)
    }

    /// position of `self` in a flattened generalized coordinate vector: the
    /// strains come first, followed by the mode amplitudes
    pub const fn flat_index(&self) -> usize {
        match self.kind {
            Kind::Strain => self.index,
            Kind::Displacement => NSTRAIN + self.index,
        }
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            Kind::Strain => match VOIGT.get(self.index) {
                Some(v) => write!(f, "e_{v}"),
                None => write!(f, "e_{}", self.index),
            },
            Kind::Displacement => write!(f, "u_{}", self.index),
        }
    }
}

/// the non-zero multiplicities of a term sorted in descending order. the
/// prefactor of a term depends only on its shape
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Shape(Vec<u8>);

impl Shape {
    pub fn of(multiplicity: &[u8]) -> Self {
        let mut s: Vec<_> =
            multiplicity.iter().copied().filter(|&m| m > 0).collect();
        s.sort_by(|a, b| b.cmp(a));
        Self(s)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Look up the Taylor prefactor for `self`. Every shape through fourth
    /// order is listed; anything else is an error rather than a guess.
    ///
    /// Each entry is `1/Π mᵢ!`, so [2, 2] is 1/4.
    pub fn prefactor(&self) -> Result<Prefactor, TaylorError> {
        let denom = match self.0.as_slice() {
            [1] => 1,
            [2] => 2,
            [1, 1] => 1,
            [3] => 6,
            [2, 1] => 2,
            [1, 1, 1] => 1,
            [4] => 24,
            [3, 1] => 6,
            [2, 2] => 4,
            [2, 1, 1] => 2,
            [1, 1, 1, 1] => 1,
            _ => return Err(TaylorError::UnknownShape(self.0.clone())),
        };
        Ok(Prefactor(denom))
    }
}

/// a prefactor of the form 1/n
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Prefactor(u32);

impl Prefactor {
    pub const fn denominator(&self) -> u32 {
        self.0
    }

    pub fn value(&self) -> f64 {
        1.0 / self.0 as f64
    }
}

impl Display for Prefactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 == 1 {
            write!(f, "1")
        } else {
            write!(f, "1/{}", self.0)
        }
    }
}

/// The derivative-type signature of a term: its non-zero multiplicities in
/// variable order. `d³E/dx²dy` has signature `21`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature(pub Vec<u8>);

impl Signature {
    pub fn of(multiplicity: &[u8]) -> Self {
        Self(multiplicity.iter().copied().filter(|&m| m > 0).collect())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn order(&self) -> usize {
        self.0.iter().map(|&m| m as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for m in &self.0 {
            write!(f, "{m}")?;
        }
        Ok(())
    }
}

/// One term of a [TaylorExpansion]: how many times each variable is
/// differentiated, the matching prefactor, and the derivative once it has
/// been evaluated. Terms compare equal when their multiplicities are equal.
#[derive(Clone, Debug)]
pub struct ExpansionTerm {
    variables: Arc<[Variable]>,
    multiplicity: Vec<u8>,
    prefactor: Prefactor,
    coefficient: Option<f64>,
}

impl PartialEq for ExpansionTerm {
    fn eq(&self, other: &Self) -> bool {
        self.multiplicity == other.multiplicity
    }
}

impl Eq for ExpansionTerm {}

impl std::hash::Hash for ExpansionTerm {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.multiplicity.hash(state);
    }
}

impl Display for ExpansionTerm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.prefactor)?;
        for (v, m) in self.active() {
            if m == 1 {
                write!(f, " {v}")?;
            } else {
                write!(f, " {v}^{m}")?;
            }
        }
        Ok(())
    }
}

impl ExpansionTerm {
    pub fn new(
        variables: Arc<[Variable]>,
        multiplicity: Vec<u8>,
    ) -> Result<Self, TaylorError> {
        if multiplicity.len() != variables.len() {
            return Err(TaylorError::Length {
                expected: variables.len(),
                got: multiplicity.len(),
            });
        }
        let prefactor = Shape::of(&multiplicity).prefactor()?;
        Ok(Self {
            variables,
            multiplicity,
            prefactor,
            coefficient: None,
        })
    }

    /// build the term differentiating once for each entry of `indices`, so
    /// `[0, 0, 2]` is `d³E/dx0²dx2`
    pub fn from_indices(
        variables: Arc<[Variable]>,
        indices: &[usize],
    ) -> Result<Self, TaylorError> {
        let mut multiplicity = vec![0; variables.len()];
        for &i in indices {
            *multiplicity.get_mut(i).ok_or(TaylorError::Index(i))? += 1;
        }
        Self::new(variables, multiplicity)
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn multiplicity(&self) -> &[u8] {
        &self.multiplicity
    }

    pub fn order(&self) -> usize {
        self.multiplicity.iter().map(|&m| m as usize).sum()
    }

    pub fn prefactor(&self) -> Prefactor {
        self.prefactor
    }

    pub fn shape(&self) -> Shape {
        Shape::of(&self.multiplicity)
    }

    pub fn signature(&self) -> Signature {
        Signature::of(&self.multiplicity)
    }

    /// the variables with non-zero multiplicity, paired with that multiplicity
    pub fn active(&self) -> impl Iterator<Item = (&Variable, u8)> + '_ {
        self.variables
            .iter()
            .zip(&self.multiplicity)
            .filter(|(_, m)| **m > 0)
            .map(|(v, m)| (v, *m))
    }

    /// positions in the variable list of the active variables
    pub fn active_positions(&self) -> Vec<usize> {
        self.multiplicity
            .iter()
            .enumerate()
            .filter_map(|(i, &m)| (m > 0).then_some(i))
            .collect()
    }

    /// true if every active variable is of `kind`
    pub fn is_pure(&self, kind: Kind) -> bool {
        self.active().all(|(v, _)| v.kind == kind)
    }

    /// true if exactly one variable is active
    pub fn is_single(&self) -> bool {
        self.active().count() == 1
    }

    /// true if the summed multiplicity of the centrosymmetric variables is
    /// odd, meaning the term vanishes by inversion symmetry
    pub fn is_centrosymmetric_forbidden(&self) -> bool {
        !Checks::centrosymmetric(&self.variables).mod_check(&self.multiplicity)
    }

    /// the derivative, if it has been evaluated
    pub fn coefficient(&self) -> Option<f64> {
        self.coefficient
    }

    pub fn set_coefficient(&mut self, coefficient: f64) {
        self.coefficient = Some(coefficient);
    }

    /// the derivative scaled by the prefactor, the number that multiplies the
    /// monomial in the expansion
    pub fn value(&self) -> Option<f64> {
        self.coefficient.map(|c| c * self.prefactor.value())
    }

    /// evaluate the monomial `Π xᵢ^mᵢ` at the flattened generalized coordinate
    /// `flat`
    pub fn monomial(&self, flat: &[f64]) -> Result<f64, TaylorError> {
        let mut ret = 1.0;
        for (v, m) in self.active() {
            let index = v.flat_index();
            let x = flat.get(index).ok_or(TaylorError::Coordinate {
                index,
                len: flat.len(),
            })?;
            ret *= x.powi(m as i32);
        }
        Ok(ret)
    }
}

/// advance `tuple` to the next non-decreasing index tuple over `n` variables.
/// returns false once every tuple has been visited
fn next_tuple(tuple: &mut [usize], n: usize) -> bool {
    for i in (0..tuple.len()).rev() {
        if tuple[i] + 1 < n {
            let v = tuple[i] + 1;
            for t in &mut tuple[i..] {
                *t = v;
            }
            return true;
        }
    }
    false
}

/// The retained terms of a Taylor expansion over a fixed list of variables, in
/// order of increasing order and, within an order, non-decreasing variable
/// indices.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawExpansion", into = "RawExpansion")]
pub struct TaylorExpansion {
    variables: Arc<[Variable]>,
    terms: Vec<ExpansionTerm>,
}

#[derive(Serialize, Deserialize)]
struct RawTerm {
    #[serde(default, skip_deserializing)]
    label: String,
    multiplicity: Vec<u8>,
    coefficient: Option<f64>,
    #[serde(default, skip_deserializing)]
    value: Option<f64>,
}

#[derive(Serialize, Deserialize)]
struct RawExpansion {
    variables: Vec<Variable>,
    terms: Vec<RawTerm>,
}

impl TryFrom<RawExpansion> for TaylorExpansion {
    type Error = TaylorError;

    fn try_from(raw: RawExpansion) -> Result<Self, Self::Error> {
        let variables: Arc<[Variable]> = raw.variables.into();
        let terms = raw
            .terms
            .into_iter()
            .map(|t| {
                let mut term =
                    ExpansionTerm::new(variables.clone(), t.multiplicity)?;
                term.coefficient = t.coefficient;
                Ok(term)
            })
            .collect::<Result<_, TaylorError>>()?;
        Ok(Self { variables, terms })
    }
}

impl From<TaylorExpansion> for RawExpansion {
    fn from(exp: TaylorExpansion) -> Self {
        let terms = exp
            .terms
            .iter()
            .map(|t| RawTerm {
                label: t.to_string(),
                multiplicity: t.multiplicity.clone(),
                coefficient: t.coefficient,
                value: t.value(),
            })
            .collect();
        Self {
            variables: exp.variables.to_vec(),
            terms,
        }
    }
}

impl TaylorExpansion {
    /// Enumerate every term through fourth order over `variables` and keep
    /// those that survive the inversion check and that `accept` returns true
    /// for.
    pub fn populate<F>(
        variables: Vec<Variable>,
        mut accept: F,
    ) -> Result<Self, TaylorError>
    where
        F: FnMut(&ExpansionTerm) -> bool,
    {
        let variables: Arc<[Variable]> = variables.into();
        let n = variables.len();
        let checks = Checks::centrosymmetric(&variables);
        let mut terms = Vec::new();
        if n == 0 {
            return Ok(Self { variables, terms });
        }
        for order in 1..=MAX_ORDER {
            let mut tuple = vec![0; order];
            loop {
                let term = ExpansionTerm::from_indices(variables.clone(), &tuple)?;
                if checks.mod_check(&term.multiplicity) && accept(&term) {
                    terms.push(term);
                }
                if !next_tuple(&mut tuple, n) {
                    break;
                }
            }
        }
        Ok(Self { variables, terms })
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn terms(&self) -> &[ExpansionTerm] {
        &self.terms
    }

    pub fn terms_mut(&mut self) -> &mut [ExpansionTerm] {
        &mut self.terms
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ExpansionTerm> {
        self.terms.iter()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// the retained term with `multiplicity`, if any
    pub fn get(&self, multiplicity: &[u8]) -> Option<&ExpansionTerm> {
        self.terms.iter().find(|t| t.multiplicity == multiplicity)
    }

    /// the number of terms with a coefficient
    pub fn resolved(&self) -> usize {
        self.terms.iter().filter(|t| t.coefficient.is_some()).count()
    }

    /// Evaluate the expansion at the flattened generalized coordinate `flat`,
    /// relative to the energy of the reference. Terms without a coefficient
    /// contribute nothing.
    pub fn energy(&self, flat: &[f64]) -> Result<f64, TaylorError> {
        let mut ret = 0.0;
        for t in &self.terms {
            if let Some(v) = t.value() {
                ret += v * t.monomial(flat)?;
            }
        }
        Ok(ret)
    }
}

impl<'a> IntoIterator for &'a TaylorExpansion {
    type Item = &'a ExpansionTerm;

    type IntoIter = std::slice::Iter<'a, ExpansionTerm>;

    fn into_iter(self) -> Self::IntoIter {
        self.terms.iter()
    }
}
