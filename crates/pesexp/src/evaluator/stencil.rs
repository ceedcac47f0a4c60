//! Finite-difference recipes in unit offsets. Each sample moves every active
//! variable by its offset times that variable's step size, and the derivative
//! is `Σ wᵢ fᵢ / (denominator · Π hⱼ^mⱼ)`.

use serde::{Deserialize, Serialize};
use taylor::Signature;

/// one point of a stencil: an offset for each active variable, in steps
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StencilSample {
    pub offsets: Vec<i8>,
    pub weight: f64,
}

impl StencilSample {
    fn new(offsets: Vec<i8>, weight: f64) -> Self {
        Self { offsets, weight }
    }

    /// the reference point itself
    pub fn is_centre(&self) -> bool {
        self.offsets.iter().all(|&o| o == 0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stencil {
    pub samples: Vec<StencilSample>,
    pub denominator: f64,
}

impl Stencil {
    fn one_dim(points: &[(i8, f64)], denominator: f64) -> Self {
        Self {
            samples: points
                .iter()
                .map(|&(o, w)| StencilSample::new(vec![o], w))
                .collect(),
            denominator,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// the outer product of `self` and `other`: every pair of samples, with
    /// the offsets concatenated and the weights multiplied
    fn product(&self, other: &Stencil) -> Self {
        let mut samples = Vec::with_capacity(self.len() * other.len());
        for a in &self.samples {
            for b in &other.samples {
                let mut offsets = a.offsets.clone();
                offsets.extend(&b.offsets);
                samples.push(StencilSample::new(offsets, a.weight * b.weight));
            }
        }
        Self {
            samples,
            denominator: self.denominator * other.denominator,
        }
    }
}

/// the stencil for a term whose lowered signature is empty: there is nothing
/// left to differentiate, so the derivative is zero without any samples
pub(crate) fn zero() -> Stencil {
    Stencil {
        samples: Vec::new(),
        denominator: 1.0,
    }
}

/// The recipe picked by a derivative-type signature
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StencilKind {
    First,
    Second,
    Third,
    Fourth,
    /// the fourth-order accurate mixed second derivative of two variables
    Mixed,
    /// a tensor product of central differences, one per active variable
    Product(Vec<u8>),
}

impl StencilKind {
    /// Pick the recipe for `signature`. Without `product`, only the tabulated
    /// single-variable stencils and the two-variable mixed stencil are
    /// available.
    pub fn of(signature: &Signature, product: bool) -> Option<Self> {
        let kind = match signature.as_slice() {
            [1] => Self::First,
            [2] => Self::Second,
            [3] => Self::Third,
            [4] => Self::Fourth,
            [1, 1] => Self::Mixed,
            s if product && !s.is_empty() && signature.order() <= 4 => {
                Self::Product(s.to_vec())
            }
            _ => return None,
        };
        Some(kind)
    }

    pub fn stencil(&self) -> Stencil {
        match self {
            StencilKind::First => Stencil::one_dim(
                &[(2, -1.0), (1, 8.0), (-1, -8.0), (-2, 1.0)],
                12.0,
            ),
            StencilKind::Second => Stencil::one_dim(
                &[(2, -1.0), (1, 16.0), (0, -30.0), (-1, 16.0), (-2, -1.0)],
                12.0,
            ),
            StencilKind::Third => Stencil::one_dim(
                &[
                    (3, -1.0),
                    (2, 8.0),
                    (1, -13.0),
                    (-1, 13.0),
                    (-2, -8.0),
                    (-3, 1.0),
                ],
                8.0,
            ),
            StencilKind::Fourth => Stencil::one_dim(
                &[(2, 1.0), (1, -4.0), (0, 6.0), (-1, -4.0), (-2, 1.0)],
                1.0,
            ),
            StencilKind::Mixed => mixed(),
            StencilKind::Product(ms) => ms
                .iter()
                .map(|&m| central(m))
                .reduce(|acc, s| acc.product(&s))
                .unwrap_or_else(zero),
        }
    }
}

fn mixed() -> Stencil {
    #[rustfmt::skip]
    const TABLE: [(i8, i8, f64); 16] = [
        (1, -2, -63.0), (2, -1, -63.0), (-2, 1, -63.0), (-1, 2, -63.0),
        (-1, -2, 63.0), (-2, -1, 63.0), (1, 2, 63.0), (2, 1, 63.0),
        (2, -2, 44.0), (-2, 2, 44.0), (-2, -2, -44.0), (2, 2, -44.0),
        (-1, -1, 74.0), (1, 1, 74.0), (1, -1, -74.0), (-1, 1, -74.0),
    ];
    Stencil {
        samples: TABLE
            .iter()
            .map(|&(i, j, w)| StencilSample::new(vec![i, j], w))
            .collect(),
        denominator: 600.0,
    }
}

/// second-order central difference for the `m`th derivative of one variable
fn central(m: u8) -> Stencil {
    match m {
        1 => Stencil::one_dim(&[(1, 1.0), (-1, -1.0)], 2.0),
        2 => Stencil::one_dim(&[(1, 1.0), (0, -2.0), (-1, 1.0)], 1.0),
        3 => Stencil::one_dim(&[(2, 1.0), (1, -2.0), (-1, 2.0), (-2, -1.0)], 2.0),
        4 => Stencil::one_dim(
            &[(2, 1.0), (1, -4.0), (0, 6.0), (-1, -4.0), (-2, 1.0)],
            1.0,
        ),
        _ => zero(),
    }
}
