//! Finite-difference evaluation of the terms of a [TaylorExpansion].
//!
//! Each term picks a [Stencil] by its derivative-type signature. Pure strain
//! terms are differentiated through the energy. Any term with a displacement
//! variable is first lowered by one multiplicity of its first displacement
//! variable `uₖ`, and the remaining derivative is taken of `dE/duₖ`, which the
//! [StructureProvider] reads off the oracle forces.
//!
//! The evaluator never talks to an oracle itself. It hands out
//! [EvaluationRequest]s, accepts results through [Evaluator::supply], and
//! reports what it can resolve whenever asked.

use std::{error::Error, fmt::Display, sync::RwLock};

use crystal::Structure;
use normal::{
    BasisError, GeneralizedCoordinateVector, IndexError, StructureProvider,
};
use psqs::Calculation;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use taylor::{ExpansionTerm, Kind, Signature, TaylorExpansion};

pub use cache::{Sample, SampleCache};
pub use stencil::{Stencil, StencilKind, StencilSample};

mod cache;
mod stencil;


#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// step size for strain variables
    pub h_strain: f64,

    /// step size for normal-mode amplitudes
    pub h_displacement: f64,

    /// whether to use tensor products of central differences for signatures
    /// without a dedicated stencil
    pub product_stencils: bool,

    /// sample points closer than this in every component are the same point
    pub resolution: f64,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            h_strain: 0.01,
            h_displacement: 0.01,
            product_stencils: true,
            resolution: 1e-10,
        }
    }
}

impl EvaluatorConfig {
    pub fn step(&self, kind: Kind) -> f64 {
        match kind {
            Kind::Strain => self.h_strain,
            Kind::Displacement => self.h_displacement,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum EvaluatorError {
    /// there is no stencil for this signature
    UnsupportedDerivativeType(Signature),

    /// the term vanishes by inversion symmetry and should never have been
    /// evaluated
    CentrosymmetricForbidden(String),

    /// a term variable outside of the generalized coordinate
    Index(IndexError),

    /// a sample point could not be turned into a structure
    Basis(BasisError),
}

impl Display for EvaluatorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluatorError::UnsupportedDerivativeType(s) => {
                write!(f, "no stencil for derivative type {s}")
            }
            EvaluatorError::CentrosymmetricForbidden(t) => {
                write!(f, "term `{t}` is forbidden by inversion symmetry")
            }
            EvaluatorError::Index(e) => write!(f, "{e}"),
            EvaluatorError::Basis(e) => write!(f, "{e}"),
        }
    }
}

impl Error for EvaluatorError {}

impl From<IndexError> for EvaluatorError {
    fn from(e: IndexError) -> Self {
        Self::Index(e)
    }
}

impl From<BasisError> for EvaluatorError {
    fn from(e: BasisError) -> Self {
        Self::Basis(e)
    }
}

/// what a sample's value is read from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Observable {
    Energy,
    /// the energy gradient along this mode, from the projected forces
    ModeGradient(usize),
}

/// One point the oracle needs to compute. The oracle always returns both the
/// energy and the forces, so `observable` only records what the first term to
/// ask for this point wanted.
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationRequest {
    pub vector: GeneralizedCoordinateVector,
    pub observable: Observable,
    pub structure: Structure,
}

/// How to evaluate one term: the stencil with its denominator already scaled
/// by the step sizes, and the sample point for each stencil sample
#[derive(Clone, Debug, PartialEq)]
pub struct Plan {
    pub signature: Signature,
    pub observable: Observable,
    pub stencil: Stencil,
    pub vectors: Vec<GeneralizedCoordinateVector>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TermStatus {
    /// no samples have been requested for the term yet
    Unresolved,
    AwaitingSamples {
        pending: Vec<GeneralizedCoordinateVector>,
    },
    Resolved(f64),
    Unsupported(Signature),
}

impl TermStatus {
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(..))
    }
}

/// The state of a whole expansion after an [Evaluator::snapshot]. Indices
/// refer to the terms of the expansion.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub resolved: Vec<usize>,
    pub awaiting: Vec<(usize, Vec<GeneralizedCoordinateVector>)>,
    pub unsupported: Vec<(usize, Signature)>,
    pub failed: Vec<(usize, EvaluatorError)>,
}

impl Snapshot {
    /// true once nothing is waiting on the oracle
    pub fn is_complete(&self) -> bool {
        self.awaiting.is_empty()
    }
}

/// `Σ wᵢ valueᵢ / denominator` over the samples of `stencil`
pub fn resolve(stencil: &Stencil, values: &[f64]) -> f64 {
    stencil
        .samples
        .iter()
        .zip(values)
        .map(|(s, v)| s.weight * v)
        .sum::<f64>()
        / stencil.denominator
}

enum Progress {
    Done(f64),
    Missing(Vec<GeneralizedCoordinateVector>),
}

/// drop one multiplicity of the first active displacement variable of `term`.
/// returns the lowered multiplicities and the mode that was removed, or None
/// for a pure strain term
fn lower(term: &ExpansionTerm) -> Option<(Vec<u8>, usize)> {
    let (pos, var) = term
        .variables()
        .iter()
        .enumerate()
        .find(|(i, v)| v.is_displacement() && term.multiplicity()[*i] > 0)?;
    let mut mult = term.multiplicity().to_vec();
    mult[pos] -= 1;
    Some((mult, var.index))
}

pub struct Evaluator<'a, P> {
    provider: &'a P,
    config: EvaluatorConfig,
    cache: SampleCache,
    requested: RwLock<FxHashSet<Vec<u8>>>,
    /// keys of points handed out in a request but not yet in the cache
    outstanding: RwLock<FxHashSet<Vec<i64>>>,
}

impl<'a, P> Evaluator<'a, P>
where
    P: StructureProvider + Sync,
{
    pub fn new(provider: &'a P, config: EvaluatorConfig) -> Self {
        Self::with_cache(provider, config, SampleCache::new(config.resolution))
    }

    /// start from the results already in `cache`, such as a checkpoint
    pub fn with_cache(
        provider: &'a P,
        config: EvaluatorConfig,
        cache: SampleCache,
    ) -> Self {
        Self {
            provider,
            config,
            cache,
            requested: RwLock::new(FxHashSet::default()),
            outstanding: RwLock::new(FxHashSet::default()),
        }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    pub fn cache(&self) -> &SampleCache {
        &self.cache
    }

    /// Work out the stencil, observable and sample points for `term` without
    /// touching the cache
    pub fn plan(&self, term: &ExpansionTerm) -> Result<Plan, EvaluatorError> {
        if term.is_centrosymmetric_forbidden() {
            return Err(EvaluatorError::CentrosymmetricForbidden(
                term.to_string(),
            ));
        }
        let (mult, observable) = match lower(term) {
            Some((mult, mode)) => (mult, Observable::ModeGradient(mode)),
            None => (term.multiplicity().to_vec(), Observable::Energy),
        };
        if let Observable::ModeGradient(mode) = observable {
            self.provider.zero().amplitude(mode)?;
        }
        let signature = Signature::of(&mult);
        if signature.is_empty() {
            return Ok(Plan {
                signature,
                observable,
                stencil: stencil::zero(),
                vectors: Vec::new(),
            });
        }
        let kind = StencilKind::of(&signature, self.config.product_stencils)
            .ok_or_else(|| {
                EvaluatorError::UnsupportedDerivativeType(signature.clone())
            })?;
        let mut stencil = kind.stencil();

        // the flat index and step of each active variable, in variable order
        let slots: Vec<_> = term
            .variables()
            .iter()
            .zip(&mult)
            .filter(|(_, m)| **m > 0)
            .map(|(v, &m)| (v.flat_index(), self.config.step(v.kind), m))
            .collect();
        for (_, h, m) in &slots {
            stencil.denominator *= h.powi(*m as i32);
        }
        if observable != Observable::Energy {
            // no force at the reference, whatever the weight
            stencil.samples.retain(|s| !s.is_centre());
        }
        stencil.samples.retain(|s| s.weight != 0.0);

        let zero = self.provider.zero();
        let mut vectors = Vec::with_capacity(stencil.len());
        for sample in &stencil.samples {
            let mut v = zero.clone();
            for (&o, (index, h, _)) in sample.offsets.iter().zip(&slots) {
                v.displace(*index, o as f64 * h)?;
            }
            vectors.push(v);
        }
        Ok(Plan {
            signature,
            observable,
            stencil,
            vectors,
        })
    }

    fn mark_requested(&self, term: &ExpansionTerm) {
        self.requested
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(term.multiplicity().to_vec());
    }

    fn is_requested(&self, term: &ExpansionTerm) -> bool {
        self.requested
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(term.multiplicity())
    }

    /// true if `vector` is neither cached nor already requested, in which case
    /// it is now marked as requested
    fn claim(&self, vector: &GeneralizedCoordinateVector) -> bool {
        !self.cache.contains(vector)
            && self
                .outstanding
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .insert(self.cache.key(vector))
    }

    /// decode each vector into a request, in parallel
    fn decode(
        &self,
        wanted: Vec<(GeneralizedCoordinateVector, Observable)>,
    ) -> Result<Vec<EvaluationRequest>, EvaluatorError> {
        wanted
            .into_par_iter()
            .map(|(vector, observable)| -> Result<_, EvaluatorError> {
                let structure = self.provider.structure(&vector)?;
                Ok(EvaluationRequest {
                    vector,
                    observable,
                    structure,
                })
            })
            .collect()
    }

    /// The requests for the samples of `term` that are neither in the cache
    /// nor handed out by an earlier request. Never blocks on the oracle.
    pub fn request_samples(
        &self,
        term: &ExpansionTerm,
    ) -> Result<Vec<EvaluationRequest>, EvaluatorError> {
        let plan = self.plan(term)?;
        self.mark_requested(term);
        let wanted = plan
            .vectors
            .into_iter()
            .filter(|v| self.claim(v))
            .map(|v| (v, plan.observable))
            .collect();
        self.decode(wanted)
    }

    /// The requests for every missing sample of every term of `expansion`,
    /// with points shared between terms, or already handed out, requested
    /// once. Terms that cannot be planned are skipped here and reported by
    /// [Evaluator::snapshot].
    pub fn requests(
        &self,
        expansion: &TaylorExpansion,
    ) -> Result<Vec<EvaluationRequest>, EvaluatorError> {
        let mut wanted = Vec::new();
        for term in expansion {
            if term.coefficient().is_some() {
                continue;
            }
            let plan = match self.plan(term) {
                Ok(plan) => plan,
                Err(e) => {
                    log::warn!("skipping `{term}`: {e}");
                    continue;
                }
            };
            log::debug!(
                "`{term}`: stencil {} with {} samples",
                plan.signature,
                plan.vectors.len()
            );
            self.mark_requested(term);
            for v in plan.vectors {
                if self.claim(&v) {
                    wanted.push((v, plan.observable));
                }
            }
        }
        log::info!("{} new sample points", wanted.len());
        self.decode(wanted)
    }

    /// record the oracle result for `vector`. the first result for a point
    /// wins. returns whether it was new
    pub fn supply(
        &self,
        vector: &GeneralizedCoordinateVector,
        calc: Calculation,
    ) -> bool {
        self.cache.insert(vector, calc)
    }

    fn value(
        &self,
        observable: Observable,
        calc: &Calculation,
    ) -> Result<f64, EvaluatorError> {
        match observable {
            Observable::Energy => Ok(calc.energy),
            Observable::ModeGradient(mode) => {
                Ok(self.provider.mode_gradient(&calc.forces, mode)?)
            }
        }
    }

    /// the coefficient of `term` if every sample is in the cache, otherwise
    /// the missing points
    fn progress(
        &self,
        term: &ExpansionTerm,
    ) -> Result<Progress, EvaluatorError> {
        let plan = self.plan(term)?;
        let mut values = Vec::with_capacity(plan.vectors.len());
        let mut pending = Vec::new();
        for v in plan.vectors {
            match self.cache.get(&v) {
                Some(calc) => values.push(self.value(plan.observable, &calc)?),
                None => pending.push(v),
            }
        }
        if pending.is_empty() {
            Ok(Progress::Done(resolve(&plan.stencil, &values)))
        } else {
            Ok(Progress::Missing(pending))
        }
    }

    /// Where `term` stands: resolved once every sample is in the cache,
    /// otherwise still waiting on the listed points
    pub fn status(
        &self,
        term: &ExpansionTerm,
    ) -> Result<TermStatus, EvaluatorError> {
        match self.progress(term) {
            Ok(Progress::Done(c)) => Ok(TermStatus::Resolved(c)),
            Ok(Progress::Missing(pending)) if self.is_requested(term) => {
                Ok(TermStatus::AwaitingSamples { pending })
            }
            Ok(Progress::Missing(_)) => Ok(TermStatus::Unresolved),
            Err(EvaluatorError::UnsupportedDerivativeType(s)) => {
                Ok(TermStatus::Unsupported(s))
            }
            Err(e) => Err(e),
        }
    }

    /// Store the coefficient of every term of `expansion` that can be resolved
    /// and report on the rest. Terms that already have a coefficient are left
    /// alone, so this is safe to call again after supplying more results.
    pub fn snapshot(&self, expansion: &mut TaylorExpansion) -> Snapshot {
        let mut snap = Snapshot::default();
        for (i, term) in expansion.terms_mut().iter_mut().enumerate() {
            if term.coefficient().is_some() {
                snap.resolved.push(i);
                continue;
            }
            match self.progress(term) {
                Ok(Progress::Done(c)) => {
                    term.set_coefficient(c);
                    snap.resolved.push(i);
                }
                Ok(Progress::Missing(pending)) => {
                    self.mark_requested(term);
                    snap.awaiting.push((i, pending));
                }
                Err(EvaluatorError::UnsupportedDerivativeType(s)) => {
                    log::warn!("no stencil for `{term}` of type {s}");
                    snap.unsupported.push((i, s));
                }
                Err(e) => snap.failed.push((i, e)),
            }
        }
        snap
    }
}
