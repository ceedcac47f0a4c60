//! Fourth-order Taylor expansions of a crystal's potential energy surface in
//! strain and normal-mode coordinates, with every coefficient evaluated by
//! finite differences of oracle energies and forces.

use std::{error::Error, fmt::Display, io::Write, path::Path};

use config::{Config, OracleKind};
use crystal::{Structure, StructureError};
use evaluator::{EvaluationRequest, Evaluator, EvaluatorError, SampleCache};
use normal::{
    BasisError, Eigenbasis, ForceConstantMatrix, IndexError, NSTRAIN,
    NormalCoordinates,
};
use psqs::{Directory, Harmonic, Oracle, OracleError};
use serde::{Deserialize, Serialize};
use taylor::{TaylorError, TaylorExpansion, Variable};

pub mod config;
pub mod evaluator;

#[cfg(test)]
mod tests;

/// print a message to stderr and exit with status 1
#[macro_export]
macro_rules! die {
    ($($t:tt)*) => {{
        eprintln!($($t)*);
        std::process::exit(1);
    }};
}

#[derive(Debug)]
pub enum RunError {
    Structure(StructureError),
    Basis(BasisError),
    Taylor(TaylorError),
    Evaluator(EvaluatorError),
    Oracle(OracleError),
    Io(std::io::Error),
}

impl Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::Structure(e) => write!(f, "{e}"),
            RunError::Basis(e) => write!(f, "{e}"),
            RunError::Taylor(e) => write!(f, "{e}"),
            RunError::Evaluator(e) => write!(f, "{e}"),
            RunError::Oracle(e) => write!(f, "{e}"),
            RunError::Io(e) => write!(f, "{e}"),
        }
    }
}

impl Error for RunError {}

macro_rules! from_errors {
    ($($variant:ident($t:ty)$(,)*)*) => {
        $(impl From<$t> for RunError {
            fn from(e: $t) -> Self {
                Self::$variant(e)
            }
        })*
    }
}

from_errors!(
    Structure(StructureError),
    Basis(BasisError),
    Taylor(TaylorError),
    Evaluator(EvaluatorError),
    Oracle(OracleError),
    Io(std::io::Error),
);

/// The result of a run, written to `expansion.json`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Output {
    /// every eigenvalue of the force constants, in ascending order
    pub eigenvalues: Vec<f64>,

    pub expansion: TaylorExpansion,
}

/// The expansion variables described by `config`: the requested strains,
/// followed by the requested modes of `basis`
pub fn variables(
    config: &Config,
    basis: &Eigenbasis,
) -> Result<Vec<Variable>, BasisError> {
    let modes = config.modes.clone().unwrap_or_else(|| basis.physical());
    let mut ret: Vec<_> =
        config.strains.iter().map(|&s| Variable::strain(s)).collect();
    for mode in modes {
        if mode >= basis.len() {
            return Err(BasisError::Index(IndexError {
                index: NSTRAIN + mode,
                len: NSTRAIN + basis.len(),
            }));
        }
        let mut v = Variable::displacement(mode);
        if config.centrosymmetric.contains(&mode) {
            v = v.centrosymmetric();
        }
        ret.push(v);
    }
    Ok(ret)
}

/// Run every request in `reqs` through `oracle` and hand the results to
/// `evaluator`, saving the sample cache to `checkpoint` afterwards. Failed
/// calculations are logged and leave their terms unresolved.
fn sample<O>(
    oracle: &O,
    evaluator: &Evaluator<NormalCoordinates>,
    reqs: &[EvaluationRequest],
    sleep_int: u64,
    checkpoint: Option<&Path>,
) -> Result<(), RunError>
where
    O: Oracle + Sync,
{
    let structures: Vec<Structure> =
        reqs.iter().map(|r| r.structure.clone()).collect();
    let res = psqs::drain_with(oracle, &structures, sleep_int, |i, calc| {
        evaluator.supply(&reqs[i].vector, calc);
    });
    if let Some(path) = checkpoint {
        evaluator.cache().save(path)?;
        log::info!(
            "saved {} samples to {}",
            evaluator.cache().len(),
            path.display()
        );
    }
    if let Err(e) = res {
        log::error!("{e}");
    }
    Ok(())
}

/// Expand the energy surface described by `config`, writing progress and a
/// summary table to `w`
pub fn run<W: Write>(w: &mut W, config: &Config) -> Result<Output, RunError> {
    let reference = Structure::load(&config.structure)?;
    let fc = ForceConstantMatrix::load(&config.force_constants)?;
    let basis =
        Eigenbasis::diagonalize(&fc, reference.len(), config.tolerances)?;
    let eigenvalues = basis.eigenvalues();
    writeln!(w, "Eigenvalues:")?;
    for (i, pair) in basis.pairs().iter().enumerate() {
        let label = if pair.translational {
            " translational"
        } else {
            ""
        };
        writeln!(w, "{i:5}{:18.10}{label}", pair.value)?;
    }

    let vars = variables(config, &basis)?;
    let mut expansion = TaylorExpansion::populate(vars, |t| {
        t.order() <= config.max_order && (!config.pure_only || t.is_single())
    })?;
    writeln!(
        w,
        "\n{} terms through order {}",
        expansion.len(),
        config.max_order
    )?;

    let coords = NormalCoordinates::new(basis, reference.clone())?;
    let checkpoint = config.checkpoint.as_deref();
    let cache = match checkpoint {
        Some(path) if path.exists() => {
            let cache = SampleCache::load(path, config.evaluator.resolution)?;
            log::info!(
                "loaded {} samples from {}",
                cache.len(),
                path.display()
            );
            cache
        }
        _ => SampleCache::new(config.evaluator.resolution),
    };
    let evaluator = Evaluator::with_cache(&coords, config.evaluator, cache);
    let reqs = evaluator.requests(&expansion)?;
    writeln!(w, "{} new points to compute", reqs.len())?;

    match &config.oracle {
        OracleKind::Harmonic { elastic } => {
            let oracle = Harmonic::new(fc, reference)?.with_elastic(*elastic);
            sample(&oracle, &evaluator, &reqs, config.sleep_int, checkpoint)?;
        }
        OracleKind::Directory { dir } => {
            let oracle = Directory::new(dir)?;
            sample(&oracle, &evaluator, &reqs, config.sleep_int, checkpoint)?;
        }
    }

    let snap = evaluator.snapshot(&mut expansion);
    writeln!(w, "\nTaylor Expansion:")?;
    writeln!(
        w,
        "{:>5} {:<30}{:>18}{:>18}",
        "term", "monomial", "derivative", "coefficient"
    )?;
    for (i, term) in expansion.iter().enumerate() {
        match (term.coefficient(), term.value()) {
            (Some(c), Some(v)) => writeln!(
                w,
                "{i:5} {:<30}{c:18.10}{v:18.10}",
                term.to_string()
            )?,
            _ => writeln!(w, "{i:5} {:<30}{:>18}", term.to_string(), "-")?,
        }
    }
    for (i, pending) in &snap.awaiting {
        writeln!(w, "term {i} is missing {} samples", pending.len())?;
    }
    for (i, sig) in &snap.unsupported {
        writeln!(w, "term {i} has no stencil for derivative type {sig}")?;
    }
    for (i, e) in &snap.failed {
        writeln!(w, "term {i} failed: {e}")?;
    }
    writeln!(
        w,
        "\n{} of {} terms resolved",
        expansion.resolved(),
        expansion.len()
    )?;

    Ok(Output {
        eigenvalues,
        expansion,
    })
}
