//! Configuration settings for expanding a PES

use std::{
    fmt::{Debug, Display},
    path::{Path, PathBuf},
};

use normal::{BasisConfig, NSTRAIN};
use serde::{Deserialize, Serialize};

use crate::evaluator::EvaluatorConfig;

#[cfg(test)]
mod tests;

#[derive(Deserialize, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    /// The reference structure. Files ending in `.json` are deserialized
    /// directly, anything else is read as three rows of lattice vectors
    /// followed by one `symbol x y z` line per atom. Relative paths are taken
    /// relative to the directory of the config file.
    structure: PathBuf,

    /// The force-constant matrix of the reference structure, as
    /// whitespace-separated numbers in row-major order or a JSON array of
    /// rows. Relative paths are resolved like `structure`.
    force_constants: PathBuf,

    /// The Voigt strain components to expand in, numbered 0 through 5 in the
    /// order xx, yy, zz, yz, xz, xy. Defaults to all six.
    strains: Option<Vec<usize>>,

    /// The eigenpairs of the force constants to expand in, numbered in
    /// ascending eigenvalue order. Defaults to every mode that is not a rigid
    /// translation.
    modes: Option<Vec<usize>>,

    /// The modes that change sign under inversion of the reference structure.
    /// Terms with an odd total power of these modes vanish and are never
    /// evaluated.
    centrosymmetric: Option<Vec<usize>>,

    /// The highest order of term to keep, at most 4.
    max_order: usize,

    /// Keep only terms in a single variable. Defaults to false.
    pure_only: Option<bool>,

    /// The finite-difference step for strain variables. Defaults to 0.01.
    h_strain: Option<f64>,

    /// The finite-difference step for mode amplitudes, in Å along each unit
    /// eigenvector. Defaults to 0.01.
    h_displacement: Option<f64>,

    /// Whether to evaluate mixed derivatives without a dedicated stencil as
    /// products of central differences. Defaults to true.
    product_stencils: Option<bool>,

    /// What computes the energies and forces.
    oracle: OracleKind,

    /// The interval in seconds to wait between loops checking if any jobs have
    /// finished.
    sleep_int: u64,

    /// A file to save finished calculations to. If it already exists, the
    /// calculations in it are reused instead of being run again.
    checkpoint: Option<PathBuf>,

    /// Numerical tolerances for checking the eigenbasis.
    tolerances: Option<BasisConfig>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OracleKind {
    /// the quadratic model built from the force constants themselves, plus
    /// one elastic constant per Voigt strain
    Harmonic {
        #[serde(default)]
        elastic: [f64; NSTRAIN],
    },

    /// structures are written to `dir` for an external program, which writes
    /// the results back next to them
    Directory { dir: PathBuf },
}

impl Display for OracleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OracleKind::Harmonic { elastic } => {
                write!(f, "harmonic, elastic = {elastic:?}")
            }
            OracleKind::Directory { dir } => {
                write!(f, "directory, dir = {}", dir.display())
            }
        }
    }
}

/// Construct a full `Config` using [Config::load] on a TOML file
#[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
#[serde(from = "RawConfig")]
pub struct Config {
    /// path to the reference structure
    pub structure: PathBuf,

    /// path to the force-constant matrix
    pub force_constants: PathBuf,

    /// Voigt indices of the strain variables
    pub strains: Vec<usize>,

    /// mode indices of the displacement variables, or None for every
    /// non-translational mode
    pub modes: Option<Vec<usize>>,

    /// mode indices that are odd under inversion
    pub centrosymmetric: Vec<usize>,

    pub max_order: usize,

    pub pure_only: bool,

    /// step sizes and stencil options
    pub evaluator: EvaluatorConfig,

    pub oracle: OracleKind,

    /// how long to sleep between intervals polling running jobs
    pub sleep_int: u64,

    pub checkpoint: Option<PathBuf>,

    pub tolerances: BasisConfig,
}

impl From<RawConfig> for Config {
    fn from(rc: RawConfig) -> Self {
        let defaults = EvaluatorConfig::default();
        Self {
            structure: rc.structure,
            force_constants: rc.force_constants,
            strains: rc.strains.unwrap_or_else(|| (0..NSTRAIN).collect()),
            modes: rc.modes,
            centrosymmetric: rc.centrosymmetric.unwrap_or_default(),
            max_order: rc.max_order,
            pure_only: rc.pure_only.unwrap_or(false),
            evaluator: EvaluatorConfig {
                h_strain: rc.h_strain.unwrap_or(defaults.h_strain),
                h_displacement: rc
                    .h_displacement
                    .unwrap_or(defaults.h_displacement),
                product_stencils: rc
                    .product_stencils
                    .unwrap_or(defaults.product_stencils),
                ..defaults
            },
            oracle: rc.oracle,
            sleep_int: rc.sleep_int,
            checkpoint: rc.checkpoint,
            tolerances: rc.tolerances.unwrap_or_default(),
        }
    }
}

impl Config {
    /// load a [Config] from the TOML file specified by `filename`. panics on
    /// failure to read the file and on failure to deserialize it, and exits if
    /// the settings don't make sense
    pub fn load<P>(filename: P) -> Self
    where
        P: AsRef<Path> + Debug,
    {
        let contents = std::fs::read_to_string(&filename)
            .unwrap_or_else(|e| panic!("failed to load config file: {e}"));
        let mut ret: Self = toml::from_str(&contents).unwrap_or_else(|e| {
            panic!("failed to deserialize config file '{filename:?}' with {e}")
        });
        if let Some(dir) = filename.as_ref().parent() {
            ret.structure = dir.join(&ret.structure);
            ret.force_constants = dir.join(&ret.force_constants);
        }

        ret.validate();

        ret
    }

    /// the first problem with the settings in `self`, if any
    pub fn check(&self) -> Option<String> {
        if !(1..=taylor::MAX_ORDER).contains(&self.max_order) {
            return Some(format!(
                "max_order ({}) must be between 1 and {}",
                self.max_order,
                taylor::MAX_ORDER
            ));
        }
        if let Some(s) = self.strains.iter().find(|&&s| s >= NSTRAIN) {
            return Some(format!(
                "strain index {s} is out of range. there are only {NSTRAIN} \
                 Voigt components"
            ));
        }
        let EvaluatorConfig {
            h_strain,
            h_displacement,
            ..
        } = self.evaluator;
        if h_strain <= 0.0 || h_displacement <= 0.0 {
            return Some(format!(
                "step sizes must be positive, got h_strain = {h_strain} and \
                 h_displacement = {h_displacement}"
            ));
        }
        None
    }

    fn validate(&self) {
        if let Some(msg) = self.check() {
            eprintln!("In pesexp.toml: {msg}, exiting");
            std::process::exit(1);
        }
    }
}

impl Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Config {
            structure,
            force_constants,
            strains,
            modes,
            centrosymmetric,
            max_order,
            pure_only,
            evaluator,
            oracle,
            sleep_int,
            checkpoint,
            tolerances,
        } = self;
        write!(
            f,
            "
Configuration Options:
structure = {}
force_constants = {}
strains = {strains:?}
modes = {}
centrosymmetric = {centrosymmetric:?}
max_order = {max_order}
pure_only = {pure_only}
h_strain = {}
h_displacement = {}
product_stencils = {}
oracle = {oracle}
sleep_int = {sleep_int}
checkpoint = {}
tolerances = {tolerances:?}
",
            structure.display(),
            force_constants.display(),
            modes
                .as_ref()
                .map_or_else(|| "all".to_owned(), |m| format!("{m:?}")),
            evaluator.h_strain,
            evaluator.h_displacement,
            evaluator.product_stencils,
            checkpoint
                .as_ref()
                .map_or_else(String::new, |p| p.display().to_string()),
        )
    }
}
