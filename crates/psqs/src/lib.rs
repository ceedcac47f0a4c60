//! The boundary between the expansion engine and whatever computes energies
//! and forces. An [Oracle] accepts structures and reports results when they
//! are ready; [drain] submits a batch and polls until everything is back.

use std::{error::Error, fmt::Display, sync::LazyLock};

use crystal::Structure;
use serde::{Deserialize, Serialize};

pub use directory::Directory;
pub use drain::{drain, drain_with};
pub use local::{Analytic, Harmonic};

pub mod directory;
pub mod drain;
pub mod local;


/// Whether or not the environment variable `PSQS_NO_RETRY` has been set. If
/// it is, the first unreadable result aborts a drain
static NO_RETRY: LazyLock<bool> =
    LazyLock::new(|| std::env::var("PSQS_NO_RETRY").is_ok());

/// The result of one single-point calculation. `forces` holds the Cartesian
/// force on each atom, x, y, and z in turn, in the atom order of the submitted
/// structure.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Calculation {
    pub energy: f64,
    pub forces: Vec<f64>,
}

impl Calculation {
    pub fn new(energy: f64, forces: Vec<f64>) -> Self {
        Self { energy, forces }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Poll {
    Pending,
    Done(Calculation),
}

impl Poll {
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OracleError {
    /// reading or writing a job file failed
    Io(String),
    /// a result exists but could not be understood
    Parse(String),
    /// the calculation itself reported an error
    Failed(String),
}

impl OracleError {
    /// Returns `true` if the oracle error is [`Failed`].
    ///
    /// [`Failed`]: OracleError::Failed
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(..))
    }
}

impl Display for OracleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OracleError::Io(s) => write!(f, "io error: {s}"),
            OracleError::Parse(s) => write!(f, "failed to parse result: {s}"),
            OracleError::Failed(s) => write!(f, "calculation failed: {s}"),
        }
    }
}

impl Error for OracleError {}

/// Something that computes the energy and forces of a [Structure], possibly
/// asynchronously. `submit` must not block on the calculation itself.
pub trait Oracle {
    /// whatever the oracle needs to find a submitted calculation again
    type Handle: Clone + Send + Sync;

    fn submit(&self, structure: &Structure) -> Result<Self::Handle, OracleError>;

    fn poll(&self, handle: &Self::Handle) -> Result<Poll, OracleError>;
}

/// call `rayon::ThreadPoolBuilder` to set `num_threads` to `n`. Discards the
/// error returned by `build_global` if the thread pool has already been
/// initialized
pub fn max_threads(n: usize) {
    let _ = rayon::ThreadPoolBuilder::new()
        .num_threads(n)
        .build_global();
}

/// time the duration of `$body` and store the resulting Duration in `$elapsed`
#[macro_export]
macro_rules! time {
    ($elapsed:ident, $body:block) => {
        let now = std::time::Instant::now();
        $body;
        let $elapsed = now.elapsed();
    };
}
