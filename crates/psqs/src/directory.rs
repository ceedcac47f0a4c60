use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

use crystal::Structure;

use crate::{Calculation, Oracle, OracleError, Poll};

/// An oracle backed by a directory shared with an external engine. Each
/// submitted structure is written to `job.NNNNNNNN.json`. The engine answers
/// by writing a serialized [Calculation] to `job.NNNNNNNN.out.json`, or an
/// error message to `job.NNNNNNNN.err`.
#[derive(Debug)]
pub struct Directory {
    dir: PathBuf,
    next: AtomicUsize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Job {
    pub number: usize,
    pub input: PathBuf,
    pub output: PathBuf,
    pub error: PathBuf,
}

/// the job number in a file name like `job.00000012.json`
fn job_number(name: &str) -> Option<usize> {
    name.strip_prefix("job.")?
        .strip_suffix(".json")?
        .parse()
        .ok()
}

impl Directory {
    /// Open `dir`, creating it if necessary. Numbering continues after the
    /// highest job already in the directory so old results are never picked
    /// up for new structures.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, OracleError> {
        let dir = dir.as_ref().to_path_buf();
        let io = |e: std::io::Error| {
            OracleError::Io(format!("{}: {e}", dir.display()))
        };
        std::fs::create_dir_all(&dir).map_err(io)?;
        let mut next = 0;
        for entry in std::fs::read_dir(&dir).map_err(io)? {
            let entry = entry.map_err(io)?;
            if let Some(n) = entry.file_name().to_str().and_then(job_number) {
                next = next.max(n + 1);
            }
        }
        if next > 0 {
            log::info!("resuming job numbering in {} at {next}", dir.display());
        }
        Ok(Self {
            dir,
            next: AtomicUsize::new(next),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn job(&self, number: usize) -> Job {
        let base = format!("job.{number:08}");
        Job {
            number,
            input: self.dir.join(format!("{base}.json")),
            output: self.dir.join(format!("{base}.out.json")),
            error: self.dir.join(format!("{base}.err")),
        }
    }
}

impl Oracle for Directory {
    type Handle = Job;

    fn submit(&self, structure: &Structure) -> Result<Job, OracleError> {
        let job = self.job(self.next.fetch_add(1, Ordering::Relaxed));
        let contents = serde_json::to_string_pretty(structure)
            .map_err(|e| OracleError::Io(e.to_string()))?;
        std::fs::write(&job.input, contents).map_err(|e| {
            OracleError::Io(format!("{}: {e}", job.input.display()))
        })?;
        Ok(job)
    }

    fn poll(&self, job: &Job) -> Result<Poll, OracleError> {
        if let Ok(msg) = std::fs::read_to_string(&job.error) {
            return Err(OracleError::Failed(format!(
                "job {}: {}",
                job.number,
                msg.trim()
            )));
        }
        let Ok(contents) = std::fs::read_to_string(&job.output) else {
            return Ok(Poll::Pending);
        };
        let calc: Calculation = serde_json::from_str(&contents).map_err(|e| {
            OracleError::Parse(format!("{}: {e}", job.output.display()))
        })?;
        Ok(Poll::Done(calc))
    }
}
