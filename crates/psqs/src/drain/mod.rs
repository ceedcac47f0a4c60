use std::{collections::HashMap, thread, time::Duration};

use crystal::Structure;
use rayon::prelude::*;

use crate::{Calculation, NO_RETRY, Oracle, OracleError, Poll, time};

mod timer;

/// the number of polls a job may fail to be read before it counts as failed.
/// results written by another process can be caught half-written
const MAX_RETRIES: usize = 5;

/// Submit every structure in `structures` to `oracle` and poll until all of
/// them are done, sleeping `sleep_int` seconds whenever a pass finishes
/// nothing. `each` is called with the index into `structures` and the result
/// as soon as each calculation finishes.
///
/// Jobs that report a failure, or that cannot be read after several polls,
/// are set aside while the rest keep going. If any are left at the end the
/// error names them.
pub fn drain_with<O, F>(
    oracle: &O,
    structures: &[Structure],
    sleep_int: u64,
    mut each: F,
) -> Result<(), OracleError>
where
    O: Oracle + Sync,
    F: FnMut(usize, Calculation),
{
    let mut timer = timer::Timer::default();
    let mut cur_jobs = Vec::with_capacity(structures.len());
    time!(e, {
        for (i, s) in structures.iter().enumerate() {
            cur_jobs.push((i, oracle.submit(s)?));
        }
    });
    timer.submitting += e;
    log::info!("submitted {} jobs", cur_jobs.len());

    let mut failed = Vec::new();
    let mut retries = HashMap::new();
    let mut iter = 0;
    while !cur_jobs.is_empty() {
        let loop_time = std::time::Instant::now();
        let results: Vec<_>;
        time!(e, {
            results = cur_jobs
                .par_iter()
                .map(|(_, handle)| oracle.poll(handle))
                .collect();
        });
        timer.polling += e;

        let mut finished = 0;
        let mut to_remove = Vec::new();
        for (pos, ((i, _), res)) in cur_jobs.iter().zip(results).enumerate() {
            match res {
                Ok(Poll::Pending) => {}
                Ok(Poll::Done(calc)) => {
                    each(*i, calc);
                    to_remove.push(pos);
                    finished += 1;
                }
                Err(e) if e.is_failed() => {
                    log::warn!("job {i} failed with `{e}`");
                    failed.push(*i);
                    to_remove.push(pos);
                }
                Err(e) => {
                    let retry = retries.entry(*i).or_insert(MAX_RETRIES);
                    if *retry == 0 || *NO_RETRY {
                        log::warn!("giving up on job {i} after `{e}`");
                        failed.push(*i);
                        to_remove.push(pos);
                    } else {
                        log::debug!("retrying job {i} after `{e}`");
                        *retry -= 1;
                    }
                }
            }
        }
        // have to remove the highest index first
        for pos in to_remove.into_iter().rev() {
            cur_jobs.swap_remove(pos);
        }
        log::debug!(
            "finished {} jobs in {:.1} s",
            finished,
            loop_time.elapsed().as_millis() as f64 / 1000.0
        );
        if finished == 0 && !cur_jobs.is_empty() {
            log::info!("[iter {iter}] {} jobs remaining", cur_jobs.len());
            let d = Duration::from_secs(sleep_int);
            timer.sleeping += d;
            thread::sleep(d);
        }
        iter += 1;
    }
    log::info!("{timer}");
    if !failed.is_empty() {
        failed.sort();
        return Err(OracleError::Failed(format!(
            "{} jobs failed: {failed:?}",
            failed.len()
        )));
    }
    Ok(())
}

/// Like [drain_with], but collect the results in the order of `structures`
pub fn drain<O>(
    oracle: &O,
    structures: &[Structure],
    sleep_int: u64,
) -> Result<Vec<Calculation>, OracleError>
where
    O: Oracle + Sync,
{
    let mut dst = vec![Calculation::default(); structures.len()];
    drain_with(oracle, structures, sleep_int, |i, calc| dst[i] = calc)?;
    Ok(dst)
}
