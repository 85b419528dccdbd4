//! Bounded scoped worker pool.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

/// Runs `task` for each index in `0..count` on at most `workers` threads
/// and returns the results in index order.
///
/// Indices are handed out in increasing order. After the first failure no
/// new work is started, and the error with the lowest index is returned, so
/// the outcome does not depend on scheduling.
pub fn run_indexed<T, E, F>(count: usize, workers: usize, task: F) -> Result<Vec<T>, E>
where
    T: Send,
    E: Send,
    F: Fn(usize) -> Result<T, E> + Sync,
{
    let workers = workers.clamp(1, count.max(1));
    if workers == 1 {
        return (0..count).map(&task).collect();
    }

    let next = AtomicUsize::new(0);
    let failed = AtomicBool::new(false);

    let batches: Vec<Vec<(usize, Result<T, E>)>> = thread::scope(|s| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                s.spawn(|| {
                    let mut done = Vec::new();
                    while !failed.load(Ordering::Acquire) {
                        let i = next.fetch_add(1, Ordering::AcqRel);
                        if i >= count {
                            break;
                        }
                        let result = task(i);
                        if result.is_err() {
                            failed.store(true, Ordering::Release);
                        }
                        done.push((i, result));
                    }
                    done
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    });

    let mut slots: Vec<Option<T>> = (0..count).map(|_| None).collect();
    let mut first_err: Option<(usize, E)> = None;
    for (i, result) in batches.into_iter().flatten() {
        match result {
            Ok(v) => slots[i] = Some(v),
            Err(e) => {
                if first_err.as_ref().is_none_or(|(j, _)| i < *j) {
                    first_err = Some((i, e));
                }
            }
        }
    }
    if let Some((_, e)) = first_err {
        return Err(e);
    }

    // Without a failure every index was processed.
    Ok(slots.into_iter().flatten().collect())
}

/// Number of workers to use when none is configured.
pub fn default_workers() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get())
}
