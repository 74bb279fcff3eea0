//! Running the pipeline over every talk on a pool of worker threads.

use super::{Convergence, Pipeline};
use crate::registry::Talks;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Totals of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub talks: usize,
    pub quiescent: usize,
    pub exceeded: usize,
    pub busy: usize,
    pub failures: Vec<String>,
}

/// Converge every registered talk, `workers` at a time.
///
/// Workers pull talks from a shared cursor; each talk's pass guard keeps a
/// talk from being processed by two workers at once.
pub fn sweep(talks: &Talks, pipeline: &Pipeline, workers: usize) -> SweepReport {
    let all = talks.all();
    let next = AtomicUsize::new(0);
    let report = Mutex::new(SweepReport {
        talks: all.len(),
        ..SweepReport::default()
    });

    std::thread::scope(|scope| {
        for _ in 0..workers.clamp(1, all.len().max(1)) {
            scope.spawn(|| {
                loop {
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    let Some(talk) = all.get(index) else {
                        break;
                    };
                    let outcome = pipeline.converge(talk);
                    let mut report = report.lock().unwrap_or_else(|poison| poison.into_inner());
                    report.failures.extend(outcome.failures().iter().cloned());
                    match outcome {
                        Convergence::Quiescent { .. } => report.quiescent += 1,
                        Convergence::BudgetExceeded { .. } => report.exceeded += 1,
                        Convergence::Busy => report.busy += 1,
                    }
                }
            });
        }
    });

    report.into_inner().unwrap_or_else(|poison| poison.into_inner())
}
