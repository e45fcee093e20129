//! Loop statistics

use crate::task::Outcome;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Snapshot of an event loop's counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoopStats {
    /// Tasks that ran to completion
    pub completed: u64,

    /// Tasks whose body panicked
    pub failed: u64,

    /// Tasks cancelled before the worker reached them
    pub skipped: u64,

    /// Submissions refused at admission
    pub rejected: u64,

    /// Tasks dropped unexecuted at termination
    pub discarded: u64,

    /// Tasks currently waiting in the immediate lane
    pub immediate_queued: usize,

    /// Tasks currently waiting in the delay lane
    pub delayed_queued: usize,

    /// Time since the worker last finished a task (None = never)
    pub since_last_execution: Option<Duration>,
}

impl LoopStats {
    /// Tasks the worker actually ran, successfully or not
    pub fn executed(&self) -> u64 {
        self.completed + self.failed
    }
}

/// Live counters; written by the worker and by admission
#[derive(Default)]
pub(crate) struct StatsCounters {
    completed: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
    rejected: AtomicU64,
    discarded: AtomicU64,
    last_execution: Mutex<Option<Instant>>,
}

impl StatsCounters {
    pub(crate) fn record(&self, outcome: &Outcome) {
        let counter = match outcome {
            Outcome::Completed => &self.completed,
            Outcome::Failed(_) => &self.failed,
            Outcome::Skipped => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };
        counter.fetch_add(1, Ordering::Relaxed);
        *self.last_execution.lock() = Some(Instant::now());
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_discarded(&self, count: usize) {
        self.discarded.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, immediate_queued: usize, delayed_queued: usize) -> LoopStats {
        LoopStats {
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            immediate_queued,
            delayed_queued,
            since_last_execution: self.last_execution.lock().map(|at| at.elapsed()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskFailure;

    #[test]
    fn test_stats_record_outcomes() {
        let counters = StatsCounters::default();
        assert_eq!(counters.snapshot(0, 0), LoopStats::default());

        counters.record(&Outcome::Completed);
        counters.record(&Outcome::Completed);
        counters.record(&Outcome::Failed(TaskFailure::new("x")));
        counters.record(&Outcome::Skipped);
        counters.record_rejected();
        counters.record_discarded(4);

        let stats = counters.snapshot(2, 3);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.executed(), 3);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.discarded, 4);
        assert_eq!((stats.immediate_queued, stats.delayed_queued), (2, 3));
        assert!(stats.since_last_execution.is_some());
    }

    #[test]
    fn test_skipped_does_not_touch_last_execution() {
        let counters = StatsCounters::default();
        counters.record(&Outcome::Skipped);
        assert_eq!(counters.snapshot(0, 0).since_last_execution, None);
    }
}
