//! Admission control: accept or reject a submission without blocking
//!
//! Both lanes admit while their length is strictly below the current bound.
//! The bound may change at any time; already-queued work is never evicted.

use crate::error::SubmitError;
use crate::lanes::{Lanes, Rejected};
use crate::queue::ScheduledTask;
use crate::stats::StatsCounters;
use crate::task::Task;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Enforces the per-lane bound at submission time
pub(crate) struct AdmissionController {
    max_queue_size: AtomicUsize,
}

impl AdmissionController {
    pub(crate) fn new(max_queue_size: usize) -> Self {
        Self {
            max_queue_size: AtomicUsize::new(max_queue_size),
        }
    }

    pub(crate) fn max_queue_size(&self) -> usize {
        self.max_queue_size.load(Ordering::Acquire)
    }

    pub(crate) fn set_max_queue_size(&self, max_queue_size: usize) {
        self.max_queue_size.store(max_queue_size, Ordering::Release);
    }

    /// Queue a ready task, or fail immediately
    pub(crate) fn admit_immediate(
        &self,
        lanes: &Lanes,
        stats: &StatsCounters,
        task: Task,
    ) -> Result<(), SubmitError> {
        let capacity = self.max_queue_size();
        lanes
            .push_immediate(task, capacity)
            .map_err(|rejected| self.reject(stats, rejected, capacity, |t| t))
    }

    /// Queue a scheduled task, or fail immediately
    pub(crate) fn admit_delayed(
        &self,
        lanes: &Lanes,
        stats: &StatsCounters,
        entry: ScheduledTask,
    ) -> Result<(), SubmitError> {
        let capacity = self.max_queue_size();
        lanes
            .push_delayed(entry, capacity)
            .map_err(|rejected| self.reject(stats, rejected, capacity, ScheduledTask::into_task))
    }

    /// Queue a scheduled task regardless of the bound
    ///
    /// Only fails once the lanes are closed, handing the entry back.
    pub(crate) fn admit_privileged(
        &self,
        lanes: &Lanes,
        entry: ScheduledTask,
    ) -> Result<(), ScheduledTask> {
        lanes.push_privileged(entry).map_err(Rejected::into_inner)
    }

    /// Turn a lane rejection into the caller-facing error
    ///
    /// Runs after the lane lock is released, so dropping the task (and
    /// whatever its body captured) cannot re-enter the lanes under lock.
    fn reject<T>(
        &self,
        stats: &StatsCounters,
        rejected: Rejected<T>,
        capacity: usize,
        into_task: impl FnOnce(T) -> Task,
    ) -> SubmitError {
        stats.record_rejected();
        match rejected {
            Rejected::Full(lane, item) => {
                let task = into_task(item);
                debug!(
                    task_id = %task.id(),
                    label = %task.label(),
                    %lane,
                    capacity,
                    "submission rejected: queue full"
                );
                SubmitError::QueueFull { lane, capacity }
            }
            Rejected::Closed(item) => {
                let task = into_task(item);
                debug!(task_id = %task.id(), "submission rejected: loop terminated");
                SubmitError::Terminated
            }
        }
    }
}
