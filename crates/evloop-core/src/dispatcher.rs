//! Worker thread that drains both lanes
//!
//! The dispatcher is the only consumer of the lanes and the only thread that
//! runs task bodies. It never polls: each iteration either takes a task or
//! blocks until the next scheduled deadline or the next insert.

use crate::event_loop::Shared;
use crate::task::{Outcome, Task};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use tracing::{info, info_span, trace, warn};

/// Worker loop of one event loop
pub(crate) struct Dispatcher {
    shared: Arc<Shared>,
}

impl Dispatcher {
    /// Spawn the worker thread, named after the loop
    pub(crate) fn spawn(shared: Arc<Shared>) -> std::io::Result<thread::JoinHandle<()>> {
        let name = shared.name.clone();
        thread::Builder::new()
            .name(name)
            .spawn(move || Dispatcher { shared }.run_loop())
    }

    /// Worker thread main loop
    fn run_loop(self) {
        let _ = self.shared.worker.set(thread::current().id());
        let span = info_span!("event_loop", loop_name = %self.shared.name);
        let _entered = span.enter();
        info!("event loop started");

        // Resolves shutdown waiters however the loop exits
        let _termination = Termination {
            shared: &self.shared,
        };

        loop {
            if let Some(task) = self.shared.lanes.take_task() {
                self.run_task(task);
            }

            // Checked between tasks only; a running task is never cut short
            if self.shared.stop.load(Ordering::Acquire) {
                break;
            }
        }
    }

    fn run_task(&self, task: Task) {
        let id = task.id();
        let label = task.label().clone();
        trace!(task_id = %id, %label, "running task");

        // Body panics are captured inside `run`; this catches panics from
        // dropping what the task leaves behind
        match panic::catch_unwind(AssertUnwindSafe(|| task.run(&self.shared.stats))) {
            Ok(Outcome::Failed(failure)) => {
                warn!(task_id = %id, %label, error = %failure, "task failed");
            }
            Ok(_) => {}
            Err(_) => warn!(task_id = %id, %label, "task cleanup panicked"),
        }
    }
}

/// Closes the lanes, discards what is left and resolves the termination
/// latch when dropped
struct Termination<'a> {
    shared: &'a Shared,
}

impl Drop for Termination<'_> {
    fn drop(&mut self) {
        let remaining = self.shared.lanes.close();

        // Outside the lane lock
        let mut discarded = 0;
        for task in remaining {
            if task.discard() {
                discarded += 1;
            } else {
                // Cancelled while still queued
                self.shared.stats.record(&Outcome::Skipped);
            }
        }

        self.shared.stats.record_discarded(discarded);
        self.shared.terminated.complete(());
        info!(discarded, "event loop terminated");
    }
}
