//! Shutdown coordination
//!
//! Shutdown is a stop action queued in the delay lane with a zero delay. It
//! skips admission's bound, so backpressure can never starve termination. The
//! action is the only writer of the stop flag and it runs on the worker
//! thread, the only reader that acts on it.

use crate::event_loop::Shared;
use crate::kind::Label;
use crate::queue::ScheduledTask;
use crate::task::{Completion, Task};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Label carried by the stop action
const STOP_LABEL: Label = Label::fixed("shutdown");

/// Trigger delay of the stop action
const STOP_DELAY: Duration = Duration::ZERO;

/// Resolves once the loop has stopped and discarded its remaining tasks
///
/// Once resolved, no task left in either lane will ever run.
#[derive(Clone)]
pub struct ShutdownHandle {
    terminated: Arc<Completion<()>>,
}

impl ShutdownHandle {
    pub(crate) fn new(terminated: Arc<Completion<()>>) -> Self {
        Self { terminated }
    }

    /// Whether the loop has terminated
    pub fn is_done(&self) -> bool {
        self.terminated.state().is_terminal()
    }

    /// Block until the loop has terminated
    ///
    /// Must not be called from a task running on the same loop.
    pub fn wait(&self) {
        self.terminated.wait();
    }

    /// Block until the loop has terminated or `timeout` elapses
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.terminated.wait_for(timeout)
    }
}

impl std::fmt::Debug for ShutdownHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownHandle")
            .field("done", &self.is_done())
            .finish()
    }
}

/// Queue the stop action unless one is already on its way
pub(crate) fn request_stop(shared: &Shared) -> ShutdownHandle {
    let handle = ShutdownHandle::new(Arc::clone(&shared.terminated));
    if shared.stop_requested.swap(true, Ordering::AcqRel) {
        return handle;
    }

    let stop = Arc::clone(&shared.stop);
    let (task, _) = Task::new(shared.next_id(), STOP_LABEL, move || {
        stop.store(true, Ordering::Release);
    });
    let id = task.id();
    let entry = ScheduledTask::new(task, Instant::now() + STOP_DELAY);

    match shared.admission.admit_privileged(&shared.lanes, entry) {
        Ok(()) => debug!(loop_name = %shared.name, task_id = %id, "shutdown requested"),
        // Lanes close only after the loop stopped; the handle is already resolved
        Err(_) => debug!(loop_name = %shared.name, "shutdown requested after termination"),
    }
    handle
}
