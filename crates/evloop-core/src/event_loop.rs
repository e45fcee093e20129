//! Event loop facade
//!
//! An [`EventLoop`] owns one worker thread, started on construction. Callers
//! on any thread (including tasks running on the loop itself) submit work to
//! the immediate lane or the delay lane; the worker runs it one task at a
//! time.

use crate::admission::AdmissionController;
use crate::config::{self, LoopConfig};
use crate::dispatcher::Dispatcher;
use crate::error::{ConfigError, SpawnError, SubmitError};
use crate::kind::Label;
use crate::lanes::Lanes;
use crate::queue::ScheduledTask;
use crate::shutdown::{self, ShutdownHandle};
use crate::stats::{LoopStats, StatsCounters};
use crate::task::{Completion, Task, TaskHandle, TaskId};
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

/// Roughly 30 years; stands in for trigger times that overflow `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Label for fire-and-forget submissions
const UNLABELED: Label = Label::fixed("");

/// State shared by the facade, the dispatcher and the stop action
pub(crate) struct Shared {
    /// Loop (and worker thread) name
    pub(crate) name: String,

    /// Immediate and delay lanes
    pub(crate) lanes: Lanes,

    /// Capacity bound checked at submission
    pub(crate) admission: AdmissionController,

    /// Set only by the stop action, on the worker thread
    pub(crate) stop: Arc<AtomicBool>,

    /// Whether a stop action has been queued
    pub(crate) stop_requested: AtomicBool,

    /// Resolved by the worker after it discarded the remaining tasks
    pub(crate) terminated: Arc<Completion<()>>,

    /// Worker thread id, set when the worker starts
    pub(crate) worker: OnceCell<ThreadId>,

    pub(crate) stats: StatsCounters,

    /// Per-loop id source; also orders equal trigger times
    sequence: AtomicU64,
}

impl Shared {
    pub(crate) fn next_id(&self) -> TaskId {
        TaskId::from_u64(self.sequence.fetch_add(1, Ordering::Relaxed))
    }
}

/// Requests shutdown once the last [`EventLoop`] clone is gone
struct StopOnDrop {
    shared: Arc<Shared>,
}

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        shutdown::request_stop(&self.shared);
    }
}

/// Single-worker executor with an immediate lane and a delay lane
///
/// Cloning is cheap; all clones drive the same worker. Dropping the last
/// clone shuts the loop down as [`shutdown`](Self::shutdown) would, without
/// waiting. A task that captures a clone keeps the loop alive until it has
/// run or been discarded.
#[derive(Clone)]
pub struct EventLoop {
    shared: Arc<Shared>,
    _stop_on_drop: Arc<StopOnDrop>,
}

impl EventLoop {
    /// Start a loop with default settings and the given thread name
    pub fn new(name: impl Into<String>) -> Result<Self, SpawnError> {
        Self::with_config(LoopConfig::new(name))
    }

    /// Start a loop from a configuration
    ///
    /// The configuration is validated first; an invalid one starts no thread.
    pub fn with_config(config: LoopConfig) -> Result<Self, SpawnError> {
        config.validate()?;

        let shared = Arc::new(Shared {
            name: config.name,
            lanes: Lanes::new(),
            admission: AdmissionController::new(config.max_queue_size),
            stop: Arc::new(AtomicBool::new(false)),
            stop_requested: AtomicBool::new(false),
            terminated: Arc::new(Completion::new()),
            worker: OnceCell::new(),
            stats: StatsCounters::default(),
            sequence: AtomicU64::new(1),
        });

        // Detached: termination is observed through `terminated`
        Dispatcher::spawn(Arc::clone(&shared)).map_err(|source| SpawnError::Thread {
            name: shared.name.clone(),
            source,
        })?;

        let stop_on_drop = Arc::new(StopOnDrop {
            shared: Arc::clone(&shared),
        });
        Ok(Self {
            shared,
            _stop_on_drop: stop_on_drop,
        })
    }

    /// Loop name, also the worker thread name
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Submit a computation to the immediate lane
    ///
    /// Fails with [`SubmitError::QueueFull`] instead of blocking when the lane
    /// is at capacity. `label` is carried for logging only.
    pub fn submit<T, F>(&self, label: impl Into<Label>, body: F) -> Result<TaskHandle<T>, SubmitError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (task, handle) = Task::new(self.shared.next_id(), label.into(), body);
        self.admit_immediate(task)?;
        Ok(handle)
    }

    /// Submit an action to the immediate lane without keeping a handle
    pub fn execute<F>(&self, action: F) -> Result<(), SubmitError>
    where
        F: FnOnce() + Send + 'static,
    {
        let (task, _) = Task::new(self.shared.next_id(), UNLABELED, action);
        self.admit_immediate(task)
    }

    /// Submit a computation that becomes due after `delay`
    ///
    /// Tasks with equal trigger times run in submission order.
    pub fn schedule<T, F>(
        &self,
        label: impl Into<Label>,
        body: F,
        delay: Duration,
    ) -> Result<TaskHandle<T>, SubmitError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let trigger = trigger_after(delay);
        let (task, handle) = Task::new(self.shared.next_id(), label.into(), body);
        self.admit_delayed(ScheduledTask::new(task, trigger))?;
        Ok(handle)
    }

    /// Submit an action that becomes due after `delay`, without a handle
    pub fn execute_after<F>(&self, action: F, delay: Duration) -> Result<(), SubmitError>
    where
        F: FnOnce() + Send + 'static,
    {
        let trigger = trigger_after(delay);
        let (task, _) = Task::new(self.shared.next_id(), UNLABELED, action);
        self.admit_delayed(ScheduledTask::new(task, trigger))
    }

    /// Change the bound applied to future submissions on both lanes
    ///
    /// Tasks already queued are kept even if they exceed the new bound. A
    /// bound of zero is rejected, as it is in [`LoopConfig::validate`].
    pub fn set_max_queue_size(&self, max_queue_size: usize) -> Result<(), ConfigError> {
        config::check_max_queue_size(max_queue_size)?;
        self.shared.admission.set_max_queue_size(max_queue_size);
        Ok(())
    }

    /// Bound currently applied to submissions
    pub fn max_queue_size(&self) -> usize {
        self.shared.admission.max_queue_size()
    }

    /// Ask the loop to stop
    ///
    /// Never rejected for capacity. Tasks still queued when the loop stops
    /// are discarded, not drained. Calling this again is harmless.
    pub fn shutdown(&self) -> ShutdownHandle {
        shutdown::request_stop(&self.shared)
    }

    /// Whether the caller is running on this loop's worker thread
    pub fn in_event_loop(&self) -> bool {
        self.shared.worker.get() == Some(&thread::current().id())
    }

    /// Whether the loop has stopped and discarded its remaining tasks
    pub fn is_terminated(&self) -> bool {
        self.shared.lanes.is_closed()
    }

    /// Block until the loop has terminated or `timeout` elapses
    pub fn await_termination(&self, timeout: Duration) -> bool {
        self.shared.terminated.wait_for(timeout)
    }

    /// Counters and current lane depths
    pub fn stats(&self) -> LoopStats {
        let (immediate, delayed) = self.shared.lanes.depths();
        self.shared.stats.snapshot(immediate, delayed)
    }

    fn admit_immediate(&self, task: Task) -> Result<(), SubmitError> {
        let shared = &self.shared;
        shared.admission.admit_immediate(&shared.lanes, &shared.stats, task)
    }

    fn admit_delayed(&self, entry: ScheduledTask) -> Result<(), SubmitError> {
        let shared = &self.shared;
        shared.admission.admit_delayed(&shared.lanes, &shared.stats, entry)
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("name", &self.shared.name)
            .field("max_queue_size", &self.max_queue_size())
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

/// Absolute trigger time for `delay` from now
fn trigger_after(delay: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(delay)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}
