//! Task structure, completion slot and caller-facing handle
//!
//! A [`Task`] owns the body of a submission until the worker runs it. The
//! matching [`TaskHandle`] shares only the completion slot, so the caller can
//! block on the result, or cancel a task that has not started yet.

use crate::error::{TaskError, TaskFailure};
use crate::kind::Label;
use crate::stats::StatsCounters;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Identifier of a task, unique within one event loop
///
/// Ids are handed out in submission order, so they double as the tie-break
/// sequence for scheduled tasks with identical trigger times.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// Create a TaskId from a u64 value
    pub fn from_u64(id: u64) -> Self {
        TaskId(id)
    }

    /// Get the numeric ID value
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// State of a Task
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TaskState {
    /// Queued, not yet picked up by the worker
    Pending,
    /// Currently executing on the worker thread
    Running,
    /// Finished and produced a value
    Completed,
    /// Body panicked
    Failed,
    /// Handle was cancelled before the task started
    Cancelled,
    /// Loop terminated while the task was still queued
    Discarded,
}

impl TaskState {
    /// Whether the task reached a final state
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskState::Pending | TaskState::Running)
    }
}

enum Slot<T> {
    Pending,
    Running,
    Completed(T),
    Failed(TaskFailure),
    Cancelled,
    Discarded,
    /// Completed, value already moved out through a handle
    Taken,
}

impl<T> Slot<T> {
    fn state(&self) -> TaskState {
        match self {
            Slot::Pending => TaskState::Pending,
            Slot::Running => TaskState::Running,
            Slot::Completed(_) | Slot::Taken => TaskState::Completed,
            Slot::Failed(_) => TaskState::Failed,
            Slot::Cancelled => TaskState::Cancelled,
            Slot::Discarded => TaskState::Discarded,
        }
    }

    fn is_resolved(&self) -> bool {
        self.state().is_terminal()
    }

    /// Move the value out, or explain why there is none
    fn take(&mut self, waited: Duration) -> Result<T, TaskError> {
        match std::mem::replace(self, Slot::Taken) {
            Slot::Completed(value) => Ok(value),
            other => {
                let err = match &other {
                    Slot::Failed(failure) => TaskError::Failed(failure.clone()),
                    Slot::Cancelled => TaskError::Cancelled,
                    Slot::Discarded => TaskError::Discarded,
                    Slot::Taken => TaskError::AlreadyTaken,
                    Slot::Pending | Slot::Running | Slot::Completed(_) => {
                        TaskError::Timeout(waited)
                    }
                };
                *self = other;
                Err(err)
            }
        }
    }
}

/// Completion slot shared between a queued task and its handle
pub(crate) struct Completion<T> {
    slot: Mutex<Slot<T>>,
    resolved: Condvar,
}

impl<T> Completion<T> {
    pub(crate) fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Pending),
            resolved: Condvar::new(),
        }
    }

    pub(crate) fn state(&self) -> TaskState {
        self.slot.lock().state()
    }

    /// Pending -> Running. Returns false if the task was cancelled meanwhile.
    fn begin(&self) -> bool {
        let mut slot = self.slot.lock();
        if matches!(*slot, Slot::Pending) {
            *slot = Slot::Running;
            true
        } else {
            false
        }
    }

    pub(crate) fn complete(&self, value: T) {
        self.resolve(Slot::Completed(value));
    }

    fn fail(&self, failure: TaskFailure) {
        self.resolve(Slot::Failed(failure));
    }

    fn resolve(&self, next: Slot<T>) {
        *self.slot.lock() = next;
        self.resolved.notify_all();
    }

    /// Resolve a still-pending slot into `next`; no-op otherwise
    fn resolve_pending(&self, next: Slot<T>) -> bool {
        let mut slot = self.slot.lock();
        if !matches!(*slot, Slot::Pending) {
            return false;
        }
        *slot = next;
        drop(slot);
        self.resolved.notify_all();
        true
    }

    fn cancel(&self) -> bool {
        self.resolve_pending(Slot::Cancelled)
    }

    fn discard(&self) -> bool {
        self.resolve_pending(Slot::Discarded)
    }

    /// Block until resolved, or until `deadline` passes
    fn wait_until(&self, deadline: Option<Instant>) -> MutexGuard<'_, Slot<T>> {
        let mut slot = self.slot.lock();
        while !slot.is_resolved() {
            match deadline {
                Some(deadline) => {
                    if self.resolved.wait_until(&mut slot, deadline).timed_out() {
                        break;
                    }
                }
                None => self.resolved.wait(&mut slot),
            }
        }
        slot
    }

    pub(crate) fn wait(&self) {
        drop(self.wait_until(None));
    }

    pub(crate) fn wait_for(&self, timeout: Duration) -> bool {
        self.wait_until(deadline_after(timeout)).is_resolved()
    }
}

/// `None` when the deadline is too far out to represent, i.e. wait forever
fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

/// Result of running a task on the worker
#[derive(Debug)]
pub(crate) enum Outcome {
    Completed,
    Failed(TaskFailure),
    /// Cancelled before it started
    Skipped,
}

trait Job: Send {
    /// Run the body, recording the outcome before the handle observes it
    fn run(self: Box<Self>, stats: &StatsCounters) -> Outcome;

    /// Give up on a task that never ran; true if it was still pending
    fn discard(self: Box<Self>) -> bool;
}

struct Runnable<T, F> {
    body: Option<F>,
    completion: Arc<Completion<T>>,
}

impl<T, F> Job for Runnable<T, F>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    fn run(mut self: Box<Self>, stats: &StatsCounters) -> Outcome {
        let Some(body) = self.body.take() else {
            stats.record(&Outcome::Skipped);
            return Outcome::Skipped;
        };
        if !self.completion.begin() {
            release(body);
            stats.record(&Outcome::Skipped);
            return Outcome::Skipped;
        }

        match panic::catch_unwind(AssertUnwindSafe(body)) {
            Ok(value) => {
                stats.record(&Outcome::Completed);
                self.completion.complete(value);
                Outcome::Completed
            }
            Err(payload) => {
                let failure = TaskFailure::from_panic(payload);
                let outcome = Outcome::Failed(failure.clone());
                stats.record(&outcome);
                self.completion.fail(failure);
                outcome
            }
        }
    }

    fn discard(mut self: Box<Self>) -> bool {
        let pending = self.completion.discard();
        if let Some(body) = self.body.take() {
            release(body);
        }
        pending
    }
}

impl<T, F> Drop for Runnable<T, F> {
    fn drop(&mut self) {
        // Never ran: rejected at admission
        if let Some(body) = self.body.take() {
            self.completion.discard();
            release(body);
        }
    }
}

/// Drop a body that will never run
///
/// Its captures may panic in `Drop`; that must not unwind the worker.
fn release<F>(body: F) {
    let _ = panic::catch_unwind(AssertUnwindSafe(move || drop(body)));
}

/// A unit of work owned by a queue until the worker takes it
pub(crate) struct Task {
    id: TaskId,
    label: Label,
    job: Box<dyn Job>,
}

impl Task {
    /// Wrap `body` into a task plus the handle observing it
    pub(crate) fn new<T, F>(id: TaskId, label: Label, body: F) -> (Task, TaskHandle<T>)
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let completion = Arc::new(Completion::new());
        let job = Runnable {
            body: Some(body),
            completion: Arc::clone(&completion),
        };
        let task = Task {
            id,
            label,
            job: Box::new(job),
        };
        (task, TaskHandle { id, completion })
    }

    pub(crate) fn id(&self) -> TaskId {
        self.id
    }

    pub(crate) fn label(&self) -> &Label {
        &self.label
    }

    /// Run the body on the calling thread, capturing panics
    ///
    /// The outcome is counted in `stats` before the handle resolves, so a
    /// caller returning from `get` always sees its task in the counters.
    pub(crate) fn run(self, stats: &StatsCounters) -> Outcome {
        self.job.run(stats)
    }

    /// Resolve the handle as discarded without running the body
    ///
    /// Returns false if the task had already been cancelled.
    pub(crate) fn discard(self) -> bool {
        self.job.discard()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Caller-facing handle to a submitted task
///
/// Blocking on a handle from inside a task of the same loop deadlocks: the
/// awaited task can only run once the current one returns.
pub struct TaskHandle<T> {
    id: TaskId,
    completion: Arc<Completion<T>>,
}

impl<T> TaskHandle<T> {
    /// Get the task ID
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Current state of the task
    pub fn state(&self) -> TaskState {
        self.completion.state()
    }

    /// Whether the task reached a final state
    pub fn is_done(&self) -> bool {
        self.state().is_terminal()
    }

    /// Cancel the task if it has not started yet
    ///
    /// Returns true if this call cancelled it. A running task is never
    /// interrupted.
    pub fn cancel(&self) -> bool {
        self.completion.cancel()
    }

    /// Block until the task resolves, without taking its value
    pub fn wait(&self) {
        self.completion.wait();
    }

    /// Block until the task resolves or `timeout` elapses
    ///
    /// Returns true if the task resolved.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.completion.wait_for(timeout)
    }

    /// Block until the task resolves and return its value
    pub fn get(self) -> Result<T, TaskError> {
        let mut slot = self.completion.wait_until(None);
        slot.take(Duration::ZERO)
    }

    /// Like [`get`](Self::get) but gives up after `timeout`
    ///
    /// On [`TaskError::Timeout`] the handle stays usable.
    pub fn get_timeout(&self, timeout: Duration) -> Result<T, TaskError> {
        let mut slot = self.completion.wait_until(deadline_after(timeout));
        slot.take(timeout)
    }
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn make<T, F>(body: F) -> (Task, TaskHandle<T>)
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        Task::new(TaskId::from_u64(1), Label::from("test"), body)
    }

    #[test]
    fn test_task_run_completes_handle() {
        let (task, handle) = make(|| 1 + 1);
        assert_eq!(handle.state(), TaskState::Pending);
        assert!(matches!(task.run(&StatsCounters::default()), Outcome::Completed));
        assert_eq!(handle.state(), TaskState::Completed);
        assert_eq!(handle.get(), Ok(2));
    }

    #[test]
    fn test_task_panic_is_captured() {
        let (task, handle) = make(|| -> u32 { panic!("kaboom") });
        match task.run(&StatsCounters::default()) {
            Outcome::Failed(failure) => assert_eq!(failure.message(), "kaboom"),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(handle.state(), TaskState::Failed);
        assert_eq!(handle.get(), Err(TaskError::Failed(TaskFailure::new("kaboom"))));
    }

    #[test]
    fn test_cancel_before_run_skips_body() {
        let ran = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&ran);
        let (task, handle) = make(move || *flag.lock() = true);

        assert!(handle.cancel());
        assert!(!handle.cancel());
        assert!(matches!(task.run(&StatsCounters::default()), Outcome::Skipped));
        assert!(!*ran.lock());
        assert_eq!(handle.get(), Err(TaskError::Cancelled));
    }

    #[test]
    fn test_cancel_after_completion_fails() {
        let (task, handle) = make(|| 5);
        task.run(&StatsCounters::default());
        assert!(!handle.cancel());
        assert_eq!(handle.get(), Ok(5));
    }

    #[test]
    fn test_dropped_task_is_discarded() {
        let (task, handle) = make(|| 5);
        drop(task);
        assert_eq!(handle.state(), TaskState::Discarded);
        assert_eq!(handle.get(), Err(TaskError::Discarded));
    }

    #[test]
    fn test_get_timeout_then_value() {
        let (task, handle) = make(|| "done");
        assert_eq!(
            handle.get_timeout(Duration::from_millis(1)),
            Err(TaskError::Timeout(Duration::from_millis(1)))
        );

        let worker = thread::spawn(move || task.run(&StatsCounters::default()));
        assert_eq!(handle.get_timeout(Duration::from_secs(5)), Ok("done"));
        assert_eq!(
            handle.get_timeout(Duration::from_secs(5)),
            Err(TaskError::AlreadyTaken)
        );
        assert_eq!(handle.state(), TaskState::Completed);
        worker.join().unwrap();
    }

    #[test]
    fn test_wait_does_not_take_value() {
        let (task, handle) = make(|| vec![1, 2, 3]);
        let worker = thread::spawn(move || task.run(&StatsCounters::default()));
        handle.wait();
        assert!(handle.wait_timeout(Duration::ZERO));
        assert_eq!(handle.get(), Ok(vec![1, 2, 3]));
        worker.join().unwrap();
    }

    #[test]
    fn test_outcome_counted_before_handle_resolves() {
        let stats = Arc::new(StatsCounters::default());
        let (task, handle) = make(|| 3);
        let worker = {
            let stats = Arc::clone(&stats);
            thread::spawn(move || {
                task.run(&stats);
            })
        };

        assert_eq!(handle.get(), Ok(3));
        assert_eq!(stats.snapshot(0, 0).completed, 1);
        worker.join().unwrap();
    }

    struct PanicOnDrop;

    impl Drop for PanicOnDrop {
        fn drop(&mut self) {
            panic!("capture dropped");
        }
    }

    #[test]
    fn test_discard_survives_panicking_capture() {
        let capture = PanicOnDrop;
        let (task, handle) = make(move || {
            let _keep = &capture;
        });

        assert!(task.discard());
        assert_eq!(handle.get(), Err(TaskError::Discarded));
    }

    #[test]
    fn test_cancelled_run_survives_panicking_capture() {
        let stats = StatsCounters::default();
        let capture = PanicOnDrop;
        let (task, handle) = make(move || {
            let _keep = &capture;
        });

        assert!(handle.cancel());
        assert!(matches!(task.run(&stats), Outcome::Skipped));
        assert_eq!(stats.snapshot(0, 0).skipped, 1);
    }

    #[test]
    fn test_discard_after_cancel_is_not_pending() {
        let (task, handle) = make(|| 1);
        assert!(handle.cancel());
        assert!(!task.discard());
        assert_eq!(handle.get(), Err(TaskError::Cancelled));
    }

    #[test]
    fn test_huge_timeout_waits_forever() {
        let (task, handle) = make(|| 9);
        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            task.run(&StatsCounters::default())
        });
        assert_eq!(handle.get_timeout(Duration::MAX), Ok(9));
        worker.join().unwrap();
    }
}
