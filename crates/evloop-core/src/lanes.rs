//! Both lanes behind one lock, with one condvar as the wakeup channel
//!
//! Every insert into either lane happens under the lane lock and is followed
//! by a notify. The worker checks both lanes and starts waiting inside the
//! same critical section, so a scheduled task submitted while the worker is
//! blocked always wakes it and no wakeup can be lost.

use crate::queue::{DelayQueue, ImmediateQueue, Lane, ScheduledTask};
use crate::task::Task;
use parking_lot::{Condvar, Mutex};
use std::time::Instant;

/// Why an insert did not happen
#[derive(Debug)]
pub(crate) enum Rejected<T> {
    /// Lane at capacity; carries the lane and the returned item
    Full(Lane, T),
    /// Lanes already closed by termination
    Closed(T),
}

impl<T> Rejected<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            Rejected::Full(_, item) | Rejected::Closed(item) => item,
        }
    }
}

struct LaneState {
    immediate: ImmediateQueue,
    delayed: DelayQueue,
    closed: bool,
}

/// The immediate and delay lanes of one loop
pub(crate) struct Lanes {
    state: Mutex<LaneState>,
    /// Signalled after every successful insert into either lane
    ready: Condvar,
}

impl Lanes {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(LaneState {
                immediate: ImmediateQueue::default(),
                delayed: DelayQueue::default(),
                closed: false,
            }),
            ready: Condvar::new(),
        }
    }

    /// Append to the immediate lane if below `capacity`
    pub(crate) fn push_immediate(&self, task: Task, capacity: usize) -> Result<(), Rejected<Task>> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(Rejected::Closed(task));
            }
            state
                .immediate
                .try_push(task, capacity)
                .map_err(|task| Rejected::Full(Lane::Immediate, task))?;
        }
        self.ready.notify_one();
        Ok(())
    }

    /// Insert into the delay lane if strictly below `capacity`
    pub(crate) fn push_delayed(
        &self,
        entry: ScheduledTask,
        capacity: usize,
    ) -> Result<(), Rejected<ScheduledTask>> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(Rejected::Closed(entry));
            }
            state
                .delayed
                .try_push(entry, capacity)
                .map_err(|entry| Rejected::Full(Lane::Delayed, entry))?;
        }
        self.ready.notify_one();
        Ok(())
    }

    /// Insert into the delay lane ignoring capacity; fails only once closed
    pub(crate) fn push_privileged(&self, entry: ScheduledTask) -> Result<(), Rejected<ScheduledTask>> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(Rejected::Closed(entry));
            }
            state.delayed.push_unbounded(entry);
        }
        self.ready.notify_one();
        Ok(())
    }

    /// Pick the next task for the worker, blocking at most until the earliest
    /// scheduled deadline
    ///
    /// Returns `None` when a wait ends without a task: the deadline passed, a
    /// scheduled task was inserted, or the wakeup was spurious. The caller
    /// simply asks again.
    pub(crate) fn take_task(&self) -> Option<Task> {
        let mut state = self.state.lock();

        match state.delayed.peek_trigger() {
            Some(trigger) if trigger <= Instant::now() => state.delayed.pop(),
            Some(trigger) => {
                if state.immediate.is_empty() {
                    // Timed out or not, the next call re-examines the head
                    let _ = self.ready.wait_until(&mut state, trigger);
                }
                state.immediate.pop()
            }
            None => {
                if state.immediate.is_empty() {
                    self.ready.wait(&mut state);
                }
                state.immediate.pop()
            }
        }
    }

    /// Close both lanes and hand back everything still queued
    ///
    /// Later inserts fail with [`Rejected::Closed`]. The returned tasks must
    /// be dropped outside the lock by the caller.
    pub(crate) fn close(&self) -> Vec<Task> {
        let mut state = self.state.lock();
        state.closed = true;
        let LaneState {
            immediate, delayed, ..
        } = &mut *state;
        let drained: Vec<Task> = immediate.drain().chain(delayed.drain()).collect();
        drained
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Current depth of (immediate, delayed)
    pub(crate) fn depths(&self) -> (usize, usize) {
        let state = self.state.lock();
        (state.immediate.len(), state.delayed.len())
    }
}
