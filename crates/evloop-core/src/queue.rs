//! Immediate lane (FIFO) and delay lane (min-heap by trigger time)
//!
//! Neither queue is synchronized on its own; both live inside the lane state
//! guarded by [`Lanes`](crate::lanes::Lanes). Capacity is passed in on every
//! insert because the bound can be reconfigured at any time.

use crate::task::{Task, TaskId};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::fmt;
use std::time::Instant;

/// The two submission lanes
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Lane {
    /// Ready-to-run tasks, FIFO
    Immediate,
    /// Tasks gated by a trigger time
    Delayed,
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Lane::Immediate => "immediate",
            Lane::Delayed => "delayed",
        })
    }
}

/// Bounded FIFO of ready tasks
#[derive(Debug, Default)]
pub(crate) struct ImmediateQueue {
    tasks: VecDeque<Task>,
}

impl ImmediateQueue {
    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Append unless `capacity` tasks are already queued
    pub(crate) fn try_push(&mut self, task: Task, capacity: usize) -> Result<(), Task> {
        if self.tasks.len() < capacity {
            self.tasks.push_back(task);
            Ok(())
        } else {
            Err(task)
        }
    }

    pub(crate) fn pop(&mut self) -> Option<Task> {
        self.tasks.pop_front()
    }

    pub(crate) fn drain(&mut self) -> impl Iterator<Item = Task> + '_ {
        self.tasks.drain(..)
    }
}

/// A task gated by an absolute trigger time
#[derive(Debug)]
pub(crate) struct ScheduledTask {
    /// When the task becomes due
    trigger: Instant,
    task: Task,
}

impl ScheduledTask {
    pub(crate) fn new(task: Task, trigger: Instant) -> Self {
        Self { trigger, task }
    }

    pub(crate) fn trigger(&self) -> Instant {
        self.trigger
    }

    /// Tie-break sequence: ids are allocated in submission order
    fn sequence(&self) -> TaskId {
        self.task.id()
    }

    pub(crate) fn into_task(self) -> Task {
        self.task
    }
}

// Reverse ordering for min-heap: earliest trigger first, then lowest sequence
impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .trigger
            .cmp(&self.trigger)
            .then_with(|| other.sequence().cmp(&self.sequence()))
    }
}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScheduledTask {
    fn eq(&self, other: &Self) -> bool {
        self.trigger == other.trigger && self.sequence() == other.sequence()
    }
}

impl Eq for ScheduledTask {}

/// Bounded priority queue of scheduled tasks
#[derive(Debug, Default)]
pub(crate) struct DelayQueue {
    heap: BinaryHeap<ScheduledTask>,
}

impl DelayQueue {
    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    /// Insert if strictly fewer than `capacity` entries are queued
    pub(crate) fn try_push(
        &mut self,
        entry: ScheduledTask,
        capacity: usize,
    ) -> Result<(), ScheduledTask> {
        if self.heap.len() < capacity {
            self.heap.push(entry);
            Ok(())
        } else {
            Err(entry)
        }
    }

    /// Insert regardless of capacity
    pub(crate) fn push_unbounded(&mut self, entry: ScheduledTask) {
        self.heap.push(entry);
    }

    /// Trigger time of the earliest entry
    pub(crate) fn peek_trigger(&self) -> Option<Instant> {
        self.heap.peek().map(ScheduledTask::trigger)
    }

    pub(crate) fn pop(&mut self) -> Option<Task> {
        self.heap.pop().map(ScheduledTask::into_task)
    }

    pub(crate) fn drain(&mut self) -> impl Iterator<Item = Task> + '_ {
        self.heap.drain().map(ScheduledTask::into_task)
    }
}
