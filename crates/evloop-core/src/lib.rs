//! Evloop core
//!
//! A single-worker event loop that multiplexes two lanes of work onto one
//! dedicated thread:
//! - **Immediate lane**: bounded FIFO of ready tasks
//! - **Delay lane**: bounded priority queue ordered by trigger time, ties
//!   broken by submission order
//!
//! Submissions never block. When a lane is full the submission fails with
//! [`SubmitError::QueueFull`] and the caller decides whether to retry, back
//! off or drop the work. Shutdown bypasses the bound and discards whatever is
//! still queued once the loop stops. Dropping the last [`EventLoop`] clone
//! shuts the loop down the same way.
//!
//! # Example
//!
//! ```rust,ignore
//! use evloop_core::{EventLoop, TaskKind};
//! use std::time::Duration;
//!
//! let event_loop = EventLoop::new("event-loop")?;
//! let sum = event_loop.submit(TaskKind::Compute, || 1 + 1)?;
//! let later = event_loop.schedule(TaskKind::Compute, || 2 + 2, Duration::from_millis(10))?;
//!
//! assert_eq!(sum.get()?, 2);
//! assert_eq!(later.get_timeout(Duration::from_millis(100))?, 4);
//!
//! event_loop.shutdown().wait();
//! ```

mod admission;
mod config;
mod dispatcher;
mod error;
mod event_loop;
mod kind;
mod lanes;
mod queue;
mod shutdown;
mod stats;
mod task;

pub use config::{LoopConfig, DEFAULT_LOOP_NAME, DEFAULT_MAX_QUEUE_SIZE};
pub use error::{ConfigError, SpawnError, SubmitError, TaskError, TaskFailure};
pub use event_loop::EventLoop;
pub use kind::{Label, TaskKind};
pub use queue::Lane;
pub use shutdown::ShutdownHandle;
pub use stats::LoopStats;
pub use task::{TaskHandle, TaskId, TaskState};
