//! Error types for submission, task results and loop construction

use crate::queue::Lane;
use std::any::Any;
use std::time::Duration;

/// Admission rejected a submission
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    /// The targeted lane already holds `capacity` tasks
    #[error("{lane} queue is full (capacity {capacity})")]
    QueueFull {
        /// Lane the task was headed for
        lane: Lane,
        /// Bound in force when the submission was rejected
        capacity: usize,
    },

    /// The loop has stopped and no longer accepts work
    #[error("Event loop has terminated")]
    Terminated,
}

impl SubmitError {
    /// Whether this is a capacity rejection (as opposed to termination)
    pub fn is_queue_full(&self) -> bool {
        matches!(self, SubmitError::QueueFull { .. })
    }
}

/// A task body panicked while running on the worker thread
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Task panicked: {message}")]
pub struct TaskFailure {
    message: String,
}

impl TaskFailure {
    /// Create a failure with the given message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Build a failure from a `catch_unwind` payload
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self { message }
    }

    /// The panic message
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Retrieving a task result through its handle failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// The task did not resolve within the requested timeout
    #[error("Timed out after {0:?} waiting for task")]
    Timeout(Duration),

    /// The task body panicked
    #[error(transparent)]
    Failed(#[from] TaskFailure),

    /// The handle was cancelled before the task started
    #[error("Task was cancelled")]
    Cancelled,

    /// The loop terminated while the task was still queued
    #[error("Task was discarded by event loop shutdown")]
    Discarded,

    /// The value was already taken by an earlier `get_timeout`
    #[error("Task result was already taken")]
    AlreadyTaken,
}

/// An event loop could not be started
#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    /// The configuration was rejected before any thread was started
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The OS refused to start the worker thread
    #[error("Failed to spawn event loop thread '{name}': {source}")]
    Thread {
        /// Requested thread name
        name: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },
}

/// Loading or validating a [`LoopConfig`](crate::LoopConfig) failed
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading the configuration file failed
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for a loop configuration
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field holds an unusable value
    #[error("Invalid config: {0}")]
    Invalid(String),
}
