//! Task labels
//!
//! A label classifies a task for logging. It never influences which lane a
//! task lands in or when it runs.

use std::borrow::Cow;
use std::fmt;

/// Well-known task classes
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// IO-bound work
    Io,
    /// CPU-bound work
    Compute,
}

impl TaskKind {
    /// Canonical label text
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Io => "IO",
            TaskKind::Compute => "COMPUTE",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque label passed through unchanged with a submission
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Label(Cow<'static, str>);

impl Label {
    /// Label text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) const fn fixed(text: &'static str) -> Self {
        Label(Cow::Borrowed(text))
    }
}

impl From<&'static str> for Label {
    fn from(text: &'static str) -> Self {
        Label(Cow::Borrowed(text))
    }
}

impl From<String> for Label {
    fn from(text: String) -> Self {
        Label(Cow::Owned(text))
    }
}

impl From<TaskKind> for Label {
    fn from(kind: TaskKind) -> Self {
        Label(Cow::Borrowed(kind.as_str()))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        assert_eq!(Label::from(TaskKind::Io).as_str(), "IO");
        assert_eq!(Label::from(TaskKind::Compute).to_string(), "COMPUTE");
    }

    #[test]
    fn test_label_passthrough() {
        assert_eq!(Label::from("").as_str(), "");
        assert_eq!(Label::from(String::from("custom")).as_str(), "custom");
    }
}
