//! Task documents returned by vCD for asynchronous operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use vcd_core::Error;

use crate::Result;

/// Status of a task.
///
/// Labels are defined by the server; unrecognized ones are kept verbatim in
/// [`TaskStatus::Other`] and treated as non-terminal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    /// Accepted, not yet scheduled.
    Queued,
    /// Scheduled, waiting on a precondition.
    PreRunning,
    /// In progress.
    Running,
    /// Finished successfully.
    Success,
    /// Finished with an error.
    Error,
    /// Cancelled on the server.
    Aborted,
    /// Any other server-defined label.
    Other(String),
}

impl TaskStatus {
    /// Server label for this status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::PreRunning => "preRunning",
            Self::Running => "running",
            Self::Success => "success",
            Self::Error => "error",
            Self::Aborted => "aborted",
            Self::Other(label) => label,
        }
    }

    /// Returns true for `success`, `error` and `aborted`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error | Self::Aborted)
    }

    /// Returns true for `error` and `aborted`.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Error | Self::Aborted)
    }
}

impl From<&str> for TaskStatus {
    fn from(label: &str) -> Self {
        match label {
            "queued" => Self::Queued,
            "preRunning" => Self::PreRunning,
            "running" => Self::Running,
            "success" => Self::Success,
            "error" => Self::Error,
            "aborted" => Self::Aborted,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for TaskStatus {
    fn from(label: String) -> Self {
        Self::from(label.as_str())
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Link to another entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    /// Entity HREF.
    pub href: String,
    /// Entity URN, when provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Media type of the entity.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

/// Error detail attached to a failed task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskError {
    /// Server message.
    pub message: String,
    /// HTTP-like major code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_error_code: Option<u16>,
    /// Symbolic minor code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minor_error_code: Option<String>,
}

/// Snapshot of a server-side asynchronous operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Task HREF, used for polling.
    pub href: String,
    /// Task URN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Task name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Operation description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    /// Short operation name (e.g. `vdcDeleteVdc`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    /// Current status.
    pub status: TaskStatus,
    /// Completion percentage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    /// Error detail for failed tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
    /// Entity being created or mutated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Reference>,
    /// Start timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    /// End timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

impl Task {
    /// Decode a task from a response document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParseError`] if the document is not a task.
    pub fn from_document(doc: Value) -> Result<Self> {
        serde_json::from_value(doc).map_err(|err| Error::ParseError(format!("Invalid task document: {err}")))
    }

    /// Returns true once the task has finished.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// HREF of the owning entity, if reported.
    #[must_use]
    pub fn owner_href(&self) -> Option<&str> {
        self.owner.as_ref().map(|owner| owner.href.as_str())
    }

    /// Message describing a failed task.
    ///
    /// The server's message is returned unmodified when present.
    #[must_use]
    pub fn failure_message(&self) -> String {
        match &self.error {
            Some(error) => error.message.clone(),
            None => format!("task {} finished with status {}", self.href, self.status),
        }
    }
}

/// A page of tasks for an organization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TasksList {
    /// Tasks in the list.
    #[serde(default)]
    pub task: Vec<Task>,
}
