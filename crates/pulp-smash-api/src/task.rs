//! Call reports and task reports as returned by Pulp.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reference to a background task, as listed in `spawned_tasks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRef {
  /// Path of the task resource, e.g. `/pulp/api/v2/tasks/<id>/`.
  #[serde(rename = "_href")]
  pub href: String,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub task_id: Option<String>,

  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl TaskRef {
  pub fn new(href: impl Into<String>) -> Self {
    Self {
      href: href.into(),
      task_id: None,
      extra: Map::new(),
    }
  }
}

/// The immediate response to triggering an asynchronous operation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CallReport {
  #[serde(default)]
  pub result: Value,

  /// Non-null when the call itself failed.
  #[serde(default)]
  pub error: Option<Value>,

  #[serde(default)]
  pub spawned_tasks: Vec<TaskRef>,
}

impl CallReport {
  pub fn new(spawned_tasks: Vec<TaskRef>) -> Self {
    Self {
      spawned_tasks,
      ..Default::default()
    }
  }
}

/// State of a task as reported by Pulp.
///
/// Unrecognised states are kept verbatim in [`TaskStatus::Other`] and are
/// never terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
  Waiting,
  Accepted,
  Running,
  Suspended,
  Canceled,
  Error,
  Finished,
  Skipped,
  TimedOut,
  Other(String),
}

impl TaskStatus {
  pub fn as_str(&self) -> &str {
    match self {
      TaskStatus::Waiting => "waiting",
      TaskStatus::Accepted => "accepted",
      TaskStatus::Running => "running",
      TaskStatus::Suspended => "suspended",
      TaskStatus::Canceled => "canceled",
      TaskStatus::Error => "error",
      TaskStatus::Finished => "finished",
      TaskStatus::Skipped => "skipped",
      TaskStatus::TimedOut => "timed out",
      TaskStatus::Other(s) => s,
    }
  }

  /// Whether the server will never move the task out of this state.
  pub fn is_terminal(&self) -> bool {
    matches!(
      self,
      TaskStatus::Canceled
        | TaskStatus::Error
        | TaskStatus::Finished
        | TaskStatus::Skipped
        | TaskStatus::TimedOut
    )
  }
}

impl From<String> for TaskStatus {
  fn from(s: String) -> Self {
    match s.as_str() {
      "waiting" => TaskStatus::Waiting,
      "accepted" => TaskStatus::Accepted,
      "running" => TaskStatus::Running,
      "suspended" => TaskStatus::Suspended,
      "canceled" => TaskStatus::Canceled,
      "error" => TaskStatus::Error,
      "finished" => TaskStatus::Finished,
      "skipped" => TaskStatus::Skipped,
      "timed out" => TaskStatus::TimedOut,
      _ => TaskStatus::Other(s),
    }
  }
}

impl From<&str> for TaskStatus {
  fn from(s: &str) -> Self {
    TaskStatus::from(s.to_string())
  }
}

impl From<TaskStatus> for String {
  fn from(status: TaskStatus) -> Self {
    match status {
      TaskStatus::Other(s) => s,
      known => known.as_str().to_string(),
    }
  }
}

impl fmt::Display for TaskStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One snapshot of a task.
///
/// Only `state` and `spawned_tasks` are interpreted. Every other field
/// (`_href`, `result`, `error`, `progress_report`, ...) is kept as fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskState {
  pub state: TaskStatus,

  #[serde(default)]
  pub spawned_tasks: Vec<TaskRef>,

  #[serde(flatten)]
  pub fields: Map<String, Value>,
}

impl TaskState {
  pub fn new(state: impl Into<TaskStatus>) -> Self {
    Self {
      state: state.into(),
      spawned_tasks: Vec::new(),
      fields: Map::new(),
    }
  }

  pub fn with_children(mut self, children: Vec<TaskRef>) -> Self {
    self.spawned_tasks = children;
    self
  }

  pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
    self.fields.insert(name.into(), value);
    self
  }

  pub fn is_terminal(&self) -> bool {
    self.state.is_terminal()
  }

  /// The task's own `_href`, if the server reported one.
  pub fn href(&self) -> Option<&str> {
    self.fields.get("_href").and_then(Value::as_str)
  }

  pub fn field(&self, name: &str) -> Option<&Value> {
    self.fields.get(name)
  }
}
