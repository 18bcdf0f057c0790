//! Outcome checks for call reports and finished tasks.

use crate::error::ApiError;
use crate::task::{CallReport, TaskState};

/// Task fields that must be null on a successful task.
const TASK_ERROR_FIELDS: [&str; 3] = ["error", "exception", "traceback"];

/// Fail if the call report's `error` field is set.
pub fn check_call_report(report: &CallReport) -> Result<(), ApiError> {
  match &report.error {
    Some(error) if !error.is_null() => Err(ApiError::CallReport {
      error: error.clone(),
    }),
    _ => Ok(()),
  }
}

/// Fail on the first task whose `error`, `exception` or `traceback` is set.
///
/// Absent fields count as null.
pub fn check_tasks(tasks: &[TaskState]) -> Result<(), ApiError> {
  for task in tasks {
    for field in TASK_ERROR_FIELDS {
      if let Some(value) = task.field(field)
        && !value.is_null()
      {
        return Err(ApiError::TaskReport {
          href: task.href().unwrap_or("<unknown>").to_string(),
          field: field.to_string(),
          value: value.clone(),
        });
      }
    }
  }
  Ok(())
}
