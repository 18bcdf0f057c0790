use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::task::{TaskRef, TaskState};

/// Fetches the current state of a task.
///
/// Implementations are expected to be stateless lookups: fetching the same
/// reference twice simply re-reads the task. Errors are passed through the
/// poller untouched.
#[async_trait]
pub trait TaskFetcher: Send + Sync {
  async fn fetch(&self, task: &TaskRef) -> Result<TaskState, ApiError>;
}

#[async_trait]
impl<T: TaskFetcher + ?Sized> TaskFetcher for &T {
  async fn fetch(&self, task: &TaskRef) -> Result<TaskState, ApiError> {
    (**self).fetch(task).await
  }
}

#[async_trait]
impl<T: TaskFetcher + ?Sized> TaskFetcher for Arc<T> {
  async fn fetch(&self, task: &TaskRef) -> Result<TaskState, ApiError> {
    (**self).fetch(task).await
  }
}
