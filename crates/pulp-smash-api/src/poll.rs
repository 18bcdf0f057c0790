//! Waiting for spawned tasks.
//!
//! A task is polled until it reaches a terminal state; its terminal state is
//! yielded and the tasks it spawned are polled next, before any sibling.
//! Walking a call report therefore yields a pre-order traversal of the spawn
//! tree, one root task at a time:
//!
//! ```text
//! root ─┬─ A ── A1        yields: root, A, A1, B
//!       └─ B
//! ```

use std::time::Duration;

use futures::Stream;
use tracing::{debug, instrument, warn};

use crate::error::ApiError;
use crate::fetch::TaskFetcher;
use crate::task::{CallReport, TaskRef, TaskState};

/// How long to keep polling a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
  /// Fetches allowed per task before giving up.
  pub limit: u32,
  /// Pause between two fetches of the same task.
  pub interval: Duration,
}

impl PollPolicy {
  pub const DEFAULT_LIMIT: u32 = 24;
  pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

  pub fn new(limit: u32, interval: Duration) -> Self {
    Self { limit, interval }
  }
}

impl Default for PollPolicy {
  fn default() -> Self {
    Self::new(Self::DEFAULT_LIMIT, Self::DEFAULT_INTERVAL)
  }
}

/// Walks a spawn tree, producing one terminal task state per step.
///
/// Nothing is fetched until [`TaskPoller::next`] is called. After an error
/// the poller is exhausted.
pub struct TaskPoller<'a, F: TaskFetcher + ?Sized> {
  fetcher: &'a F,
  policy: PollPolicy,
  /// Tasks still to be polled; the next one is at the end.
  pending: Vec<TaskRef>,
}

impl<'a, F: TaskFetcher + ?Sized> TaskPoller<'a, F> {
  /// Poll a single task and everything it spawns.
  pub fn for_task(fetcher: &'a F, task: TaskRef, policy: PollPolicy) -> Self {
    Self {
      fetcher,
      policy,
      pending: vec![task],
    }
  }

  /// Poll every task listed in a call report, in order.
  pub fn for_call_report(fetcher: &'a F, report: &CallReport, policy: PollPolicy) -> Self {
    Self {
      fetcher,
      policy,
      pending: report.spawned_tasks.iter().rev().cloned().collect(),
    }
  }

  pub fn policy(&self) -> PollPolicy {
    self.policy
  }

  /// Wait for the next task to finish and return its terminal state.
  ///
  /// Returns `None` once every task in the tree has been yielded.
  pub async fn next(&mut self) -> Option<Result<TaskState, ApiError>> {
    let task = self.pending.pop()?;
    match self.wait_for(&task).await {
      Ok(state) => {
        self
          .pending
          .extend(state.spawned_tasks.iter().rev().cloned());
        Some(Ok(state))
      }
      Err(e) => {
        self.pending.clear();
        Some(Err(e))
      }
    }
  }

  /// Drain the poller, stopping at the first error.
  pub async fn collect_all(mut self) -> Result<Vec<TaskState>, ApiError> {
    let mut states = Vec::new();
    while let Some(state) = self.next().await {
      states.push(state?);
    }
    Ok(states)
  }

  pub fn into_stream(self) -> impl Stream<Item = Result<TaskState, ApiError>> + 'a {
    futures::stream::unfold(self, |mut poller| async move {
      let item = poller.next().await?;
      Some((item, poller))
    })
  }

  #[instrument(name = "poll_task", skip(self, task), fields(href = %task.href))]
  async fn wait_for(&self, task: &TaskRef) -> Result<TaskState, ApiError> {
    let mut attempts: u32 = 0;
    loop {
      let state = self.fetcher.fetch(task).await?;
      attempts += 1;

      debug!(attempt = attempts, state = %state.state, "task_polled");

      if state.is_terminal() {
        return Ok(state);
      }

      if attempts >= self.policy.limit {
        warn!(attempts = attempts, state = %state.state, "task_poll_timed_out");
        return Err(ApiError::TimedOut {
          href: task.href.clone(),
          limit: self.policy.limit,
        });
      }

      tokio::time::sleep(self.policy.interval).await;
    }
  }
}

/// Lazily yield the terminal state of `task` and of every task it spawns.
pub fn poll_task<'a, F: TaskFetcher + ?Sized>(
  fetcher: &'a F,
  task: TaskRef,
  policy: PollPolicy,
) -> impl Stream<Item = Result<TaskState, ApiError>> + 'a {
  TaskPoller::for_task(fetcher, task, policy).into_stream()
}

/// Lazily yield the terminal state of every task spawned by a call report.
pub fn poll_spawned_tasks<'a, F: TaskFetcher + ?Sized>(
  fetcher: &'a F,
  report: &CallReport,
  policy: PollPolicy,
) -> impl Stream<Item = Result<TaskState, ApiError>> + use<'a, F> {
  TaskPoller::for_call_report(fetcher, report, policy).into_stream()
}
