//! Pulp Smash API
//!
//! A client for Pulp's REST API and the machinery for waiting on the
//! asynchronous work it triggers.
//!
//! Pulp answers long-running requests with HTTP 202 and a *call report*
//! naming the tasks it spawned. Those tasks may spawn further tasks. The
//! [`TaskPoller`] walks that spawn tree, waiting for every task to reach a
//! terminal state, and yields the terminal states in pre-order. The
//! [`Client`] uses it to turn "fire and forget" calls into calls that return
//! once all triggered work is done.

mod check;
mod client;
mod error;
mod fetch;
mod poll;
mod task;

pub use check::{check_call_report, check_tasks};
pub use client::{Client, Response, ResponseHandler};
pub use error::ApiError;
pub use fetch::TaskFetcher;
pub use poll::{PollPolicy, TaskPoller, poll_spawned_tasks, poll_task};
pub use task::{CallReport, TaskRef, TaskState, TaskStatus};
