//! Poller behaviour against a scripted in-memory fetcher.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use pulp_smash_api::{
  ApiError, CallReport, PollPolicy, TaskFetcher, TaskPoller, TaskRef, TaskState, TaskStatus,
  poll_spawned_tasks, poll_task,
};
use reqwest::StatusCode;
use serde_json::json;

/// One scripted answer for a task.
#[derive(Clone)]
enum Step {
  State(TaskState),
  Fail,
}

/// Replays scripted task states. The last step of a script repeats forever.
#[derive(Default)]
struct ScriptedFetcher {
  scripts: Mutex<HashMap<String, VecDeque<Step>>>,
  fetches: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
  fn script(self, href: &str, steps: Vec<Step>) -> Self {
    self
      .scripts
      .lock()
      .unwrap()
      .insert(href.to_string(), steps.into());
    self
  }

  fn fetches(&self) -> Vec<String> {
    self.fetches.lock().unwrap().clone()
  }

  fn fetch_count(&self, href: &str) -> usize {
    self.fetches().iter().filter(|h| *h == href).count()
  }
}

#[async_trait]
impl TaskFetcher for ScriptedFetcher {
  async fn fetch(&self, task: &TaskRef) -> Result<TaskState, ApiError> {
    self.fetches.lock().unwrap().push(task.href.clone());

    let step = {
      let mut scripts = self.scripts.lock().unwrap();
      let script = scripts
        .get_mut(&task.href)
        .unwrap_or_else(|| panic!("no script for {}", task.href));
      if script.len() > 1 {
        script.pop_front().unwrap()
      } else {
        script.front().cloned().unwrap()
      }
    };

    match step {
      Step::State(state) => Ok(state),
      Step::Fail => Err(ApiError::Status {
        method: "GET".to_string(),
        url: task.href.clone(),
        status: StatusCode::NOT_FOUND,
      }),
    }
  }
}

fn state(status: &str, href: &str) -> Step {
  Step::State(TaskState::new(status).with_field("_href", json!(href)))
}

fn finished(href: &str, children: &[&str]) -> Step {
  Step::State(
    TaskState::new("finished")
      .with_field("_href", json!(href))
      .with_children(children.iter().map(|c| TaskRef::new(*c)).collect()),
  )
}

fn hrefs(states: &[TaskState]) -> Vec<&str> {
  states.iter().map(|s| s.href().unwrap()).collect()
}

fn report(hrefs: &[&str]) -> CallReport {
  CallReport::new(hrefs.iter().map(|h| TaskRef::new(*h)).collect())
}

#[tokio::test]
async fn test_empty_call_report_yields_nothing() {
  let fetcher = ScriptedFetcher::default();

  let states: Vec<TaskState> = poll_spawned_tasks(&fetcher, &CallReport::default(), PollPolicy::default())
    .try_collect()
    .await
    .unwrap();

  assert!(states.is_empty());
  assert!(fetcher.fetches().is_empty());
}

#[tokio::test]
async fn test_terminal_on_first_fetch() {
  let fetcher = ScriptedFetcher::default().script("/t/1/", vec![finished("/t/1/", &[])]);

  let states: Vec<TaskState> = poll_task(&fetcher, TaskRef::new("/t/1/"), PollPolicy::default())
    .try_collect()
    .await
    .unwrap();

  assert_eq!(hrefs(&states), vec!["/t/1/"]);
  assert_eq!(fetcher.fetch_count("/t/1/"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_waits_between_non_terminal_fetches() {
  let fetcher = ScriptedFetcher::default().script(
    "/t/1/",
    vec![
      state("waiting", "/t/1/"),
      state("running", "/t/1/"),
      state("running", "/t/1/"),
      finished("/t/1/", &["/t/2/"]),
    ],
  )
  .script("/t/2/", vec![state("skipped", "/t/2/")]);

  let started = tokio::time::Instant::now();
  let states = TaskPoller::for_task(&fetcher, TaskRef::new("/t/1/"), PollPolicy::default())
    .collect_all()
    .await
    .unwrap();
  let elapsed = started.elapsed();

  assert_eq!(hrefs(&states), vec!["/t/1/", "/t/2/"]);
  assert_eq!(states[1].state, TaskStatus::Skipped);
  assert_eq!(fetcher.fetch_count("/t/1/"), 4);
  assert_eq!(fetcher.fetch_count("/t/2/"), 1);

  // Three sleeps of five seconds each.
  assert!(elapsed >= Duration::from_secs(15), "elapsed {:?}", elapsed);
  assert!(elapsed < Duration::from_secs(20), "elapsed {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_times_out_after_limit_fetches() {
  let fetcher = ScriptedFetcher::default().script("/t/stuck/", vec![state("running", "/t/stuck/")]);

  let result = TaskPoller::for_task(&fetcher, TaskRef::new("/t/stuck/"), PollPolicy::default())
    .collect_all()
    .await;

  match result {
    Err(ApiError::TimedOut { href, limit }) => {
      assert_eq!(href, "/t/stuck/");
      assert_eq!(limit, 24);
    }
    other => panic!("expected a time-out, got {:?}", other),
  }
  assert_eq!(fetcher.fetch_count("/t/stuck/"), 24);
}

#[tokio::test]
async fn test_custom_policy_limit() {
  let fetcher = ScriptedFetcher::default().script("/t/stuck/", vec![state("waiting", "/t/stuck/")]);
  let policy = PollPolicy::new(3, Duration::ZERO);

  let err = TaskPoller::for_task(&fetcher, TaskRef::new("/t/stuck/"), policy)
    .collect_all()
    .await
    .unwrap_err();

  assert_eq!(err.to_string(), "task /t/stuck/ is ongoing after 3 polls");
  assert_eq!(fetcher.fetch_count("/t/stuck/"), 3);
}

#[tokio::test]
async fn test_spawn_tree_is_yielded_in_pre_order() {
  let fetcher = ScriptedFetcher::default()
    .script("/root/", vec![finished("/root/", &["/a/", "/b/"])])
    .script("/a/", vec![finished("/a/", &["/a1/"])])
    .script("/a1/", vec![finished("/a1/", &[])])
    .script("/b/", vec![finished("/b/", &[])]);

  let states: Vec<TaskState> = poll_spawned_tasks(&fetcher, &report(&["/root/"]), PollPolicy::default())
    .try_collect()
    .await
    .unwrap();

  assert_eq!(hrefs(&states), vec!["/root/", "/a/", "/a1/", "/b/"]);
}

#[tokio::test]
async fn test_root_tasks_are_polled_one_at_a_time() {
  let fetcher = ScriptedFetcher::default()
    .script("/one/", vec![finished("/one/", &["/one-child/"])])
    .script("/one-child/", vec![finished("/one-child/", &[])])
    .script("/two/", vec![state("canceled", "/two/")]);

  let states: Vec<TaskState> =
    poll_spawned_tasks(&fetcher, &report(&["/one/", "/two/"]), PollPolicy::default())
      .try_collect()
      .await
      .unwrap();

  assert_eq!(hrefs(&states), vec!["/one/", "/one-child/", "/two/"]);
  assert_eq!(fetcher.fetches(), vec!["/one/", "/one-child/", "/two/"]);
}

#[tokio::test]
async fn test_polling_is_lazy() {
  let fetcher = ScriptedFetcher::default()
    .script("/one/", vec![finished("/one/", &[])])
    .script("/two/", vec![finished("/two/", &[])]);

  let mut stream = Box::pin(poll_spawned_tasks(
    &fetcher,
    &report(&["/one/", "/two/"]),
    PollPolicy::default(),
  ));
  assert!(fetcher.fetches().is_empty());

  let first = stream.next().await.unwrap().unwrap();
  assert_eq!(first.href(), Some("/one/"));
  assert_eq!(fetcher.fetches(), vec!["/one/"]);

  let second = stream.next().await.unwrap().unwrap();
  assert_eq!(second.href(), Some("/two/"));
  assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_fetch_error_ends_the_stream() {
  let fetcher = ScriptedFetcher::default()
    .script("/one/", vec![Step::Fail])
    .script("/two/", vec![finished("/two/", &[])]);

  let mut stream = Box::pin(poll_spawned_tasks(
    &fetcher,
    &report(&["/one/", "/two/"]),
    PollPolicy::default(),
  ));

  match stream.next().await {
    Some(Err(ApiError::Status { status, .. })) => assert_eq!(status, StatusCode::NOT_FOUND),
    other => panic!("expected the fetch error, got {:?}", other.map(|r| r.map(|s| s.state))),
  }
  assert!(stream.next().await.is_none());
  assert_eq!(fetcher.fetch_count("/one/"), 1);
  assert_eq!(fetcher.fetch_count("/two/"), 0);
}

#[tokio::test]
async fn test_error_state_is_terminal_and_passed_through() {
  let fetcher = ScriptedFetcher::default().script(
    "/t/1/",
    vec![Step::State(
      TaskState::new("error")
        .with_field("_href", json!("/t/1/"))
        .with_field("error", json!({ "description": "boom" })),
    )],
  );

  let states = TaskPoller::for_task(&fetcher, TaskRef::new("/t/1/"), PollPolicy::default())
    .collect_all()
    .await
    .unwrap();

  assert_eq!(states.len(), 1);
  assert_eq!(states[0].field("error"), Some(&json!({ "description": "boom" })));
}
