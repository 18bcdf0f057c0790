use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur while talking to Pulp.
#[derive(Debug, Error)]
pub enum ApiError {
  /// A task did not reach a terminal state within the poll budget.
  #[error("task {href} is ongoing after {limit} polls")]
  TimedOut { href: String, limit: u32 },

  /// Transport-level failure.
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// The server answered with a 4xx or 5xx status.
  #[error("{method} {url} returned {status}")]
  Status {
    method: String,
    url: String,
    status: StatusCode,
  },

  #[error("invalid url: {0}")]
  Url(#[from] url::ParseError),

  /// A response body could not be decoded as the expected JSON.
  #[error("failed to decode response from {url}: {source}")]
  Decode {
    url: String,
    #[source]
    source: serde_json::Error,
  },

  /// A call report carries a non-null `error`.
  #[error("a call report contains an error: {error}")]
  CallReport { error: serde_json::Value },

  /// A finished task carries a non-null `error`, `exception` or `traceback`.
  #[error("task report {href} contains a {field}: {value}")]
  TaskReport {
    href: String,
    field: String,
    value: serde_json::Value,
  },

  #[error(transparent)]
  Config(#[from] pulp_smash_config::ConfigError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}
