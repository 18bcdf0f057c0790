use thiserror::Error;

/// Errors that can occur while building a bug table.
#[derive(Debug, Error)]
pub enum SelectorError {
  /// A bug carries a status with no known meaning.
  #[error("unknown bug status '{status}'")]
  UnknownStatus { status: String },

  #[error("invalid target platform release '{value}'")]
  InvalidVersion { value: String },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}
