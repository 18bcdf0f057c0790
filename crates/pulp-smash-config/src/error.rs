use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// No settings file exists at any of the searched locations.
  #[error("no settings file found, searched: {}", display_paths(.searched))]
  FileNotFound { searched: Vec<PathBuf> },

  /// The settings file has no section with the requested name.
  #[error("settings file {path} has no section named '{section}'")]
  SectionNotFound { path: PathBuf, section: String },

  /// The configuration is syntactically fine but semantically invalid.
  #[error("configuration is invalid: {0}")]
  Validation(String),

  /// A version string could not be parsed.
  #[error("invalid version '{value}'")]
  InvalidVersion { value: String },

  /// No home or config directory could be determined.
  #[error("could not determine the user configuration directory")]
  NoConfigDir,

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

fn display_paths(paths: &[PathBuf]) -> String {
  paths
    .iter()
    .map(|p| p.display().to_string())
    .collect::<Vec<_>>()
    .join(", ")
}
