use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tokio::fs;
use tracing::debug;

use crate::error::ConfigError;
use crate::server::ServerConfig;

/// Directory appended to each XDG configuration directory.
pub const CONFIG_DIR: &str = "pulp_smash";

/// Name of the settings file inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "settings.json";

/// Environment variable naming an explicit settings file, bypassing the search.
pub const CONFIG_FILE_ENV: &str = "PULP_SMASH_CONFIG_FILE";

/// Section used when none is given.
pub const DEFAULT_SECTION: &str = "default";

/// A JSON settings file made of named [`ServerConfig`] sections.
#[derive(Debug, Clone)]
pub struct SettingsFile {
  path: PathBuf,
}

impl SettingsFile {
  /// Use the settings file at `path`, whether or not it exists yet.
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  /// Find an existing settings file.
  ///
  /// Returns the first file that exists among [`SettingsFile::search_paths`].
  pub fn locate() -> Result<Self, ConfigError> {
    let searched = Self::search_paths();
    match searched.iter().find(|p| p.is_file()) {
      Some(path) => {
        debug!(path = %path.display(), "settings_file_located");
        Ok(Self::new(path.clone()))
      }
      None => Err(ConfigError::FileNotFound { searched }),
    }
  }

  /// Candidate settings file locations, most preferred first.
  ///
  /// If `PULP_SMASH_CONFIG_FILE` is set, it is the only candidate. Otherwise
  /// the candidates are `$XDG_CONFIG_HOME` followed by each entry of
  /// `$XDG_CONFIG_DIRS` (default `/etc/xdg`), each suffixed with
  /// `pulp_smash/settings.json`.
  pub fn search_paths() -> Vec<PathBuf> {
    if let Some(explicit) = std::env::var_os(CONFIG_FILE_ENV) {
      return vec![PathBuf::from(explicit)];
    }

    let mut dirs: Vec<PathBuf> = Vec::new();
    if let Some(home) = config_home() {
      dirs.push(home);
    }

    let system = std::env::var("XDG_CONFIG_DIRS")
      .ok()
      .filter(|v| !v.is_empty())
      .unwrap_or_else(|| "/etc/xdg".to_string());
    dirs.extend(
      system
        .split(':')
        .filter(|d| !d.is_empty())
        .map(PathBuf::from),
    );

    dirs
      .into_iter()
      .map(|d| d.join(CONFIG_DIR).join(CONFIG_FILE))
      .collect()
  }

  /// Where a new settings file should be written.
  pub fn save_path() -> Result<PathBuf, ConfigError> {
    if let Some(explicit) = std::env::var_os(CONFIG_FILE_ENV) {
      return Ok(PathBuf::from(explicit));
    }
    config_home()
      .map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
      .ok_or(ConfigError::NoConfigDir)
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Names of all sections in the file.
  pub async fn sections(&self) -> Result<Vec<String>, ConfigError> {
    let doc = self.load().await?;
    Ok(doc.keys().cloned().collect())
  }

  /// Read one section.
  pub async fn read(&self, section: &str) -> Result<ServerConfig, ConfigError> {
    let mut doc = self.load().await?;
    let value = doc
      .remove(section)
      .ok_or_else(|| ConfigError::SectionNotFound {
        path: self.path.clone(),
        section: section.to_string(),
      })?;
    Ok(serde_json::from_value(value)?)
  }

  /// Create or replace a section, creating the file and its parent
  /// directories as needed.
  pub async fn save(&self, section: &str, config: &ServerConfig) -> Result<(), ConfigError> {
    let mut doc = match self.load().await {
      Ok(doc) => doc,
      Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
      Err(e) => return Err(e),
    };
    doc.insert(section.to_string(), serde_json::to_value(config)?);

    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent).await?;
    }
    self.store(&doc).await?;

    debug!(path = %self.path.display(), section = %section, "settings_section_saved");
    Ok(())
  }

  /// Remove a section.
  pub async fn delete(&self, section: &str) -> Result<(), ConfigError> {
    let mut doc = self.load().await?;
    if doc.remove(section).is_none() {
      return Err(ConfigError::SectionNotFound {
        path: self.path.clone(),
        section: section.to_string(),
      });
    }
    self.store(&doc).await
  }

  async fn load(&self) -> Result<Map<String, Value>, ConfigError> {
    let content = fs::read_to_string(&self.path).await?;
    Ok(serde_json::from_str(&content)?)
  }

  async fn store(&self, doc: &Map<String, Value>) -> Result<(), ConfigError> {
    let content = serde_json::to_string_pretty(doc)?;
    fs::write(&self.path, content).await?;
    Ok(())
  }
}

fn config_home() -> Option<PathBuf> {
  std::env::var_os("XDG_CONFIG_HOME")
    .filter(|v| !v.is_empty())
    .map(PathBuf::from)
    .or_else(dirs::config_dir)
}
