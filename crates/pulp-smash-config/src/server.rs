use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;
use crate::version::Version;

/// How to verify the server's TLS certificate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Verify {
  /// Verify against the system roots (`true`) or not at all (`false`).
  Enabled(bool),
  /// Verify against the PEM bundle at this path.
  CaBundle(PathBuf),
}

impl Default for Verify {
  fn default() -> Self {
    Verify::Enabled(true)
  }
}

/// Facts about a single Pulp server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
  /// Scheme, host and optional port, e.g. `https://pulp.example.com:8443`.
  pub base_url: Url,

  /// HTTP basic credentials as `(username, password)`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub auth: Option<(String, String)>,

  #[serde(default)]
  pub verify: Verify,

  /// Version of Pulp running on the server.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub version: Option<Version>,
}

impl ServerConfig {
  pub fn new(base_url: Url) -> Self {
    Self {
      base_url,
      auth: None,
      verify: Verify::default(),
      version: None,
    }
  }

  pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
    self.auth = Some((username.into(), password.into()));
    self
  }

  pub fn with_verify(mut self, verify: Verify) -> Self {
    self.verify = verify;
    self
  }

  pub fn with_version(mut self, version: Version) -> Self {
    self.version = Some(version);
    self
  }

  /// Check the configuration for values that cannot work.
  ///
  /// The base URL must be an http(s) URL naming a host and nothing beyond
  /// it. Hrefs returned by Pulp are absolute paths, so a base path would be
  /// silently discarded when joining them.
  pub fn validate(&self) -> Result<(), ConfigError> {
    match self.base_url.scheme() {
      "http" | "https" => {}
      other => {
        return Err(ConfigError::Validation(format!(
          "base_url scheme must be http or https, got '{}'",
          other
        )));
      }
    }

    if self.base_url.host_str().is_none_or(|h| h.is_empty()) {
      return Err(ConfigError::Validation(format!(
        "base_url '{}' has no host",
        self.base_url
      )));
    }

    if self.base_url.path() != "/" || self.base_url.query().is_some() {
      return Err(ConfigError::Validation(format!(
        "base_url '{}' must not carry a path or query",
        self.base_url
      )));
    }

    if let Some((username, _)) = &self.auth
      && username.is_empty()
    {
      return Err(ConfigError::Validation(
        "auth username must not be empty".to_string(),
      ));
    }

    if let Verify::CaBundle(path) = &self.verify
      && !path.is_file()
    {
      return Err(ConfigError::Validation(format!(
        "CA bundle '{}' does not exist",
        path.display()
      )));
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn config(url: &str) -> ServerConfig {
    ServerConfig::new(Url::parse(url).unwrap())
  }

  #[test]
  fn test_deserialize_full_section() {
    let value = json!({
      "base_url": "https://pulp.example.com:8443",
      "auth": ["admin", "hackme"],
      "verify": false,
      "version": "2.13"
    });

    let cfg: ServerConfig = serde_json::from_value(value).unwrap();
    assert_eq!(cfg.base_url.port(), Some(8443));
    assert_eq!(cfg.auth, Some(("admin".to_string(), "hackme".to_string())));
    assert_eq!(cfg.verify, Verify::Enabled(false));
    assert_eq!(cfg.version, Some("2.13".parse().unwrap()));
  }

  #[test]
  fn test_defaults() {
    let cfg: ServerConfig =
      serde_json::from_value(json!({ "base_url": "http://localhost" })).unwrap();
    assert_eq!(cfg.auth, None);
    assert_eq!(cfg.verify, Verify::Enabled(true));
    assert_eq!(cfg.version, None);
  }

  #[test]
  fn test_verify_ca_bundle() {
    let cfg: ServerConfig = serde_json::from_value(json!({
      "base_url": "https://pulp.example.com",
      "verify": "/etc/pki/ca.pem"
    }))
    .unwrap();
    assert_eq!(cfg.verify, Verify::CaBundle(PathBuf::from("/etc/pki/ca.pem")));
  }

  #[test]
  fn test_validate_ok() {
    let cfg = config("https://pulp.example.com").with_auth("admin", "admin");
    assert!(cfg.validate().is_ok());
  }

  #[test]
  fn test_validate_rejects_path() {
    let err = config("https://pulp.example.com/pulp/api/v2/")
      .validate()
      .unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)));
  }

  #[test]
  fn test_validate_rejects_scheme() {
    assert!(config("ftp://pulp.example.com").validate().is_err());
  }

  #[test]
  fn test_validate_rejects_empty_username() {
    let cfg = config("http://localhost").with_auth("", "secret");
    assert!(cfg.validate().is_err());
  }

  #[test]
  fn test_validate_rejects_missing_ca_bundle() {
    let cfg = config("https://localhost").with_verify(Verify::CaBundle(PathBuf::from(
      "/nonexistent/ca-bundle.pem",
    )));
    assert!(cfg.validate().is_err());
  }
}
