//! Pulp release versions.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConfigError;

/// A dotted numeric release version such as `2.8.1`.
///
/// Trailing zero components are insignificant, so `2.8` and `2.8.0` compare
/// equal. The empty string parses as version `0`, which sorts before every
/// real release.
#[derive(Debug, Clone)]
pub struct Version {
  parts: Vec<u64>,
}

impl Version {
  /// Build a version from its numeric components.
  pub fn new(parts: impl Into<Vec<u64>>) -> Self {
    let mut parts = parts.into();
    if parts.is_empty() {
      parts.push(0);
    }
    Self { parts }
  }

  /// The numeric components, as written.
  pub fn parts(&self) -> &[u64] {
    &self.parts
  }

  /// Major release number.
  pub fn major(&self) -> u64 {
    self.parts[0]
  }
}

impl Default for Version {
  fn default() -> Self {
    Self::new(vec![0])
  }
}

impl FromStr for Version {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
      return Ok(Self::new(vec![0]));
    }

    let parts = trimmed
      .split('.')
      .map(|part| part.parse::<u64>())
      .collect::<Result<Vec<_>, _>>()
      .map_err(|_| ConfigError::InvalidVersion {
        value: s.to_string(),
      })?;

    Ok(Self::new(parts))
  }
}

impl fmt::Display for Version {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let rendered: Vec<String> = self.parts.iter().map(|p| p.to_string()).collect();
    write!(f, "{}", rendered.join("."))
  }
}

impl Ord for Version {
  fn cmp(&self, other: &Self) -> Ordering {
    let len = self.parts.len().max(other.parts.len());
    for i in 0..len {
      let a = self.parts.get(i).copied().unwrap_or(0);
      let b = other.parts.get(i).copied().unwrap_or(0);
      match a.cmp(&b) {
        Ordering::Equal => continue,
        unequal => return unequal,
      }
    }
    Ordering::Equal
  }
}

impl PartialOrd for Version {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl PartialEq for Version {
  fn eq(&self, other: &Self) -> bool {
    self.cmp(other) == Ordering::Equal
  }
}

impl Eq for Version {}

impl Serialize for Version {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for Version {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
  }
}
