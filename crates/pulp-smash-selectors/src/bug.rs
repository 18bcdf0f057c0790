//! Bugs filed against Pulp and their workflow status.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use pulp_smash_config::Version;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SelectorError;

/// Status of a bug in the tracker, in workflow order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BugStatus {
  New,
  Assigned,
  Post,
  Modified,
  OnQa,
  Verified,
  ClosedComplete,
  ClosedCurrentRelease,
  ClosedDuplicate,
  ClosedNotABug,
  ClosedWontFix,
  ClosedWorksForMe,
}

impl BugStatus {
  pub const ALL: [BugStatus; 12] = [
    BugStatus::New,
    BugStatus::Assigned,
    BugStatus::Post,
    BugStatus::Modified,
    BugStatus::OnQa,
    BugStatus::Verified,
    BugStatus::ClosedComplete,
    BugStatus::ClosedCurrentRelease,
    BugStatus::ClosedDuplicate,
    BugStatus::ClosedNotABug,
    BugStatus::ClosedWontFix,
    BugStatus::ClosedWorksForMe,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      BugStatus::New => "NEW",
      BugStatus::Assigned => "ASSIGNED",
      BugStatus::Post => "POST",
      BugStatus::Modified => "MODIFIED",
      BugStatus::OnQa => "ON_QA",
      BugStatus::Verified => "VERIFIED",
      BugStatus::ClosedComplete => "CLOSED - COMPLETE",
      BugStatus::ClosedCurrentRelease => "CLOSED - CURRENTRELEASE",
      BugStatus::ClosedDuplicate => "CLOSED - DUPLICATE",
      BugStatus::ClosedNotABug => "CLOSED - NOTABUG",
      BugStatus::ClosedWontFix => "CLOSED - WONTFIX",
      BugStatus::ClosedWorksForMe => "CLOSED - WORKSFORME",
    }
  }

  /// Whether a fix has been accepted, so the affected code can be tested.
  pub fn is_testable(&self) -> bool {
    !matches!(
      self,
      BugStatus::New | BugStatus::Assigned | BugStatus::Post
    )
  }
}

impl FromStr for BugStatus {
  type Err = SelectorError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    BugStatus::ALL
      .into_iter()
      .find(|status| status.as_str() == s)
      .ok_or_else(|| SelectorError::UnknownStatus {
        status: s.to_string(),
      })
  }
}

impl TryFrom<String> for BugStatus {
  type Error = SelectorError;

  fn try_from(s: String) -> Result<Self, Self::Error> {
    s.parse()
  }
}

impl From<BugStatus> for String {
  fn from(status: BugStatus) -> Self {
    status.as_str().to_string()
  }
}

impl fmt::Display for BugStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// What is known about one bug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bug {
  pub status: BugStatus,

  /// First Pulp release carrying the fix. Unset means every release.
  #[serde(default)]
  pub target_platform_release: Version,
}

impl Bug {
  pub fn new(status: BugStatus, target_platform_release: Version) -> Self {
    Self {
      status,
      target_platform_release,
    }
  }

  /// Build a bug from the strings a tracker reports.
  pub fn parse(status: &str, target_platform_release: &str) -> Result<Self, SelectorError> {
    let release = target_platform_release
      .parse()
      .map_err(|_| SelectorError::InvalidVersion {
        value: target_platform_release.to_string(),
      })?;
    Ok(Self::new(status.parse()?, release))
  }
}

/// Known bugs, keyed by issue id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BugTable {
  bugs: BTreeMap<u64, Bug>,
}

impl BugTable {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, id: u64, bug: Bug) -> Option<Bug> {
    self.bugs.insert(id, bug)
  }

  pub fn with(mut self, id: u64, bug: Bug) -> Self {
    self.insert(id, bug);
    self
  }

  pub fn get(&self, id: u64) -> Option<&Bug> {
    self.bugs.get(&id)
  }

  pub fn len(&self) -> usize {
    self.bugs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bugs.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (u64, &Bug)> {
    self.bugs.iter().map(|(id, bug)| (*id, bug))
  }

  pub fn from_json_str(json: &str) -> Result<Self, SelectorError> {
    Ok(serde_json::from_str(json)?)
  }

  /// Load a table from a JSON file.
  pub async fn load(path: &Path) -> Result<Self, SelectorError> {
    let raw = tokio::fs::read_to_string(path).await?;
    let table = Self::from_json_str(&raw)?;
    debug!(path = %path.display(), bugs = table.len(), "bug_table_loaded");
    Ok(table)
  }
}
