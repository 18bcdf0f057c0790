//! Skip decisions.

use std::fmt;

use pulp_smash_config::Version;
use tracing::warn;

use crate::bug::BugTable;

/// Whether the fix for bug `id` is present in `pulp_version`.
///
/// True when the bug is testable and its target platform release is no
/// newer than `pulp_version`. A bug missing from the table is assumed to
/// be fixed.
pub fn bug_is_fixed(table: &BugTable, id: u64, pulp_version: &Version) -> bool {
  match table.get(id) {
    Some(bug) => bug.status.is_testable() && bug.target_platform_release <= *pulp_version,
    None => {
      warn!(bug_id = id, "bug_not_in_table_assuming_fixed");
      true
    }
  }
}

pub fn bug_is_untestable(table: &BugTable, id: u64, pulp_version: &Version) -> bool {
  !bug_is_fixed(table, id, pulp_version)
}

/// Why a test was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skip {
  pub minimum: Version,
  pub actual: Version,
}

impl fmt::Display for Skip {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "this test requires Pulp {} or later, but Pulp {} is being tested",
      self.minimum, self.actual
    )
  }
}

/// Skip unless the Pulp version under test is at least `minimum`.
pub fn require(minimum: &Version, actual: &Version) -> Option<Skip> {
  (actual < minimum).then(|| Skip {
    minimum: minimum.clone(),
    actual: actual.clone(),
  })
}
