//! Pulp Smash Selectors
//!
//! Decide whether a test should run against the Pulp version under test.
//!
//! Known bugs are described by a [`BugTable`], an explicit mapping from
//! issue id to status and target platform release, usually loaded from a
//! JSON file:
//!
//! ```json
//! {
//!   "1356": { "status": "MODIFIED", "target_platform_release": "2.8.1" },
//!   "2277": { "status": "NEW" }
//! }
//! ```

mod bug;
mod error;
mod select;

pub use bug::{Bug, BugStatus, BugTable};
pub use error::SelectorError;
pub use select::{Skip, bug_is_fixed, bug_is_untestable, require};
