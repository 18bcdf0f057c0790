//! Pulp Smash Diff
//!
//! Compares two trees of maps, lists and scalars and reports every place
//! they differ. The trees usually come from repository metadata (for example
//! `updateinfo.xml` as synced from upstream and as republished by Pulp), so
//! this crate also knows how to load XML, optionally gzipped, into the same
//! [`serde_json::Value`] shape.
//!
//! ```
//! use pulp_smash_diff::{Labels, RequiredFields, diff};
//! use serde_json::json;
//!
//! let synced = json!({ "id": "x", "name": "old" });
//! let published = json!({ "id": "x", "name": "new" });
//! let required = RequiredFields::new().with("", "id");
//!
//! let tree = diff(&synced, &published, &Labels::new("SYNCED", "PUBLISHED"), &required);
//! assert_eq!(tree, json!({
//!   "id": "x",
//!   "name": { "MISSING_IN_SYNCED": "new", "MISSING_IN_PUBLISHED": "old" }
//! }));
//! ```

mod diff;
mod error;
pub mod normalize;
pub mod xml;

pub use diff::{Labels, RequiredFields, diff, kind_name};
pub use error::XmlError;
