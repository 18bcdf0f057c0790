//! Pulp Smash Config
//!
//! Facts about the Pulp server under test: where it lives, how to
//! authenticate against it, whether to verify its TLS certificate and which
//! Pulp version it runs.
//!
//! Configuration is stored in a JSON settings file made of named sections:
//!
//! ```json
//! {
//!   "default": {
//!     "base_url": "https://pulp.example.com",
//!     "auth": ["admin", "admin"],
//!     "verify": false,
//!     "version": "2.13"
//!   }
//! }
//! ```
//!
//! The file is searched for in the XDG configuration directories (see
//! [`SettingsFile::locate`]).

mod error;
mod server;
mod settings;
mod version;

pub use error::ConfigError;
pub use server::{ServerConfig, Verify};
pub use settings::{CONFIG_DIR, CONFIG_FILE, CONFIG_FILE_ENV, DEFAULT_SECTION, SettingsFile};
pub use version::Version;
