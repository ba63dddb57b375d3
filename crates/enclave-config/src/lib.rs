//! Enclave Config - layered configuration.
//!
//! Sources, lowest to highest precedence:
//! 1. Embedded defaults (`defaults.toml`)
//! 2. User file: `$ENCLAVE_HOME/config.toml` (default `~/.enclave/config.toml`)
//! 3. An explicitly requested file
//! 4. `ENCLAVE_*` environment variables, only for fields no file set
//!
//! # Example
//!
//! ```rust,no_run
//! let loaded = enclave_config::load(None, None).unwrap();
//! println!("workspaces live in {}", loaded.workspace_base_dir().display());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod env;
mod error;
mod loader;
mod merge;
mod types;
mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{LoadedConfig, load, load_file, load_with_env};
pub use merge::{ConfigLayer, FieldSources};
pub use types::{
    AuditSection, Config, DEFAULT_MAX_FILE_SIZE, FilesSection, LoggingSection, TraversalSection,
    WorkspaceOverride, WorkspacesSection,
};
pub use validate::validate;
