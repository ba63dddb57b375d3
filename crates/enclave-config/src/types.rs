//! Configuration types.
//!
//! This crate has no dependency on the other enclave crates; consumers
//! convert these sections into their own policy types at the boundary.
//! Every struct implements [`Default`] matching `defaults.toml` so a bare
//! `[section]` header produces a working configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where workspaces live.
    pub workspaces: WorkspacesSection,
    /// File size and type policy.
    pub files: FilesSection,
    /// Tree traversal limits.
    pub traversal: TraversalSection,
    /// Operation log retention and persistence.
    pub audit: AuditSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
    /// Per-workspace policy overrides keyed by workspace name.
    pub overrides: BTreeMap<String, WorkspaceOverride>,
}

impl Config {
    /// Workspace base directory, resolved against `home` when relative.
    #[must_use]
    pub fn workspace_base_dir(&self, home: &Path) -> PathBuf {
        resolve_against(home, &self.workspaces.base_dir)
    }

    /// Operation log file, resolved against `home` when relative.
    /// `None` when persistence is disabled.
    #[must_use]
    pub fn audit_log_path(&self, home: &Path) -> Option<PathBuf> {
        self.audit
            .persist
            .then(|| resolve_against(home, &self.audit.path))
    }

    /// Effective file policy for `workspace`, with any override applied.
    #[must_use]
    pub fn files_for(&self, workspace: &str) -> FilesSection {
        let mut files = self.files.clone();
        if let Some(o) = self.overrides.get(workspace) {
            if let Some(size) = o.max_file_size {
                files.max_file_size = size;
            }
            if let Some(exts) = &o.allowed_extensions {
                files.allowed_extensions.clone_from(exts);
            }
            if let Some(create) = o.create_parents {
                files.create_parents = create;
            }
        }
        files
    }
}

fn resolve_against(home: &Path, raw: &str) -> PathBuf {
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        path
    } else {
        home.join(path)
    }
}

/// `[workspaces]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspacesSection {
    /// Directory holding one subdirectory per workspace.
    pub base_dir: String,
}

impl Default for WorkspacesSection {
    fn default() -> Self {
        Self {
            base_dir: "workspaces".to_owned(),
        }
    }
}

/// Default maximum file size (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10_485_760;

/// `[files]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesSection {
    /// Maximum size in bytes of any written or appended file.
    pub max_file_size: u64,
    /// Extensions accepted for write/append; empty allows all.
    pub allowed_extensions: Vec<String>,
    /// Create missing parent directories on write.
    pub create_parents: bool,
    /// Allow symlinks resolving outside the workspace root.
    pub follow_external_symlinks: bool,
}

impl Default for FilesSection {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_extensions: Vec::new(),
            create_parents: true,
            follow_external_symlinks: false,
        }
    }
}

/// `[traversal]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalSection {
    /// Deepest level visited by recursive listing and search.
    pub max_depth: usize,
}

impl Default for TraversalSection {
    fn default() -> Self {
        Self { max_depth: 10 }
    }
}

/// `[audit]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSection {
    /// Entries retained (FIFO eviction).
    pub max_entries: usize,
    /// Persist entries as JSON lines.
    pub persist: bool,
    /// Log file path.
    pub path: String,
}

impl Default for AuditSection {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            persist: true,
            path: "operations.jsonl".to_owned(),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Level filter (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Output format (`pretty`, `compact`, `json`, `full`).
    pub format: String,
    /// Extra `EnvFilter` directives, e.g. `enclave_vfs=debug`.
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}

/// `[overrides.<workspace>]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceOverride {
    /// Replaces `files.max_file_size`.
    pub max_file_size: Option<u64>,
    /// Replaces `files.allowed_extensions`.
    pub allowed_extensions: Option<Vec<String>>,
    /// Replaces `files.create_parents`.
    pub create_parents: Option<bool>,
}
