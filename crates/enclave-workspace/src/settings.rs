//! Policy and traversal settings shared by all workspaces of a registry.

use std::collections::HashMap;

use enclave_config::{Config, FilesSection};
use enclave_vfs::AccessPolicy;

/// Default recursion limit for listing and search.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Per-registry settings with optional per-workspace policy overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceSettings {
    policy: AccessPolicy,
    overrides: HashMap<String, AccessPolicy>,
    max_depth: usize,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            policy: AccessPolicy::default(),
            overrides: HashMap::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl WorkspaceSettings {
    /// Build settings from a loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let overrides = config
            .overrides
            .keys()
            .map(|name| (name.clone(), policy_from(&config.files_for(name))))
            .collect();
        Self {
            policy: policy_from(&config.files),
            overrides,
            max_depth: config.traversal.max_depth,
        }
    }

    /// Replace the default policy.
    #[must_use]
    pub fn with_policy(mut self, policy: AccessPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use `policy` for the workspace named `name`.
    #[must_use]
    pub fn with_override(mut self, name: impl Into<String>, policy: AccessPolicy) -> Self {
        self.overrides.insert(name.into(), policy);
        self
    }

    /// Set the recursion limit.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth.max(1);
        self
    }

    /// Effective policy for `workspace`.
    #[must_use]
    pub fn policy_for(&self, workspace: &str) -> AccessPolicy {
        self.overrides
            .get(workspace)
            .unwrap_or(&self.policy)
            .clone()
    }

    /// Recursion limit for listing and search.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

fn policy_from(files: &FilesSection) -> AccessPolicy {
    AccessPolicy::new()
        .with_max_file_size(files.max_file_size)
        .with_allowed_extensions(&files.allowed_extensions)
        .with_create_parents(files.create_parents)
        .with_external_symlinks(files.follow_external_symlinks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use enclave_config::WorkspaceOverride;

    #[test]
    fn test_from_default_config() {
        let settings = WorkspaceSettings::from_config(&Config::default());
        assert_eq!(settings, WorkspaceSettings::default());
    }

    #[test]
    fn test_overrides_apply_per_workspace() {
        let mut config = Config::default();
        config.files.max_file_size = 4096;
        config.overrides.insert(
            "docs".into(),
            WorkspaceOverride {
                allowed_extensions: Some(vec!["md".into()]),
                ..Default::default()
            },
        );

        let settings = WorkspaceSettings::from_config(&config);
        let docs = settings.policy_for("docs");
        assert_eq!(docs.allowed_extensions(), [".md"]);
        assert_eq!(docs.max_file_size(), 4096);

        let other = settings.policy_for("scratch");
        assert!(other.allowed_extensions().is_empty());
    }
}
