//! Operation identifiers recorded in the operation log.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A logical operation a caller can issue against a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Read file content.
    Read,
    /// Create or replace a file.
    Write,
    /// Append to an existing file.
    Append,
    /// Delete a file or directory.
    Delete,
    /// Move or rename an item.
    Move,
    /// Copy a file or directory tree.
    Copy,
    /// Create a directory.
    Mkdir,
    /// List a directory.
    List,
    /// Glob search.
    Find,
    /// Existence probe.
    Exists,
    /// Metadata lookup.
    Stat,
    /// Workspace-wide statistics.
    WorkspaceInfo,
    /// Empty directory cleanup.
    Cleanup,
    /// Workspace creation.
    CreateWorkspace,
    /// Workspace removal.
    DeleteWorkspace,
}

impl Operation {
    /// Stable snake-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Append => "append",
            Self::Delete => "delete",
            Self::Move => "move",
            Self::Copy => "copy",
            Self::Mkdir => "mkdir",
            Self::List => "list",
            Self::Find => "find",
            Self::Exists => "exists",
            Self::Stat => "stat",
            Self::WorkspaceInfo => "workspace_info",
            Self::Cleanup => "cleanup",
            Self::CreateWorkspace => "create_workspace",
            Self::DeleteWorkspace => "delete_workspace",
        }
    }

    /// Whether the operation can change filesystem state.
    #[must_use]
    pub fn is_mutating(self) -> bool {
        matches!(
            self,
            Self::Write
                | Self::Append
                | Self::Delete
                | Self::Move
                | Self::Copy
                | Self::Mkdir
                | Self::Cleanup
                | Self::CreateWorkspace
                | Self::DeleteWorkspace
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s {
            "read" => Self::Read,
            "write" => Self::Write,
            "append" => Self::Append,
            "delete" => Self::Delete,
            "move" => Self::Move,
            "copy" => Self::Copy,
            "mkdir" => Self::Mkdir,
            "list" => Self::List,
            "find" => Self::Find,
            "exists" => Self::Exists,
            "stat" => Self::Stat,
            "workspace_info" => Self::WorkspaceInfo,
            "cleanup" => Self::Cleanup,
            "create_workspace" => Self::CreateWorkspace,
            "delete_workspace" => Self::DeleteWorkspace,
            other => return Err(format!("unknown operation '{other}'")),
        };
        Ok(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_matches_serde_name() {
        for op in [Operation::Read, Operation::Mkdir, Operation::WorkspaceInfo] {
            let json = serde_json::to_string(&op).unwrap();
            assert_eq!(json.trim_matches('"'), op.as_str());
            assert_eq!(op.as_str().parse::<Operation>().unwrap(), op);
        }
        assert!("rename".parse::<Operation>().is_err());
    }

    #[test]
    fn test_mutating() {
        assert!(Operation::Write.is_mutating());
        assert!(!Operation::Find.is_mutating());
    }
}
