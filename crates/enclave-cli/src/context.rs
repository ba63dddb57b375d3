//! Wiring from loaded configuration to a workspace registry.

use std::sync::Arc;

use anyhow::Context as _;
use enclave_audit::OperationLog;
use enclave_config::LoadedConfig;
use enclave_core::CallerId;
use enclave_telemetry::LogConfig;
use enclave_workspace::{WorkspaceManager, WorkspaceRegistry, WorkspaceSettings};

use crate::formatter::OutputFormat;

/// Everything a command needs.
pub(crate) struct Context {
    pub(crate) loaded: LoadedConfig,
    pub(crate) registry: WorkspaceRegistry,
    pub(crate) workspace: String,
    pub(crate) caller: Option<CallerId>,
    pub(crate) format: OutputFormat,
    pub(crate) persistent_log: bool,
}

impl Context {
    /// Build the operation log and registry described by `loaded`.
    pub(crate) fn build(
        loaded: LoadedConfig,
        workspace: String,
        caller: Option<String>,
        format: OutputFormat,
    ) -> anyhow::Result<Self> {
        let max_entries = loaded.config.audit.max_entries;
        let (log, persistent_log) = match loaded.audit_log_path() {
            Some(path) => {
                let log = OperationLog::open(&path, max_entries).with_context(|| {
                    format!("failed to open operation log at {}", path.display())
                })?;
                (log, true)
            },
            None => (OperationLog::in_memory(max_entries), false),
        };

        let base_dir = loaded.workspace_base_dir();
        let registry = WorkspaceRegistry::new(
            &base_dir,
            WorkspaceSettings::from_config(&loaded.config),
            Arc::new(log),
        )
        .with_context(|| format!("failed to open workspace base {}", base_dir.display()))?;

        Ok(Self {
            loaded,
            registry,
            workspace,
            caller: caller.map(CallerId::new),
            format,
            persistent_log,
        })
    }

    /// The workspace selected with `--workspace`.
    pub(crate) fn workspace(&self) -> anyhow::Result<Arc<WorkspaceManager>> {
        self.registry
            .open(&self.workspace)
            .with_context(|| format!("cannot open workspace '{}'", self.workspace))
    }

    /// Caller for request builders.
    pub(crate) fn caller(&self) -> Option<CallerId> {
        self.caller.clone()
    }
}

/// Logging settings from the `[logging]` section, with `--verbose` forcing
/// debug output.
pub(crate) fn log_config(loaded: Option<&LoadedConfig>, verbose: bool) -> LogConfig {
    let mut config = loaded
        .and_then(|l| LogConfig::try_from(&l.config.logging).ok())
        .unwrap_or_default();
    if verbose {
        "debug".clone_into(&mut config.level);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_overrides_level() {
        let config = log_config(None, true);
        assert_eq!(config.level, "debug");
        let config = log_config(None, false);
        assert_ne!(config.level, "debug");
    }

    #[test]
    fn test_build_opens_persistent_log_under_home() {
        let home = tempfile::tempdir().unwrap();
        let loaded = enclave_config::load_with_env(
            None,
            Some(home.path()),
            &std::collections::HashMap::<String, String>::new(),
        )
        .unwrap();
        let ctx = Context::build(loaded, "default".into(), Some("me".into()), OutputFormat::Pretty)
            .unwrap();
        assert!(ctx.persistent_log);
        assert!(home.path().join("operations.jsonl").exists());
        assert!(ctx.registry.base_dir().ends_with("workspaces"));
        assert_eq!(ctx.caller().unwrap().as_str(), "me");
    }
}
