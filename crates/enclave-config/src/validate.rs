//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Config, FilesSection};

/// Largest accepted `max_file_size` (1 GiB).
const MAX_FILE_SIZE_UPPER_BOUND: u64 = 1_073_741_824;

/// Largest accepted `traversal.max_depth`.
const MAX_DEPTH_UPPER_BOUND: usize = 256;

/// Largest accepted `audit.max_entries`.
const MAX_ENTRIES_UPPER_BOUND: usize = 10_000_000;

/// Validate a fully merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_files("files", &config.files)?;
    validate_traversal(config)?;
    validate_audit(config)?;
    validate_logging(config)?;
    validate_overrides(config)?;
    Ok(())
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn validate_files(prefix: &str, files: &FilesSection) -> ConfigResult<()> {
    validate_file_size(&format!("{prefix}.max_file_size"), files.max_file_size)?;
    validate_extensions(&format!("{prefix}.allowed_extensions"), &files.allowed_extensions)
}

fn validate_file_size(field: &str, size: u64) -> ConfigResult<()> {
    if size == 0 || size > MAX_FILE_SIZE_UPPER_BOUND {
        return Err(invalid(
            field,
            format!("must be between 1 and {MAX_FILE_SIZE_UPPER_BOUND} bytes"),
        ));
    }
    Ok(())
}

fn validate_extensions(field: &str, extensions: &[String]) -> ConfigResult<()> {
    for ext in extensions {
        let bare = ext.strip_prefix('.').unwrap_or(ext);
        if bare.is_empty() || bare.contains(['/', '\\', '.']) || bare.contains(char::is_whitespace)
        {
            return Err(invalid(
                field,
                format!("'{ext}' is not a valid extension; expected e.g. \".txt\""),
            ));
        }
    }
    Ok(())
}

fn validate_traversal(config: &Config) -> ConfigResult<()> {
    let depth = config.traversal.max_depth;
    if depth == 0 || depth > MAX_DEPTH_UPPER_BOUND {
        return Err(invalid(
            "traversal.max_depth",
            format!("must be between 1 and {MAX_DEPTH_UPPER_BOUND}"),
        ));
    }
    Ok(())
}

fn validate_audit(config: &Config) -> ConfigResult<()> {
    let a = &config.audit;
    if a.max_entries == 0 || a.max_entries > MAX_ENTRIES_UPPER_BOUND {
        return Err(invalid(
            "audit.max_entries",
            format!("must be between 1 and {MAX_ENTRIES_UPPER_BOUND}"),
        ));
    }
    if a.persist && a.path.trim().is_empty() {
        return Err(invalid("audit.path", "must be set when audit.persist is true"));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;
    if !matches!(l.level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported level '{}'; expected one of: trace, debug, info, warn, error",
                l.level
            ),
        ));
    }
    if !matches!(l.format.as_str(), "pretty" | "compact" | "json" | "full") {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported format '{}'; expected one of: pretty, compact, json, full",
                l.format
            ),
        ));
    }
    Ok(())
}

fn validate_overrides(config: &Config) -> ConfigResult<()> {
    for (name, o) in &config.overrides {
        let prefix = format!("overrides.{name}");
        if let Some(size) = o.max_file_size {
            validate_file_size(&format!("{prefix}.max_file_size"), size)?;
        }
        if let Some(exts) = &o.allowed_extensions {
            validate_extensions(&format!("{prefix}.allowed_extensions"), exts)?;
        }
    }
    Ok(())
}
