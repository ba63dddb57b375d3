//! Config file discovery and layered loading.
//!
//! Implements [`load`]:
//! 1. Parse embedded `defaults.toml`
//! 2. Merge the user file (`$ENCLAVE_HOME/config.toml`, default `~/.enclave/config.toml`)
//! 3. Merge an explicitly requested file, if any
//! 4. Apply `ENCLAVE_*` env fallbacks for fields no file set
//! 5. Deserialize and validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, merge_layer, record_leaves};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// A loaded configuration together with where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The merged, validated configuration.
    pub config: Config,
    /// Enclave home directory relative paths resolve against.
    pub home: PathBuf,
    /// Layer that set each leaf field.
    pub field_sources: FieldSources,
    /// Config files that were merged, in order.
    pub loaded_files: Vec<PathBuf>,
}

impl LoadedConfig {
    /// Resolved workspace base directory.
    #[must_use]
    pub fn workspace_base_dir(&self) -> PathBuf {
        self.config.workspace_base_dir(&self.home)
    }

    /// Resolved operation log file, if persistence is enabled.
    #[must_use]
    pub fn audit_log_path(&self) -> Option<PathBuf> {
        self.config.audit_log_path(&self.home)
    }
}

/// Load configuration with layered precedence using the process environment.
///
/// `home_override` replaces the Enclave home directory (otherwise
/// `$ENCLAVE_HOME`, then `~/.enclave`). `explicit` is an extra file merged
/// last; unlike the user file it must exist.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a file is unreadable or malformed, or if
/// the merged configuration fails validation.
pub fn load(explicit: Option<&Path>, home_override: Option<&Path>) -> ConfigResult<LoadedConfig> {
    load_with_env(explicit, home_override, &collect_env_vars())
}

/// [`load`] with an explicit environment map.
///
/// # Errors
///
/// See [`load`].
pub fn load_with_env<S: ::std::hash::BuildHasher>(
    explicit: Option<&Path>,
    home_override: Option<&Path>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<LoadedConfig> {
    let home = match (home_override, env_vars.get("ENCLAVE_HOME")) {
        (Some(h), _) => h.to_path_buf(),
        (None, Some(h)) if !h.is_empty() => PathBuf::from(h),
        _ => default_home()?,
    };

    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;
    let mut field_sources = FieldSources::new();
    record_leaves(&merged, "", ConfigLayer::Defaults, &mut field_sources);
    let mut loaded_files = Vec::new();

    let user_path = home.join("config.toml");
    if let Some(overlay) = try_load_file(&user_path)? {
        merge_layer(&mut merged, &overlay, "", ConfigLayer::User, &mut field_sources);
        info!(path = %user_path.display(), "loaded user config");
        loaded_files.push(user_path);
    }

    if let Some(path) = explicit {
        let overlay = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
            path: path.display().to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })?;
        merge_layer(&mut merged, &overlay, "", ConfigLayer::Explicit, &mut field_sources);
        info!(path = %path.display(), "loaded config file");
        loaded_files.push(path.to_path_buf());
    }

    let env_count = apply_env_fallbacks(&mut merged, &mut field_sources, env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    validate::validate(&config)?;

    Ok(LoadedConfig {
        config,
        home,
        field_sources,
        loaded_files,
    })
}

/// Load a config from a single file (no layering, no env fallbacks).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or validated.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let value = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
        path: path.display().to_string(),
        source: std::io::Error::from(std::io::ErrorKind::NotFound),
    })?;
    let config: Config = value
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: path.display().to_string(),
            source: e,
        })?;
    validate::validate(&config)?;
    Ok(config)
}

/// Read and parse a TOML file, returning `None` if it does not exist.
///
/// A single read avoids a stat/read race; the size cap is checked after.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                content.len()
            ),
        });
    }

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(Some(value))
}

/// `~/.enclave`.
fn default_home() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(".enclave"))
        .ok_or(ConfigError::NoHomeDir)
}
