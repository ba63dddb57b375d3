//! Environment variable fallbacks.
//!
//! `ENCLAVE_*` variables are fallbacks, not overrides: they only apply to
//! fields no config file set.

use std::collections::HashMap;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "ENCLAVE_WORKSPACES_DIR",
        field_path: "workspaces.base_dir",
    },
    EnvMapping {
        var_name: "ENCLAVE_MAX_FILE_SIZE",
        field_path: "files.max_file_size",
    },
    EnvMapping {
        var_name: "ENCLAVE_ALLOWED_EXTENSIONS",
        field_path: "files.allowed_extensions",
    },
    EnvMapping {
        var_name: "ENCLAVE_CREATE_PARENTS",
        field_path: "files.create_parents",
    },
    EnvMapping {
        var_name: "ENCLAVE_FOLLOW_EXTERNAL_SYMLINKS",
        field_path: "files.follow_external_symlinks",
    },
    EnvMapping {
        var_name: "ENCLAVE_MAX_DEPTH",
        field_path: "traversal.max_depth",
    },
    EnvMapping {
        var_name: "ENCLAVE_AUDIT_MAX_ENTRIES",
        field_path: "audit.max_entries",
    },
    EnvMapping {
        var_name: "ENCLAVE_AUDIT_PERSIST",
        field_path: "audit.persist",
    },
    EnvMapping {
        var_name: "ENCLAVE_AUDIT_PATH",
        field_path: "audit.path",
    },
    EnvMapping {
        var_name: "ENCLAVE_LOG_LEVEL",
        field_path: "logging.level",
    },
    EnvMapping {
        var_name: "ENCLAVE_LOG_FORMAT",
        field_path: "logging.format",
    },
];

/// Apply environment variable fallbacks to fields that no config file set.
///
/// Returns the number of variables applied.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        let set_by_file = sources
            .get(mapping.field_path)
            .is_some_and(|layer| *layer != ConfigLayer::Defaults);
        if set_by_file {
            continue;
        }

        if let Some(val) = env_vars.get(mapping.var_name) {
            debug!(
                var = mapping.var_name,
                field = mapping.field_path,
                "applying env var fallback"
            );
            set_field(merged, mapping.field_path, coerce_to_toml_value(mapping.field_path, val));
            sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
            count = count.saturating_add(1);
        }
    }

    count
}

/// Set a dotted field in the TOML tree, creating intermediate tables.
fn set_field(root: &mut toml::Value, path: &str, value: toml::Value) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return;
    };

    let mut current = root;
    for segment in segments {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), value);
    }
}

/// Coerce a string env value to the TOML type of the field it targets.
///
/// Values that fail to parse are kept as strings so validation reports
/// them against the field.
fn coerce_to_toml_value(path: &str, val: &str) -> toml::Value {
    if matches!(
        path,
        "files.max_file_size" | "traversal.max_depth" | "audit.max_entries"
    ) && let Ok(i) = val.trim().parse::<i64>()
    {
        return toml::Value::Integer(i);
    }

    if matches!(
        path,
        "files.create_parents" | "files.follow_external_symlinks" | "audit.persist"
    ) && let Ok(b) = val.trim().parse::<bool>()
    {
        return toml::Value::Boolean(b);
    }

    if path == "files.allowed_extensions" {
        return toml::Value::Array(
            val.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| toml::Value::String(s.to_owned()))
                .collect(),
        );
    }

    toml::Value::String(val.to_owned())
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_env_fallback_applies_over_defaults() {
        let mut merged: toml::Value = toml::from_str("[logging]\nlevel = \"warn\"").unwrap();
        let mut sources = FieldSources::new();
        sources.insert("logging.level".to_owned(), ConfigLayer::Defaults);
        let env = make_env(&[("ENCLAVE_LOG_LEVEL", "debug")]);

        let count = apply_env_fallbacks(&mut merged, &mut sources, &env);

        assert_eq!(count, 1);
        assert_eq!(merged["logging"]["level"].as_str(), Some("debug"));
        assert_eq!(
            sources.get("logging.level"),
            Some(&ConfigLayer::Environment)
        );
    }

    #[test]
    fn test_env_fallback_skips_file_set_fields() {
        let mut merged: toml::Value = toml::from_str("[logging]\nlevel = \"error\"").unwrap();
        let mut sources = FieldSources::new();
        sources.insert("logging.level".to_owned(), ConfigLayer::User);
        let env = make_env(&[("ENCLAVE_LOG_LEVEL", "debug")]);

        assert_eq!(apply_env_fallbacks(&mut merged, &mut sources, &env), 0);
        assert_eq!(merged["logging"]["level"].as_str(), Some("error"));
    }

    #[test]
    fn test_env_creates_missing_tables() {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        let mut sources = FieldSources::new();
        let env = make_env(&[("ENCLAVE_MAX_DEPTH", "4")]);

        apply_env_fallbacks(&mut merged, &mut sources, &env);
        assert_eq!(merged["traversal"]["max_depth"].as_integer(), Some(4));
    }

    #[test]
    fn test_coercions() {
        assert_eq!(
            coerce_to_toml_value("files.max_file_size", "2048").as_integer(),
            Some(2048)
        );
        assert_eq!(
            coerce_to_toml_value("audit.persist", "false").as_bool(),
            Some(false)
        );
        let exts = coerce_to_toml_value("files.allowed_extensions", ".txt, .md,");
        let exts: Vec<&str> = exts
            .as_array()
            .unwrap()
            .iter()
            .filter_map(toml::Value::as_str)
            .collect();
        assert_eq!(exts, vec![".txt", ".md"]);
        // Unparseable numbers stay strings.
        assert!(coerce_to_toml_value("traversal.max_depth", "deep").is_str());
    }
}
