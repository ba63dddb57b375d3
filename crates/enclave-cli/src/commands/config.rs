//! Config command - show the resolved configuration.

use colored::Colorize;
use enclave_config::LoadedConfig;

use crate::formatter::{OutputFormat, print_json};
use crate::theme::Theme;

/// Print the merged configuration. With `sources`, list the layer that set
/// each field.
pub(crate) fn show(loaded: &LoadedConfig, format: OutputFormat, sources: bool) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        return print_json(&loaded.config);
    }

    println!("{}", toml::to_string_pretty(&loaded.config)?);
    if sources {
        println!("{}", Theme::header("Field sources"));
        println!("{}", Theme::separator());
        let mut fields: Vec<_> = loaded.field_sources.iter().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));
        for (field, layer) in fields {
            println!("{:<40} {}", field, layer.to_string().dimmed());
        }
    }
    Ok(())
}

/// Print the home directory, config files and derived paths.
pub(crate) fn paths(loaded: &LoadedConfig, format: OutputFormat) -> anyhow::Result<()> {
    let log_path = loaded.audit_log_path();
    if format == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "home": loaded.home,
            "config_files": loaded.loaded_files,
            "workspace_base_dir": loaded.workspace_base_dir(),
            "operation_log": log_path,
        }));
    }

    println!("{}", Theme::kv("Home", &loaded.home.display().to_string()));
    if loaded.loaded_files.is_empty() {
        println!("{}", Theme::kv("Config files", &Theme::dimmed("(defaults only)")));
    } else {
        for file in &loaded.loaded_files {
            println!("{}", Theme::kv("Config file", &file.display().to_string()));
        }
    }
    println!(
        "{}",
        Theme::kv("Workspaces", &loaded.workspace_base_dir().display().to_string())
    );
    let log_display = log_path.map_or_else(
        || Theme::dimmed("(in memory)"),
        |p| p.display().to_string(),
    );
    println!("{}", Theme::kv("Operation log", &log_display));
    Ok(())
}
