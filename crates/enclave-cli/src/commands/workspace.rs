//! Workspace command - create, list, delete and inspect workspaces.

use colored::Colorize;

use crate::context::Context;
use crate::formatter::{OutputFormat, print_json};
use crate::theme::Theme;

/// Create a workspace.
pub(crate) async fn create(ctx: &Context, name: &str) -> anyhow::Result<()> {
    let ws = ctx.registry.create(name, ctx.caller.as_ref()).await?;
    match ctx.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "name": ws.name().as_str(),
            "root_path": ws.root(),
        })),
        OutputFormat::Pretty => {
            println!(
                "{}",
                Theme::success(&format!(
                    "Created workspace {} at {}",
                    name.bold(),
                    ws.root().display()
                ))
            );
            Ok(())
        },
    }
}

/// List workspaces.
pub(crate) async fn list(ctx: &Context) -> anyhow::Result<()> {
    let workspaces = ctx.registry.list().await?;
    if ctx.format == OutputFormat::Json {
        return print_json(&workspaces);
    }

    if workspaces.is_empty() {
        println!("{}", Theme::info("No workspaces"));
        return Ok(());
    }

    println!("\n{}", Theme::header("Workspaces"));
    println!("{:<24} {:<20} {}", "NAME".dimmed(), "CREATED".dimmed(), "ROOT".dimmed());
    println!("{}", Theme::separator());
    for ws in &workspaces {
        let created = ws
            .created_at
            .as_ref()
            .map_or_else(|| Theme::dimmed("-"), Theme::timestamp);
        println!("{:<24} {:<20} {}", ws.name.bold(), created, ws.root_path.display());
    }
    println!();
    Ok(())
}

/// Delete a workspace and everything in it.
pub(crate) async fn delete(ctx: &Context, name: &str, yes: bool) -> anyhow::Result<()> {
    if !yes {
        anyhow::bail!("deleting workspace '{name}' removes all of its files; pass --yes to confirm");
    }
    ctx.registry.delete(name, ctx.caller.as_ref()).await?;
    match ctx.format {
        OutputFormat::Json => print_json(&serde_json::json!({ "deleted": name })),
        OutputFormat::Pretty => {
            println!("{}", Theme::success(&format!("Deleted workspace {}", name.bold())));
            Ok(())
        },
    }
}

/// Show statistics for a workspace.
pub(crate) async fn info(ctx: &Context, name: Option<&str>) -> anyhow::Result<()> {
    let ws = match name {
        Some(name) => ctx.registry.open(name)?,
        None => ctx.workspace()?,
    };
    let info = ws.get_workspace_info(ctx.caller()).await?;
    if ctx.format == OutputFormat::Json {
        return print_json(&info);
    }

    println!("\n{}", Theme::header(&format!("Workspace {}", info.name)));
    println!("{}", Theme::separator());
    println!("{}", Theme::kv("Root", &info.root_path.display().to_string()));
    if let Some(created) = &info.created_at {
        println!("{}", Theme::kv("Created", &Theme::timestamp(created)));
    }
    println!("{}", Theme::kv("Files", &info.total_files.to_string()));
    println!("{}", Theme::kv("Directories", &info.total_directories.to_string()));
    println!("{}", Theme::kv("Symlinks", &info.total_symlinks.to_string()));
    println!(
        "{}",
        Theme::kv(
            "Size",
            &format!("{} ({} bytes)", info.total_size_human, info.total_size_bytes)
        )
    );
    println!("{}", Theme::kv("Max depth", &info.max_depth.to_string()));
    println!();
    Ok(())
}
