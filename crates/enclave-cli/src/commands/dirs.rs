//! Directory commands - ls, mkdir, mv, cp, rm, find and cleanup.

use clap::ValueEnum;
use colored::Colorize;
use enclave_vfs::{EntryType, FileRecord};
use enclave_workspace::{
    CleanupRequest, CopyRequest, DeleteRequest, FindRequest, ListRequest, MkdirRequest,
    MoveRequest,
};

use crate::context::Context;
use crate::formatter::{OutputFormat, print_json};
use crate::theme::Theme;

/// Entry type filter accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum EntryKind {
    /// Regular files.
    File,
    /// Directories.
    Dir,
    /// Symbolic links.
    Symlink,
}

impl From<EntryKind> for EntryType {
    fn from(kind: EntryKind) -> Self {
        match kind {
            EntryKind::File => Self::File,
            EntryKind::Dir => Self::Directory,
            EntryKind::Symlink => Self::Symlink,
        }
    }
}

fn entry_types(kinds: &[EntryKind]) -> Option<Vec<EntryType>> {
    (!kinds.is_empty()).then(|| kinds.iter().copied().map(EntryType::from).collect())
}

/// Options for `ls`.
pub(crate) struct LsArgs {
    pub(crate) path: String,
    pub(crate) recursive: bool,
    pub(crate) all: bool,
    pub(crate) long: bool,
    pub(crate) types: Vec<EntryKind>,
}

/// List a directory.
pub(crate) async fn ls(ctx: &Context, args: LsArgs) -> anyhow::Result<()> {
    let ws = ctx.workspace()?;
    let request = ListRequest {
        recursive: args.recursive,
        include_hidden: args.all,
        entry_types: entry_types(&args.types),
        caller: ctx.caller(),
        ..ListRequest::new(args.path)
    };
    let records = ws.list_directory(request).await?;
    print_records(ctx, &records, args.long)
}

/// Options for `find`.
pub(crate) struct FindArgs {
    pub(crate) pattern: String,
    pub(crate) path: String,
    pub(crate) no_recursive: bool,
    pub(crate) all: bool,
    pub(crate) ignore_case: bool,
    pub(crate) types: Vec<EntryKind>,
    pub(crate) limit: Option<usize>,
}

/// Search for entries matching a glob.
pub(crate) async fn find(ctx: &Context, args: FindArgs) -> anyhow::Result<()> {
    let ws = ctx.workspace()?;
    let request = FindRequest {
        path: args.path,
        recursive: !args.no_recursive,
        entry_types: entry_types(&args.types),
        include_hidden: args.all,
        case_insensitive: args.ignore_case,
        caller: ctx.caller(),
        ..FindRequest::new(args.pattern)
    };
    let limit = args.limit.unwrap_or(usize::MAX);

    // The search reads directories synchronously as it advances.
    let (records, errors) = tokio::task::spawn_blocking(move || {
        let mut records = Vec::new();
        let mut errors = Vec::new();
        for item in ws.find_files(request)?.take(limit) {
            match item {
                Ok(record) => records.push(record),
                Err(e) => errors.push(e),
            }
        }
        Ok::<_, enclave_core::FsError>((records, errors))
    })
    .await??;

    for err in &errors {
        eprintln!("{}", Theme::warning(&err.to_string()));
    }
    print_records(ctx, &records, false)
}

/// Create a directory.
pub(crate) async fn mkdir(ctx: &Context, path: &str, no_parents: bool) -> anyhow::Result<()> {
    let ws = ctx.workspace()?;
    let request = MkdirRequest {
        create_parents: !no_parents,
        caller: ctx.caller(),
        ..MkdirRequest::new(path)
    };
    let record = ws.create_directory(request).await?;
    match ctx.format {
        OutputFormat::Json => print_json(&record),
        OutputFormat::Pretty => {
            println!("{}", Theme::success(&format!("Directory {} ready", record.relative_path.bold())));
            Ok(())
        },
    }
}

/// Move or rename an entry.
pub(crate) async fn mv(ctx: &Context, source: &str, destination: &str, force: bool) -> anyhow::Result<()> {
    let ws = ctx.workspace()?;
    let request = MoveRequest {
        overwrite: force,
        caller: ctx.caller(),
        ..MoveRequest::new(source, destination)
    };
    let record = ws.move_item(request).await?;
    match ctx.format {
        OutputFormat::Json => print_json(&record),
        OutputFormat::Pretty => {
            println!(
                "{}",
                Theme::success(&format!("Moved {source} -> {}", record.relative_path.bold()))
            );
            Ok(())
        },
    }
}

/// Copy a file or directory tree.
pub(crate) async fn cp(ctx: &Context, source: &str, destination: &str, force: bool) -> anyhow::Result<()> {
    let ws = ctx.workspace()?;
    let request = CopyRequest {
        overwrite: force,
        caller: ctx.caller(),
        ..CopyRequest::new(source, destination)
    };
    let report = ws.copy_item(request).await?;
    if ctx.format == OutputFormat::Json {
        return print_json(&report);
    }

    let summary = format!(
        "Copied {} items ({} bytes) to {destination}",
        report.items_copied, report.bytes_copied
    );
    if report.is_complete() {
        println!("{}", Theme::success(&summary));
    } else {
        println!("{}", Theme::warning(&summary));
        for item in &report.errors {
            println!("  {} {}", item.path.red(), Theme::dimmed(&item.message));
        }
    }
    Ok(())
}

/// Delete an entry.
pub(crate) async fn rm(ctx: &Context, path: &str, recursive: bool) -> anyhow::Result<()> {
    let ws = ctx.workspace()?;
    let request = DeleteRequest {
        recursive,
        caller: ctx.caller(),
        ..DeleteRequest::new(path)
    };
    ws.delete_item(request).await?;
    match ctx.format {
        OutputFormat::Json => print_json(&serde_json::json!({ "deleted": path })),
        OutputFormat::Pretty => {
            println!("{}", Theme::success(&format!("Deleted {}", path.bold())));
            Ok(())
        },
    }
}

/// Remove empty directories.
pub(crate) async fn cleanup(ctx: &Context, path: &str) -> anyhow::Result<()> {
    let ws = ctx.workspace()?;
    let request = CleanupRequest {
        caller: ctx.caller(),
        ..CleanupRequest::new(path)
    };
    let removed = ws.cleanup_empty_directories(request).await?;
    if ctx.format == OutputFormat::Json {
        return print_json(&removed);
    }

    if removed.is_empty() {
        println!("{}", Theme::info("No empty directories"));
        return Ok(());
    }
    for dir in &removed {
        println!("  {} {dir}", "-".red());
    }
    println!("{}", Theme::success(&format!("Removed {} directories", removed.len())));
    Ok(())
}

fn print_records(ctx: &Context, records: &[FileRecord], long: bool) -> anyhow::Result<()> {
    if ctx.format == OutputFormat::Json {
        return print_json(records);
    }
    if records.is_empty() {
        println!("{}", Theme::info("No entries"));
        return Ok(());
    }

    for record in records {
        let name = Theme::entry(&record.relative_path, record.entry_type);
        if long {
            let modified = record
                .modified_at
                .as_ref()
                .map_or_else(|| Theme::dimmed("-"), Theme::timestamp);
            let mode = record.permissions.as_deref().unwrap_or("-");
            println!("{mode:>6} {:>12} {modified} {name}", record.size_bytes);
        } else {
            println!("{name}");
        }
    }
    Ok(())
}
