//! Enclave CLI - workspace-scoped file access from the shell.
//!
//! Every command goes through the same path containment, policy checks and
//! operation log as library callers.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod context;
mod formatter;
mod theme;

use commands::dirs::{EntryKind, FindArgs, LsArgs};
use commands::{config, dirs, files, log, workspace};
use context::Context;
use formatter::OutputFormat;
use theme::Theme;

/// Enclave - sandboxed workspace file access
#[derive(Parser)]
#[command(name = "enclave")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format: pretty (default) or json
    #[arg(long, global = true, default_value = "pretty")]
    format: String,

    /// Extra configuration file, merged last
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enclave home directory (default: ~/.enclave)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Workspace to operate on
    #[arg(short, long, global = true, env = "ENCLAVE_WORKSPACE", default_value = "default")]
    workspace: String,

    /// Caller recorded in the operation log
    #[arg(long, global = true, env = "ENCLAVE_CALLER")]
    caller: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage workspaces
    Workspace {
        #[command(subcommand)]
        command: WorkspaceCommands,
    },

    /// List a directory
    Ls {
        /// Directory to list
        #[arg(default_value = ".")]
        path: String,
        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
        /// Include hidden entries
        #[arg(short, long)]
        all: bool,
        /// Show size, permissions and modification time
        #[arg(short, long)]
        long: bool,
        /// Only show these entry types
        #[arg(short = 't', long = "type", value_enum)]
        types: Vec<EntryKind>,
    },

    /// Print a text file
    Cat {
        /// File to read
        path: String,
        /// Text encoding label, e.g. windows-1252 (default UTF-8)
        #[arg(short, long)]
        encoding: Option<String>,
    },

    /// Write a file (content from the argument or stdin)
    Write {
        /// File to write
        path: String,
        /// Content; read from stdin when omitted
        content: Option<String>,
        /// Fail if the file already exists
        #[arg(long)]
        no_overwrite: bool,
        /// Text encoding label, e.g. windows-1252 (default UTF-8)
        #[arg(short, long)]
        encoding: Option<String>,
    },

    /// Append to an existing file (content from the argument or stdin)
    Append {
        /// File to append to
        path: String,
        /// Content; read from stdin when omitted
        content: Option<String>,
        /// Text encoding label, e.g. windows-1252 (default UTF-8)
        #[arg(short, long)]
        encoding: Option<String>,
    },

    /// Create a directory
    Mkdir {
        /// Directory to create
        path: String,
        /// Fail if the parent does not exist
        #[arg(long)]
        no_parents: bool,
    },

    /// Move or rename a file or directory
    Mv {
        /// Item to move
        source: String,
        /// New location
        destination: String,
        /// Replace an existing destination
        #[arg(short, long)]
        force: bool,
    },

    /// Copy a file or directory tree
    Cp {
        /// Item to copy
        source: String,
        /// Copy location
        destination: String,
        /// Replace existing files
        #[arg(short, long)]
        force: bool,
    },

    /// Delete a file or directory
    Rm {
        /// Item to delete
        path: String,
        /// Delete non-empty directories
        #[arg(short, long)]
        recursive: bool,
    },

    /// Find entries by glob pattern
    Find {
        /// Glob, e.g. `*.md` or `src/**/*.rs`
        pattern: String,
        /// Directory to search from
        #[arg(long = "in", default_value = ".")]
        path: String,
        /// Only search direct children
        #[arg(long)]
        no_recursive: bool,
        /// Include hidden entries
        #[arg(short, long)]
        all: bool,
        /// Case-insensitive matching
        #[arg(short, long)]
        ignore_case: bool,
        /// Only return these entry types
        #[arg(short = 't', long = "type", value_enum)]
        types: Vec<EntryKind>,
        /// Stop after this many matches
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Show metadata for a file or directory
    Stat {
        /// Entry to inspect
        path: String,
    },

    /// Check whether a path exists (exit code 1 if not)
    Exists {
        /// Path to check
        path: String,
    },

    /// Remove empty directories
    Cleanup {
        /// Directory to clean below
        #[arg(default_value = ".")]
        path: String,
    },

    /// Query the operation log
    Log {
        #[command(subcommand)]
        command: LogCommands,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum WorkspaceCommands {
    /// Create a workspace
    Create {
        /// Workspace name
        name: String,
    },
    /// List workspaces
    List,
    /// Delete a workspace and all of its files
    Delete {
        /// Workspace name
        name: String,
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
    /// Show workspace statistics
    Info {
        /// Workspace name (defaults to --workspace)
        name: Option<String>,
    },
}

#[derive(Subcommand)]
enum LogCommands {
    /// Show entries, most recent first
    Show {
        /// Maximum entries to show
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
        /// Only failed operations
        #[arg(long)]
        failed: bool,
        /// Only successful operations
        #[arg(long)]
        succeeded: bool,
        /// Only this operation (e.g. write, move, delete_workspace)
        #[arg(long)]
        operation: Option<String>,
        /// Only this caller
        #[arg(long = "by")]
        caller: Option<String>,
        /// Only this workspace
        #[arg(long = "in")]
        workspace: Option<String>,
        /// Only entries at or after this RFC 3339 time
        #[arg(long)]
        since: Option<String>,
    },
    /// Count failures by error type
    Errors,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the merged configuration
    Show {
        /// Also list which layer set each field
        #[arg(long)]
        sources: bool,
    },
    /// Show the home directory and resolved paths
    Paths,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", Theme::error(&format!("{e:#}")));
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let loaded = enclave_config::load(cli.config.as_deref(), cli.home.as_deref());

    // Logging comes up before config errors are reported so they are traced.
    let log_config = context::log_config(loaded.as_ref().ok(), cli.verbose);
    let _guard = match enclave_telemetry::setup_logging(&log_config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        },
    };

    let loaded = loaded?;
    let format = OutputFormat::from_flag(&cli.format);

    if let Commands::Config { command } = &cli.command {
        match command {
            ConfigCommands::Show { sources } => config::show(&loaded, format, *sources)?,
            ConfigCommands::Paths => config::paths(&loaded, format)?,
        }
        return Ok(ExitCode::SUCCESS);
    }

    let ctx = Context::build(loaded, cli.workspace, cli.caller, format)?;
    let code = dispatch(&ctx, cli.command).await?;
    ctx.registry.log().flush()?;
    Ok(code)
}

async fn dispatch(ctx: &Context, command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Workspace { command } => handle_workspace(ctx, command).await?,
        Commands::Ls {
            path,
            recursive,
            all,
            long,
            types,
        } => {
            dirs::ls(ctx, LsArgs {
                path,
                recursive,
                all,
                long,
                types,
            })
            .await?;
        },
        Commands::Cat { path, encoding } => files::cat(ctx, &path, encoding.as_deref()).await?,
        Commands::Write {
            path,
            content,
            no_overwrite,
            encoding,
        } => files::write(ctx, &path, content, no_overwrite, encoding.as_deref()).await?,
        Commands::Append {
            path,
            content,
            encoding,
        } => files::append(ctx, &path, content, encoding.as_deref()).await?,
        Commands::Mkdir { path, no_parents } => dirs::mkdir(ctx, &path, no_parents).await?,
        Commands::Mv {
            source,
            destination,
            force,
        } => dirs::mv(ctx, &source, &destination, force).await?,
        Commands::Cp {
            source,
            destination,
            force,
        } => dirs::cp(ctx, &source, &destination, force).await?,
        Commands::Rm { path, recursive } => dirs::rm(ctx, &path, recursive).await?,
        Commands::Find {
            pattern,
            path,
            no_recursive,
            all,
            ignore_case,
            types,
            limit,
        } => {
            dirs::find(ctx, FindArgs {
                pattern,
                path,
                no_recursive,
                all,
                ignore_case,
                types,
                limit,
            })
            .await?;
        },
        Commands::Stat { path } => files::stat(ctx, &path).await?,
        Commands::Exists { path } => {
            if !files::exists(ctx, &path).await? {
                return Ok(ExitCode::FAILURE);
            }
        },
        Commands::Cleanup { path } => dirs::cleanup(ctx, &path).await?,
        Commands::Log { command } => handle_log(ctx, command)?,
        // Handled before the registry is built.
        Commands::Config { .. } => {},
    }
    Ok(ExitCode::SUCCESS)
}

async fn handle_workspace(ctx: &Context, command: WorkspaceCommands) -> Result<()> {
    match command {
        WorkspaceCommands::Create { name } => workspace::create(ctx, &name).await,
        WorkspaceCommands::List => workspace::list(ctx).await,
        WorkspaceCommands::Delete { name, yes } => workspace::delete(ctx, &name, yes).await,
        WorkspaceCommands::Info { name } => workspace::info(ctx, name.as_deref()).await,
    }
}

fn handle_log(ctx: &Context, command: LogCommands) -> Result<()> {
    match command {
        LogCommands::Show {
            limit,
            failed,
            succeeded,
            operation,
            caller,
            workspace,
            since,
        } => log::show(ctx, &log::ShowArgs {
            limit,
            failed,
            succeeded,
            operation,
            caller,
            workspace,
            since,
        }),
        LogCommands::Errors => log::errors(ctx),
    }
}
