//! Log command - query the operation log.

use chrono::{DateTime, Utc};
use colored::Colorize;
use enclave_audit::{LogQuery, OperationLog};
use enclave_core::Operation;

use crate::context::Context;
use crate::formatter::{OutputFormat, print_json};
use crate::theme::Theme;

/// Filters for `log show`.
pub(crate) struct ShowArgs {
    pub(crate) limit: usize,
    pub(crate) failed: bool,
    pub(crate) succeeded: bool,
    pub(crate) operation: Option<String>,
    pub(crate) caller: Option<String>,
    pub(crate) workspace: Option<String>,
    pub(crate) since: Option<String>,
}

fn parse_time(flag: &str, value: &str) -> anyhow::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| anyhow::anyhow!("invalid {flag} '{value}': {e} (expected RFC 3339)"))
}

/// Build a query from command-line filters.
fn build_query(args: &ShowArgs) -> anyhow::Result<LogQuery> {
    let mut query = LogQuery::new().with_limit(args.limit);
    match (args.failed, args.succeeded) {
        (true, true) => anyhow::bail!("--failed and --succeeded are mutually exclusive"),
        (true, false) => query = query.with_success(false),
        (false, true) => query = query.with_success(true),
        (false, false) => {},
    }
    if let Some(op) = &args.operation {
        let op: Operation = op.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        query = query.with_operation(op);
    }
    if let Some(caller) = &args.caller {
        query = query.with_caller(caller.as_str());
    }
    if let Some(ws) = &args.workspace {
        query = query.with_workspace(ws.as_str());
    }
    if let Some(since) = &args.since {
        query = query.with_since(parse_time("--since", since)?);
    }
    Ok(query)
}

fn hint_if_ephemeral(ctx: &Context) {
    if !ctx.persistent_log {
        eprintln!(
            "{}",
            Theme::warning("operation log persistence is disabled; only this process's entries are visible")
        );
    }
}

/// Show log entries, most recent first.
pub(crate) fn show(ctx: &Context, args: &ShowArgs) -> anyhow::Result<()> {
    hint_if_ephemeral(ctx);
    let log: &OperationLog = ctx.registry.log();
    let entries = log.query(&build_query(args)?)?;
    if ctx.format == OutputFormat::Json {
        return print_json(&entries);
    }

    if entries.is_empty() {
        println!("{}", Theme::info("No matching entries"));
        return Ok(());
    }

    println!("\n{}", Theme::header("Operation Log"));
    println!(
        "{:>6} {:<19} {:<16} {:<16} {:<12} {}",
        "SEQ".dimmed(),
        "TIMESTAMP".dimmed(),
        "WORKSPACE".dimmed(),
        "OPERATION".dimmed(),
        "RESULT".dimmed(),
        "PATH".dimmed()
    );
    println!("{}", Theme::separator());

    for entry in &entries {
        let result = match entry.error_type() {
            None => "OK".green().to_string(),
            Some(kind) => kind.as_str().red().to_string(),
        };
        let path = match &entry.destination_path {
            Some(dest) => format!("{} -> {dest}", entry.relative_path),
            None => entry.relative_path.clone(),
        };
        println!(
            "{:>6} {} {:<16} {:<16} {:<12} {}",
            entry.sequence,
            Theme::timestamp(&entry.timestamp.0),
            entry.workspace,
            entry.operation.as_str(),
            result,
            path
        );
        if let Some(message) = entry.error_message() {
            println!("{:>6} {}", "", Theme::dimmed(message));
        }
    }
    println!();
    Ok(())
}

/// Show failure counts per error kind.
pub(crate) fn errors(ctx: &Context) -> anyhow::Result<()> {
    hint_if_ephemeral(ctx);
    let summary = ctx.registry.log().error_summary()?;
    if ctx.format == OutputFormat::Json {
        return print_json(&summary);
    }

    if summary.is_empty() {
        println!("{}", Theme::success("No failed operations"));
        return Ok(());
    }

    println!("\n{}", Theme::header("Errors by Type"));
    println!("{}", Theme::separator());
    for (kind, count) in &summary {
        println!("{:<20} {count:>8}", kind.as_str());
    }
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ShowArgs {
        ShowArgs {
            limit: 20,
            failed: false,
            succeeded: false,
            operation: None,
            caller: None,
            workspace: None,
            since: None,
        }
    }

    #[test]
    fn test_build_query_filters() {
        let query = build_query(&ShowArgs {
            failed: true,
            operation: Some("move".into()),
            caller: Some("agent".into()),
            ..args()
        })
        .unwrap();
        assert_eq!(query, LogQuery::new()
            .with_limit(20)
            .with_success(false)
            .with_operation(Operation::Move)
            .with_caller("agent"));
    }

    #[test]
    fn test_build_query_rejects_bad_input() {
        assert!(build_query(&ShowArgs { failed: true, succeeded: true, ..args() }).is_err());
        assert!(build_query(&ShowArgs { operation: Some("frobnicate".into()), ..args() }).is_err());
        assert!(build_query(&ShowArgs { since: Some("yesterday".into()), ..args() }).is_err());
    }
}
