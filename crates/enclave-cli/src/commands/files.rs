//! File commands - cat, write, append, stat and exists.

use std::io::{Read, Write};

use colored::Colorize;
use enclave_vfs::{
    AppendRequest, ExistsRequest, FileRecord, ReadRequest, StatRequest, TextEncoding, WriteRequest,
};

use crate::context::Context;
use crate::formatter::{OutputFormat, print_json};
use crate::theme::Theme;

/// Content from the argument, or stdin when omitted.
fn content_or_stdin(content: Option<String>) -> anyhow::Result<Vec<u8>> {
    match content {
        Some(text) => Ok(text.into_bytes()),
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        },
    }
}

fn parse_encoding(label: Option<&str>) -> anyhow::Result<Option<TextEncoding>> {
    Ok(label.map(TextEncoding::for_label).transpose()?)
}

/// Print a file's text.
pub(crate) async fn cat(ctx: &Context, path: &str, encoding: Option<&str>) -> anyhow::Result<()> {
    let ws = ctx.workspace()?;
    let request = ReadRequest {
        caller: ctx.caller(),
        encoding: parse_encoding(encoding)?,
        ..ReadRequest::new(path)
    };
    let text = ws.files().read(request).await?;
    match ctx.format {
        OutputFormat::Json => print_json(&serde_json::json!({ "path": path, "content": text })),
        OutputFormat::Pretty => {
            let mut out = std::io::stdout().lock();
            out.write_all(text.as_bytes())?;
            out.flush()?;
            Ok(())
        },
    }
}

/// Write a file.
pub(crate) async fn write(
    ctx: &Context,
    path: &str,
    content: Option<String>,
    no_overwrite: bool,
    encoding: Option<&str>,
) -> anyhow::Result<()> {
    let ws = ctx.workspace()?;
    let request = WriteRequest {
        caller: ctx.caller(),
        encoding: parse_encoding(encoding)?,
        ..WriteRequest::new(path, content_or_stdin(content)?).with_overwrite(!no_overwrite)
    };
    let record = ws.files().write(request).await?;
    report_record(ctx, "Wrote", &record)
}

/// Append to an existing file.
pub(crate) async fn append(
    ctx: &Context,
    path: &str,
    content: Option<String>,
    encoding: Option<&str>,
) -> anyhow::Result<()> {
    let ws = ctx.workspace()?;
    let request = AppendRequest {
        caller: ctx.caller(),
        encoding: parse_encoding(encoding)?,
        ..AppendRequest::new(path, content_or_stdin(content)?)
    };
    let record = ws.files().append(request).await?;
    report_record(ctx, "Appended to", &record)
}

/// Show metadata for one entry.
pub(crate) async fn stat(ctx: &Context, path: &str) -> anyhow::Result<()> {
    let ws = ctx.workspace()?;
    let request = StatRequest {
        caller: ctx.caller(),
        ..StatRequest::new(path)
    };
    let record = ws.files().info(request).await?;
    if ctx.format == OutputFormat::Json {
        return print_json(&record);
    }

    println!("\n{}", Theme::header(&record.relative_path));
    println!("{}", Theme::separator());
    println!("{}", Theme::kv("Type", record.entry_type.as_str()));
    println!("{}", Theme::kv("Size", &format!("{} bytes", record.size_bytes)));
    if let Some(modified) = &record.modified_at {
        println!("{}", Theme::kv("Modified", &Theme::timestamp(modified)));
    }
    if let Some(mode) = &record.permissions {
        println!("{}", Theme::kv("Permissions", mode));
    }
    if let Some(ext) = &record.extension {
        println!("{}", Theme::kv("Extension", ext));
    }
    println!("{}", Theme::kv("Hidden", if record.is_hidden { "yes" } else { "no" }));
    println!();
    Ok(())
}

/// Report whether a path exists. Exits non-zero when it does not.
pub(crate) async fn exists(ctx: &Context, path: &str) -> anyhow::Result<bool> {
    let ws = ctx.workspace()?;
    let request = ExistsRequest {
        caller: ctx.caller(),
        ..ExistsRequest::new(path)
    };
    let found = ws.files().exists(request).await?;
    match ctx.format {
        OutputFormat::Json => print_json(&serde_json::json!({ "path": path, "exists": found }))?,
        OutputFormat::Pretty if found => println!("{}", Theme::success(&format!("{path} exists"))),
        OutputFormat::Pretty => println!("{}", Theme::warning(&format!("{path} does not exist"))),
    }
    Ok(found)
}

fn report_record(ctx: &Context, verb: &str, record: &FileRecord) -> anyhow::Result<()> {
    match ctx.format {
        OutputFormat::Json => print_json(record),
        OutputFormat::Pretty => {
            println!(
                "{}",
                Theme::success(&format!(
                    "{verb} {} ({} bytes)",
                    record.relative_path.bold(),
                    record.size_bytes
                ))
            );
            Ok(())
        },
    }
}
