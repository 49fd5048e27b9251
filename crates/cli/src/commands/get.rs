//! get command - Download an object from the environment bucket

use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;
use space_core::{Error, ObjectStore as _, Result};

use super::{GlobalArgs, Session, report};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Download an object
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Object key
    pub key: String,

    /// Local file or directory [default: the key's file name in the current directory]
    pub dest: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct GetOutput<'a> {
    status: &'static str,
    bucket: &'a str,
    key: &'a str,
    path: String,
    size_bytes: u64,
}

/// Execute the get command
pub async fn execute(args: GetArgs, globals: &GlobalArgs, formatter: &Formatter) -> ExitCode {
    match run(args, globals, formatter).await {
        Ok(()) => ExitCode::Success,
        Err(e) => report(formatter, &e),
    }
}

async fn run(args: GetArgs, globals: &GlobalArgs, formatter: &Formatter) -> Result<()> {
    let dest = destination(&args.key, args.dest.as_deref())?;

    let session = Session::load(globals)?;
    let bucket = session.bucket()?;
    let client = session.client().await?;

    let existed = dest.exists();
    let size = match session
        .ctx
        .run("GetObject", client.get_file(&bucket, &args.key, &dest))
        .await
    {
        Ok(size) => size,
        Err(e) => {
            // Drop a partially written file, never one that was already there
            if !existed && dest.is_file() {
                let _ = tokio::fs::remove_file(&dest).await;
            }
            return Err(e);
        }
    };

    if formatter.is_json() {
        formatter.json(&GetOutput {
            status: "success",
            bucket: &bucket,
            key: &args.key,
            path: dest.display().to_string(),
            size_bytes: size,
        });
    } else {
        formatter.success(&format!(
            "Downloaded {bucket}/{} to {} ({})",
            args.key,
            dest.display(),
            humansize::format_size(size, humansize::BINARY)
        ));
    }
    Ok(())
}

/// Local path an object is written to
fn destination(key: &str, dest: Option<&Path>) -> Result<PathBuf> {
    let name = key
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .ok_or_else(|| Error::InvalidPath(format!("'{key}' has no file name")))?;

    Ok(match dest {
        None => PathBuf::from(name),
        Some(dir) if dir.is_dir() => dir.join(name),
        Some(file) => file.to_path_buf(),
    })
}
