//! remove command - Remove objects from the environment bucket
//!
//! Keys are removed in DeleteObjects batches. Every key is attempted; the
//! ones that could not be removed are listed with their cause.

use clap::Args;
use serde::Serialize;
use space_core::{Error, ObjectStore as _, RemovalFailure, Remover, Result};

use super::{GlobalArgs, Session, report};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Remove objects
#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Object keys to remove (prefixes with --recursive)
    #[arg(required = true)]
    pub keys: Vec<String>,

    /// Remove every object under each given prefix
    #[arg(short, long)]
    pub recursive: bool,

    /// Only show what would be removed
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
struct RemoveOutput<'a> {
    status: &'static str,
    bucket: &'a str,
    removed: Vec<&'a str>,
    failed: &'a [RemovalFailure],
    total: usize,
}

/// Execute the remove command
pub async fn execute(args: RemoveArgs, globals: &GlobalArgs, formatter: &Formatter) -> ExitCode {
    match run(args, globals, formatter).await {
        Ok(()) => ExitCode::Success,
        Err(e) => report(formatter, &e),
    }
}

async fn run(args: RemoveArgs, globals: &GlobalArgs, formatter: &Formatter) -> Result<()> {
    let session = Session::load(globals)?;
    let bucket = session.bucket()?;
    let client = session.client().await?;

    let keys = if args.recursive {
        let mut keys = Vec::new();
        for prefix in &args.keys {
            if prefix.trim_matches('/').is_empty() {
                return Err(Error::InvalidPath(
                    "refusing to remove every object of the bucket, give a prefix".into(),
                ));
            }
            let items = session
                .ctx
                .run("ListObjectsV2", client.list_objects(&bucket, prefix, true))
                .await?;
            keys.extend(items.into_iter().filter(|i| !i.is_dir).map(|i| i.key));
        }
        keys
    } else {
        args.keys.clone()
    };

    if keys.is_empty() {
        formatter.warning("No objects matched, nothing to remove");
        return Ok(());
    }

    if args.dry_run {
        for key in &keys {
            formatter.println(&format!("Would remove: {bucket}/{key}"));
        }
        return Ok(());
    }

    let result = Remover::new(&client, &session.resolver)
        .remove_objects(&session.ctx, &session.env, &keys)
        .await;

    match result {
        Ok(()) => {
            print_summary(formatter, &bucket, &keys, &[]);
            formatter.success(&format!("Removed {} object(s) from {bucket}.", keys.len()));
            Ok(())
        }
        Err(Error::PartialBatchFailure {
            attempted,
            failures,
        }) => {
            print_summary(formatter, &bucket, &keys, &failures);
            Err(Error::PartialBatchFailure {
                attempted,
                failures,
            })
        }
        Err(e) => Err(e),
    }
}

fn print_summary(formatter: &Formatter, bucket: &str, keys: &[String], failed: &[RemovalFailure]) {
    let removed = removed_keys(keys, failed);

    if formatter.is_json() {
        formatter.json(&RemoveOutput {
            status: if failed.is_empty() { "success" } else { "partial" },
            bucket,
            total: removed.len(),
            removed,
            failed,
        });
        return;
    }

    for key in removed {
        formatter.println(&format!("Removed: {bucket}/{key}"));
    }
}

/// Keys that are not listed as failed
fn removed_keys<'a>(keys: &'a [String], failed: &[RemovalFailure]) -> Vec<&'a str> {
    let failed: std::collections::HashSet<&str> = failed.iter().map(|f| f.key.as_str()).collect();
    keys.iter()
        .map(String::as_str)
        .filter(|k| !failed.contains(k))
        .collect()
}
