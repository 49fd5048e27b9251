//! ls command - List objects of the environment bucket

use clap::Args;
use serde::Serialize;
use space_core::{ObjectInfo, ObjectStore as _, Result};

use super::{GlobalArgs, Session, format_time, report};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// List objects in the environment bucket
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Key prefix to list under
    #[arg(default_value = "")]
    pub prefix: String,

    /// List recursively instead of grouping by "/"
    #[arg(short, long)]
    pub recursive: bool,
}

/// Output structure for object listings (JSON format)
#[derive(Debug, Serialize)]
struct ListingOutput<'a> {
    bucket: &'a str,
    prefix: &'a str,
    items: &'a [ObjectInfo],
    summary: Summary,
}

#[derive(Debug, Serialize)]
struct Summary {
    total_objects: usize,
    total_size_bytes: i64,
    total_size_human: String,
}

/// Execute the ls command
pub async fn execute(args: LsArgs, globals: &GlobalArgs, formatter: &Formatter) -> ExitCode {
    match run(args, globals, formatter).await {
        Ok(()) => ExitCode::Success,
        Err(e) => report(formatter, &e),
    }
}

async fn run(args: LsArgs, globals: &GlobalArgs, formatter: &Formatter) -> Result<()> {
    let session = Session::load(globals)?;
    let bucket = session.bucket()?;
    let client = session.client().await?;

    let items = session
        .ctx
        .run(
            "ListObjectsV2",
            client.list_objects(&bucket, &args.prefix, args.recursive),
        )
        .await?;

    print_objects(formatter, &bucket, &args.prefix, &items);
    Ok(())
}

/// Print an object listing as a table, or JSON
pub(super) fn print_objects(formatter: &Formatter, bucket: &str, prefix: &str, items: &[ObjectInfo]) {
    let files = items.iter().filter(|i| !i.is_dir);
    let total_objects = files.clone().count();
    let total_size_bytes: i64 = files.filter_map(|i| i.size_bytes).sum();
    let summary = Summary {
        total_objects,
        total_size_bytes,
        total_size_human: humansize::format_size(total_size_bytes.max(0) as u64, humansize::BINARY),
    };

    if formatter.is_json() {
        formatter.json(&ListingOutput {
            bucket,
            prefix,
            items,
            summary,
        });
        return;
    }

    if items.is_empty() {
        formatter.warning(&format!("No objects found in {bucket}/{prefix}"));
        return;
    }

    let rows = items
        .iter()
        .map(|item| {
            if item.is_dir {
                vec![String::new(), "DIR".to_string(), item.key.clone()]
            } else {
                vec![
                    format_time(item.last_modified),
                    item.size_human.clone().unwrap_or_default(),
                    item.key.clone(),
                ]
            }
        })
        .collect();
    formatter.table(&["Modified", "Size", "Key"], rows);
    formatter.println(&format!(
        "{} object(s), {}",
        summary.total_objects, summary.total_size_human
    ));
}
