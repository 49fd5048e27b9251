//! list command - List buckets, or every object under a bucket prefix

use clap::Args;
use serde::Serialize;
use space_core::{BucketInfo, Error, ObjectStore as _, Result};

use super::ls::print_objects;
use super::{GlobalArgs, Session, format_time, report};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// List buckets or objects
#[derive(Args, Debug)]
pub struct ListArgs {
    /// bucket[/prefix] to list recursively; lists buckets when omitted
    pub target: Option<String>,
}

#[derive(Debug, Serialize)]
struct BucketListOutput<'a> {
    buckets: &'a [BucketInfo],
}

/// Execute the list command
pub async fn execute(args: ListArgs, globals: &GlobalArgs, formatter: &Formatter) -> ExitCode {
    match run(args, globals, formatter).await {
        Ok(()) => ExitCode::Success,
        Err(e) => report(formatter, &e),
    }
}

async fn run(args: ListArgs, globals: &GlobalArgs, formatter: &Formatter) -> Result<()> {
    let target = args.target.as_deref().map(parse_target).transpose()?;

    let session = Session::load(globals)?;
    let client = session.client().await?;

    match target {
        None => {
            let buckets = session.ctx.run("ListBuckets", client.list_buckets()).await?;
            print_buckets(formatter, &buckets);
        }
        Some((bucket, prefix)) => {
            let items = session
                .ctx
                .run("ListObjectsV2", client.list_objects(bucket, prefix, true))
                .await?;
            print_objects(formatter, bucket, prefix, &items);
        }
    }
    Ok(())
}

/// Split `bucket[/prefix]`
fn parse_target(target: &str) -> Result<(&str, &str)> {
    let target = target.trim_start_matches('/');
    let (bucket, prefix) = target.split_once('/').unwrap_or((target, ""));
    if bucket.is_empty() {
        return Err(Error::InvalidPath("bucket name cannot be empty".into()));
    }
    Ok((bucket, prefix))
}

fn print_buckets(formatter: &Formatter, buckets: &[BucketInfo]) {
    if formatter.is_json() {
        formatter.json(&BucketListOutput { buckets });
        return;
    }

    let rows = buckets
        .iter()
        .map(|b| vec![format_time(b.created), b.name.clone()])
        .collect();
    formatter.table(&["Created", "Name"], rows);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("artifacts").unwrap(), ("artifacts", ""));
        assert_eq!(
            parse_target("artifacts/web/v1/").unwrap(),
            ("artifacts", "web/v1/")
        );
        assert_eq!(parse_target("/artifacts/web").unwrap(), ("artifacts", "web"));
    }

    #[test]
    fn test_parse_target_empty_bucket() {
        assert!(matches!(parse_target("/"), Err(Error::InvalidPath(_))));
        assert!(matches!(parse_target(""), Err(Error::InvalidPath(_))));
    }
}
