//! tag command - Show, replace or clear the tags of an object

use clap::{Args, Subcommand};
use serde::Serialize;
use space_core::{Error, ObjectStore as _, Result, TagSet};

use super::{GlobalArgs, Session, report};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Tag subcommands
#[derive(Subcommand, Debug)]
pub enum TagCommands {
    /// Show the tags of an object
    Show(KeyArgs),

    /// Replace the tags of an object
    Set(SetArgs),

    /// Remove every tag from an object
    Clear(KeyArgs),
}

#[derive(Args, Debug)]
pub struct KeyArgs {
    /// Object key
    pub key: String,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Object key
    pub key: String,

    /// Tags as "key: value, key: value"
    pub tags: String,
}

#[derive(Debug, Serialize)]
struct TagOutput<'a> {
    bucket: &'a str,
    key: &'a str,
    tags: &'a TagSet,
}

/// Execute a tag subcommand
pub async fn execute(cmd: TagCommands, globals: &GlobalArgs, formatter: &Formatter) -> ExitCode {
    match run(cmd, globals, formatter).await {
        Ok(()) => ExitCode::Success,
        Err(e) => report(formatter, &e),
    }
}

/// A tag subcommand with its tags already parsed
enum Action {
    Show(String),
    Set(String, TagSet),
    Clear(String),
}

async fn run(cmd: TagCommands, globals: &GlobalArgs, formatter: &Formatter) -> Result<()> {
    // Parse before touching config or network
    let action = match cmd {
        TagCommands::Show(args) => Action::Show(args.key),
        TagCommands::Set(args) => {
            let tags = TagSet::parse(&args.tags)?;
            if tags.is_empty() {
                return Err(Error::InvalidTags(
                    "no tags given, use `space tag clear` to remove tags".into(),
                ));
            }
            Action::Set(args.key, tags)
        }
        TagCommands::Clear(args) => Action::Clear(args.key),
    };

    let session = Session::load(globals)?;
    let bucket = session.bucket()?;
    let client = session.client().await?;
    let ctx = &session.ctx;

    match action {
        Action::Show(key) => {
            let tags = ctx
                .run("GetObjectTagging", client.get_tags(&bucket, &key))
                .await?;
            print_tags(formatter, &bucket, &key, &tags);
        }
        Action::Set(key, tags) => {
            ctx.run("PutObjectTagging", client.put_tags(&bucket, &key, &tags))
                .await?;
            if formatter.is_json() {
                print_tags(formatter, &bucket, &key, &tags);
            } else {
                formatter.success(&format!("Tagged {bucket}/{key}: {tags}"));
            }
        }
        Action::Clear(key) => {
            ctx.run("DeleteObjectTagging", client.remove_tags(&bucket, &key))
                .await?;
            if formatter.is_json() {
                print_tags(formatter, &bucket, &key, &TagSet::new());
            } else {
                formatter.success(&format!("Cleared tags of {bucket}/{key}"));
            }
        }
    }
    Ok(())
}

fn print_tags(formatter: &Formatter, bucket: &str, key: &str, tags: &TagSet) {
    if formatter.is_json() {
        formatter.json(&TagOutput { bucket, key, tags });
        return;
    }

    if tags.is_empty() {
        formatter.println(&format!("{bucket}/{key} has no tags"));
        return;
    }

    let rows = tags
        .iter()
        .map(|(k, v)| vec![k.to_string(), v.to_string()])
        .collect();
    formatter.table(&["Tag", "Value"], rows);
}
