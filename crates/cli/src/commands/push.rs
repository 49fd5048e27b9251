//! push command - Upload a file or folder to the environment bucket
//!
//! Single files land at `prefix/<file name>`. With `--recursive`, every
//! regular file below the folder lands at `prefix/<relative path>`.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use space_core::{ContentType, Error, Result, TagSet, Uploader};

use super::{GlobalArgs, Session, report};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, Spinner};

/// Upload a file or folder
#[derive(Args, Debug)]
pub struct PushArgs {
    /// Local file, or folder with --recursive
    pub path: PathBuf,

    /// Upload a folder and everything below it
    #[arg(short, long)]
    pub recursive: bool,

    /// Key prefix for the uploaded objects
    #[arg(short, long, default_value = "")]
    pub prefix: String,

    /// Tags applied to every object, as "key: value, key: value"
    #[arg(short, long)]
    pub tags: Option<String>,

    /// Files uploaded in parallel during a folder push [default: from config, else 1]
    #[arg(short = 'j', long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Content type stored with every object [default: application/octet-stream]
    #[arg(long, conflicts_with = "guess_type")]
    pub content_type: Option<String>,

    /// Guess each object's content type from its file extension
    #[arg(long)]
    pub guess_type: bool,
}

#[derive(Debug, Serialize)]
struct PushOutput<'a> {
    status: &'static str,
    env: &'a str,
    bucket: &'a str,
    keys: &'a [String],
}

/// Execute the push command
pub async fn execute(args: PushArgs, globals: &GlobalArgs, formatter: &Formatter) -> ExitCode {
    match run(args, globals, formatter).await {
        Ok(()) => ExitCode::Success,
        Err(e) => report(formatter, &e),
    }
}

async fn run(args: PushArgs, globals: &GlobalArgs, formatter: &Formatter) -> Result<()> {
    let tags = match &args.tags {
        Some(text) => TagSet::parse(text)?,
        None => TagSet::new(),
    };
    let content_type = if args.guess_type {
        ContentType::Guess
    } else {
        args.content_type
            .clone()
            .map(ContentType::Fixed)
            .unwrap_or_default()
    };

    let session = Session::load(globals)?;
    let bucket = session.bucket()?;
    let client = session.client().await?;
    let concurrency = args
        .concurrency
        .unwrap_or(session.config.defaults.concurrency);

    let spinner = Spinner::new(
        formatter.config(),
        &format!("Pushing {} to {bucket}", args.path.display()),
    );
    let observer = |key: &str| spinner.set_message(&format!("Uploaded {key}"));

    let uploader = Uploader::new(&client, &session.resolver)
        .with_tags(tags)
        .with_content_type(content_type)
        .with_concurrency(concurrency)
        .on_uploaded(&observer);

    let result = if args.recursive {
        uploader
            .upload_folder(&session.ctx, &args.path, &session.env, &args.prefix)
            .await
    } else {
        uploader
            .upload_file(&session.ctx, &args.path, &session.env, &args.prefix)
            .await
            .map(|key| vec![key])
    };
    spinner.finish_and_clear();

    match result {
        Ok(keys) => {
            print_keys(formatter, "success", &session.env, &bucket, &keys);
            formatter.success(&format!("Pushed {} object(s) to {bucket}.", keys.len()));
            Ok(())
        }
        Err(Error::UploadIncomplete { uploaded, failures }) => {
            // Uploaded objects stay in the bucket; list them for cleanup
            print_keys(formatter, "partial", &session.env, &bucket, &uploaded);
            Err(Error::UploadIncomplete { uploaded, failures })
        }
        Err(Error::TaggingFailed { key, source }) => {
            print_keys(formatter, "partial", &session.env, &bucket, std::slice::from_ref(&key));
            Err(Error::TaggingFailed { key, source })
        }
        Err(e) => Err(e),
    }
}

fn print_keys(formatter: &Formatter, status: &'static str, env: &str, bucket: &str, keys: &[String]) {
    if formatter.is_json() {
        formatter.json(&PushOutput {
            status,
            env,
            bucket,
            keys,
        });
        return;
    }

    for key in keys {
        formatter.println(&format!("{bucket}/{key}"));
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use crate::commands::{Cli, Commands};

    #[test]
    fn test_push_flags() {
        let cli = Cli::try_parse_from([
            "space",
            "push",
            "-r",
            "-p",
            "web/v1",
            "-t",
            "version: 1.0",
            "-j",
            "4",
            "dist",
        ])
        .unwrap();

        let Commands::Push(args) = cli.command else {
            panic!("expected push");
        };
        assert!(args.recursive);
        assert_eq!(args.prefix, "web/v1");
        assert_eq!(args.tags.as_deref(), Some("version: 1.0"));
        assert_eq!(args.concurrency, Some(4));
        assert_eq!(args.path.to_str(), Some("dist"));
    }

    #[test]
    fn test_content_type_flags_conflict() {
        let result = Cli::try_parse_from([
            "space",
            "push",
            "--guess-type",
            "--content-type",
            "text/plain",
            "a.txt",
        ]);
        assert!(result.is_err());
    }
}
