//! CLI command definitions and execution
//!
//! This module contains all CLI commands and their implementations.
//! Commands that talk to the storage service share a [`Session`]: the loaded
//! configuration, the selected environment and the command's task context.

use std::time::Duration;

use clap::{Parser, Subcommand};
use space_core::{
    Config, ConfigManager, Connection, EnvironmentResolver, Error, Result, TaskContext,
};
use space_s3::SpaceClient;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

mod completions;
mod config;
mod get;
mod list;
mod ls;
mod push;
mod remove;
mod tag;

/// Overrides the configured endpoint
pub const ENDPOINT_ENV: &str = "SPACE_ENDPOINT";
/// Overrides the configured access key
pub const ACCESS_KEY_ENV: &str = "SPACE_ACCESS_KEY";
/// Overrides the configured secret key
pub const SECRET_KEY_ENV: &str = "SPACE_SECRET_KEY";

/// space - deploy build artifacts to S3-compatible object storage
///
/// Pushes files and folders to the bucket of a named environment, lists and
/// downloads objects, and removes them in batches.
#[derive(Parser, Debug)]
#[command(name = "space")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Target environment: dev or live [default: from config, else dev]
    #[arg(short, long, global = true, env = "SPACE_ENV")]
    pub env: Option<String>,

    /// Upper bound for the whole command, in seconds [default: 180]
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress spinner
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List buckets, or every object under bucket[/prefix]
    List(list::ListArgs),

    /// List objects in the environment bucket
    Ls(ls::LsArgs),

    /// Upload a file or folder to the environment bucket
    Push(push::PushArgs),

    /// Download an object from the environment bucket
    Get(get::GetArgs),

    /// Remove objects from the environment bucket
    #[command(alias = "rm")]
    Remove(remove::RemoveArgs),

    /// Manage object tags
    #[command(subcommand)]
    Tag(tag::TagCommands),

    /// Manage the configuration file
    #[command(subcommand)]
    Config(config::ConfigCommands),

    /// Generate shell completion scripts
    Completions(completions::CompletionsArgs),
}

/// Flags that shape the session of a storage command
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    pub env: Option<String>,
    pub timeout: Option<u64>,
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let formatter = Formatter::new(OutputConfig {
        json: cli.json || configured_json(),
        no_color: cli.no_color,
        no_progress: cli.no_progress,
        quiet: cli.quiet,
    });
    let globals = GlobalArgs {
        env: cli.env,
        timeout: cli.timeout,
    };

    match cli.command {
        Commands::List(args) => list::execute(args, &globals, &formatter).await,
        Commands::Ls(args) => ls::execute(args, &globals, &formatter).await,
        Commands::Push(args) => push::execute(args, &globals, &formatter).await,
        Commands::Get(args) => get::execute(args, &globals, &formatter).await,
        Commands::Remove(args) => remove::execute(args, &globals, &formatter).await,
        Commands::Tag(cmd) => tag::execute(cmd, &globals, &formatter).await,
        Commands::Config(cmd) => config::execute(cmd, &formatter),
        Commands::Completions(args) => completions::execute(args),
    }
}

/// Whether the config file asks for JSON output
///
/// A missing or unreadable file means human output; the command itself
/// reports load errors.
fn configured_json() -> bool {
    ConfigManager::new()
        .and_then(|manager| manager.load())
        .map(|config| config.defaults.output == "json")
        .unwrap_or(false)
}

/// Print a command error and pick its exit code
pub(crate) fn report(formatter: &Formatter, error: &Error) -> ExitCode {
    tracing::debug!(error = ?error, "command failed");
    formatter.error(&error.to_string());
    ExitCode::from(error)
}

/// State shared by the storage commands of one invocation
pub(crate) struct Session {
    pub config: Config,
    pub env: String,
    pub resolver: EnvironmentResolver,
    pub ctx: TaskContext,
}

impl Session {
    /// Load the configuration and start the command clock
    ///
    /// Ctrl+C cancels the session context.
    pub fn load(globals: &GlobalArgs) -> Result<Self> {
        let config = ConfigManager::new()?.load()?;
        let resolver = EnvironmentResolver::from_config(&config)?;
        let env = globals
            .env
            .clone()
            .unwrap_or_else(|| config.defaults.env.clone());
        let timeout = Duration::from_secs(globals.timeout.unwrap_or(config.defaults.timeout_secs));

        let ctx = TaskContext::with_timeout(timeout);
        let token = ctx.cancellation_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling");
                token.cancel();
            }
        });

        tracing::debug!(env = %env, timeout_secs = timeout.as_secs(), "session ready");
        Ok(Self {
            config,
            env,
            resolver,
            ctx,
        })
    }

    /// Bucket of the selected environment
    pub fn bucket(&self) -> Result<String> {
        self.resolver.resolve(&self.env)
    }

    /// Storage client for the configured connection
    pub async fn client(&self) -> Result<SpaceClient> {
        let connection = with_overrides(self.config.connection.clone(), |name| {
            std::env::var(name).ok().filter(|v| !v.is_empty())
        })?;
        SpaceClient::new(&connection).await
    }
}

/// Apply `SPACE_ENDPOINT`/`SPACE_ACCESS_KEY`/`SPACE_SECRET_KEY` on top of the
/// configured connection
fn with_overrides(
    connection: Option<Connection>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Connection> {
    let endpoint = lookup(ENDPOINT_ENV);
    let access_key = lookup(ACCESS_KEY_ENV);
    let secret_key = lookup(SECRET_KEY_ENV);

    let mut connection = match (connection, &endpoint, &access_key, &secret_key) {
        (Some(connection), _, _, _) => connection,
        (None, Some(e), Some(a), Some(s)) => Connection::new(e, a, s),
        (None, _, _, _) => {
            return Err(Error::Config(format!(
                "No connection configured. Run `space config connection` or set {ENDPOINT_ENV}, {ACCESS_KEY_ENV} and {SECRET_KEY_ENV}."
            )));
        }
    };

    if let Some(endpoint) = endpoint {
        connection.endpoint = endpoint;
    }
    if let Some(access_key) = access_key {
        connection.access_key = access_key;
    }
    if let Some(secret_key) = secret_key {
        connection.secret_key = secret_key;
    }
    Ok(connection)
}

/// Render an optional timestamp for tables
pub(crate) fn format_time(value: Option<jiff::Timestamp>) -> String {
    value
        .map(|t| t.strftime("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}
