//! Configuration commands
//!
//! The configuration file holds the storage connection, the bucket of each
//! environment and the command defaults.

use std::collections::BTreeMap;

use clap::{Args, Subcommand};
use serde::Serialize;
use space_core::config::Defaults;
use space_core::{ConfigManager, Connection, Environment, Error, Result};

use super::report;
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the configuration (secret key hidden)
    Show,

    /// Set the storage endpoint and credentials
    Connection(ConnectionArgs),

    /// Map an environment to its bucket
    Env(EnvArgs),

    /// Change the command defaults
    Defaults(DefaultsArgs),

    /// Print the configuration file path
    Path,
}

/// Arguments for the `config connection` command
#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// S3 endpoint URL (e.g., "https://sgp1.digitaloceanspaces.com")
    pub endpoint: String,

    /// Access key ID
    pub access_key: String,

    /// Secret access key
    pub secret_key: String,

    /// Region
    #[arg(long, default_value = "us-east-1")]
    pub region: String,

    /// Bucket lookup style: auto, path, or dns
    #[arg(long, default_value = "auto")]
    pub bucket_lookup: String,
}

/// Arguments for the `config env` command
#[derive(Args, Debug)]
pub struct EnvArgs {
    /// Environment name: dev or live
    pub name: String,

    /// Bucket the environment deploys to
    pub bucket: String,
}

/// Arguments for the `config defaults` command
#[derive(Args, Debug)]
pub struct DefaultsArgs {
    /// Environment used when --env is not given
    #[arg(long)]
    pub environment: Option<String>,

    /// Command timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Files uploaded in parallel during a folder push
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Output format when --json is not given
    #[arg(long, value_parser = ["human", "json"])]
    pub output: Option<String>,
}

/// Configuration view for output (without the secret key)
#[derive(Debug, Serialize)]
struct ConfigView {
    path: String,
    defaults: Defaults,
    #[serde(skip_serializing_if = "Option::is_none")]
    connection: Option<ConnectionInfo>,
    environments: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct ConnectionInfo {
    endpoint: String,
    access_key: String,
    region: String,
    bucket_lookup: String,
}

impl From<&Connection> for ConnectionInfo {
    fn from(connection: &Connection) -> Self {
        Self {
            endpoint: connection.endpoint.clone(),
            access_key: connection.access_key.clone(),
            region: connection.region.clone(),
            bucket_lookup: connection.bucket_lookup.clone(),
        }
    }
}

/// Execute a config subcommand
pub fn execute(cmd: ConfigCommands, formatter: &Formatter) -> ExitCode {
    let result = ConfigManager::new().and_then(|manager| match cmd {
        ConfigCommands::Show => execute_show(&manager, formatter),
        ConfigCommands::Connection(args) => execute_connection(args, &manager, formatter),
        ConfigCommands::Env(args) => execute_env(args, &manager, formatter),
        ConfigCommands::Defaults(args) => execute_defaults(args, &manager, formatter),
        ConfigCommands::Path => {
            formatter.println(&manager.config_path().display().to_string());
            Ok(())
        }
    });

    match result {
        Ok(()) => ExitCode::Success,
        Err(e) => report(formatter, &e),
    }
}

fn execute_show(manager: &ConfigManager, formatter: &Formatter) -> Result<()> {
    let config = manager.load()?;
    let view = ConfigView {
        path: manager.config_path().display().to_string(),
        defaults: config.defaults.clone(),
        connection: config.connection.as_ref().map(ConnectionInfo::from),
        environments: config.environments.clone(),
    };

    if formatter.is_json() {
        formatter.json(&view);
        return Ok(());
    }

    formatter.println(&format!("Config file: {}", view.path));
    formatter.println("");

    let mut rows = vec![
        vec!["defaults.env".to_string(), view.defaults.env.clone()],
        vec![
            "defaults.timeout_secs".to_string(),
            view.defaults.timeout_secs.to_string(),
        ],
        vec![
            "defaults.concurrency".to_string(),
            view.defaults.concurrency.to_string(),
        ],
        vec!["defaults.output".to_string(), view.defaults.output.clone()],
    ];
    match &view.connection {
        Some(c) => {
            rows.push(vec!["connection.endpoint".into(), c.endpoint.clone()]);
            rows.push(vec!["connection.access_key".into(), c.access_key.clone()]);
            rows.push(vec!["connection.region".into(), c.region.clone()]);
            rows.push(vec!["connection.bucket_lookup".into(), c.bucket_lookup.clone()]);
        }
        None => rows.push(vec!["connection".into(), "(not configured)".into()]),
    }
    for (env, bucket) in &view.environments {
        rows.push(vec![format!("environments.{env}"), bucket.clone()]);
    }

    formatter.table(&["Setting", "Value"], rows);
    Ok(())
}

fn execute_connection(
    args: ConnectionArgs,
    manager: &ConfigManager,
    formatter: &Formatter,
) -> Result<()> {
    let mut connection = Connection::new(args.endpoint, args.access_key, args.secret_key);
    connection.region = args.region;
    connection.bucket_lookup = args.bucket_lookup;
    connection.validate()?;

    let endpoint = connection.endpoint.clone();
    let mut config = manager.load()?;
    config.connection = Some(connection);
    manager.save(&config)?;

    formatter.success(&format!("Connection set to {endpoint}."));
    Ok(())
}

fn execute_env(args: EnvArgs, manager: &ConfigManager, formatter: &Formatter) -> Result<()> {
    let env: Environment = args.name.parse()?;
    if args.bucket.trim().is_empty() {
        return Err(Error::Config("Bucket name cannot be empty".into()));
    }

    let mut config = manager.load()?;
    config
        .environments
        .insert(env.to_string(), args.bucket.clone());
    manager.save(&config)?;

    formatter.success(&format!("Environment '{env}' deploys to bucket '{}'.", args.bucket));
    Ok(())
}

fn execute_defaults(
    args: DefaultsArgs,
    manager: &ConfigManager,
    formatter: &Formatter,
) -> Result<()> {
    let mut config = manager.load()?;

    if let Some(name) = args.environment {
        let env: Environment = name.parse()?;
        config.defaults.env = env.to_string();
    }
    if let Some(timeout) = args.timeout_secs {
        config.defaults.timeout_secs = timeout;
    }
    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 {
            return Err(Error::Config("Concurrency must be at least 1".into()));
        }
        config.defaults.concurrency = concurrency;
    }
    if let Some(output) = args.output {
        config.defaults.output = output;
    }

    manager.save(&config)?;
    formatter.success("Defaults updated.");
    Ok(())
}
