//! Environment to bucket resolution
//!
//! Deployments target one of a closed set of environments. Each environment
//! maps to exactly one bucket through the `[environments]` table of the config
//! file. Names outside the set, and members without a bucket, fail closed.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::config::Config;
use crate::error::{Error, Result};

/// A deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Environment {
    Dev,
    Live,
}

impl Environment {
    /// Every supported environment
    pub const ALL: [Environment; 2] = [Environment::Dev, Environment::Live];

    pub const fn as_str(self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Live => "live",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Environment::ALL
            .into_iter()
            .find(|env| env.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Environment::ALL.iter().map(|e| e.as_str()).collect();
                Error::UnknownEnvironment(format!(
                    "'{s}', possible values: {}",
                    names.join(", ")
                ))
            })
    }
}

/// Maps environment names to bucket names
#[derive(Debug, Clone, Default)]
pub struct EnvironmentResolver {
    buckets: BTreeMap<Environment, String>,
}

impl EnvironmentResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a resolver from the `[environments]` table
    ///
    /// Entries whose name is not a supported environment are rejected so a
    /// typo in the config file is reported instead of silently ignored.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut resolver = Self::new();
        for (name, bucket) in &config.environments {
            let env: Environment = name.parse().map_err(|_| {
                Error::Config(format!("Unsupported environment '{name}' in [environments]"))
            })?;
            resolver = resolver.with_bucket(env, bucket);
        }
        Ok(resolver)
    }

    pub fn with_bucket(mut self, env: Environment, bucket: impl Into<String>) -> Self {
        self.buckets.insert(env, bucket.into());
        self
    }

    /// Resolve an environment name to its bucket
    pub fn resolve(&self, name: &str) -> Result<String> {
        let env: Environment = name.parse()?;
        self.buckets
            .get(&env)
            .cloned()
            .ok_or_else(|| Error::UnknownEnvironment(format!("'{env}' has no bucket configured")))
    }

    /// Configured (environment, bucket) pairs
    pub fn iter(&self) -> impl Iterator<Item = (Environment, &str)> {
        self.buckets.iter().map(|(env, bucket)| (*env, bucket.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> EnvironmentResolver {
        EnvironmentResolver::new()
            .with_bucket(Environment::Dev, "artifacts-dev")
            .with_bucket(Environment::Live, "artifacts-live")
    }

    #[test]
    fn test_resolve_known_environments() {
        let resolver = resolver();
        assert_eq!(resolver.resolve("dev").unwrap(), "artifacts-dev");
        assert_eq!(resolver.resolve("live").unwrap(), "artifacts-live");
    }

    #[test]
    fn test_resolve_unknown_environment() {
        let err = resolver().resolve("prod").unwrap_err();
        assert!(matches!(err, Error::UnknownEnvironment(_)));
        assert!(err.to_string().contains("prod"));
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        assert!(resolver().resolve("DEV").is_err());
    }

    #[test]
    fn test_resolve_unconfigured_member() {
        let resolver = EnvironmentResolver::new().with_bucket(Environment::Dev, "artifacts-dev");
        assert!(matches!(
            resolver.resolve("live"),
            Err(Error::UnknownEnvironment(_))
        ));
    }

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.environments.insert("dev".into(), "b-dev".into());
        let resolver = EnvironmentResolver::from_config(&config).unwrap();
        assert_eq!(resolver.resolve("dev").unwrap(), "b-dev");
    }

    #[test]
    fn test_from_config_rejects_unsupported_name() {
        let mut config = Config::default();
        config.environments.insert("staging".into(), "b".into());
        assert!(matches!(
            EnvironmentResolver::from_config(&config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_environment_display_round_trip() {
        for env in Environment::ALL {
            assert_eq!(env.to_string().parse::<Environment>().unwrap(), env);
        }
    }
}
