//! Error types for space-core
//!
//! Provides a unified error type that can be converted to appropriate exit codes.

use std::path::PathBuf;

use thiserror::Error;

use crate::traits::RemovalFailure;

/// Result type alias for space-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// A single file that could not be uploaded during a folder push
#[derive(Debug)]
pub struct UploadFailure {
    /// Local file that failed
    pub path: PathBuf,
    /// Why it failed
    pub error: Error,
}

/// Error types for space-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Environment name is not supported or has no bucket configured
    #[error("Unknown environment: {0}")]
    UnknownEnvironment(String),

    /// A directory was given where a regular file is required
    #[error("{} is a directory, push with --recursive", .0.display())]
    NotAFile(PathBuf),

    /// A computed object key would escape its prefix or upload root
    #[error("Path traversal rejected: {0}")]
    PathTraversal(String),

    /// Invalid path format
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Malformed or out-of-limit tag specification
    #[error("Invalid tags: {0}")]
    InvalidTags(String),

    /// The storage service rejected or failed a request
    #[error("{operation} failed: {message}")]
    Remote { operation: String, message: String },

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// One or more keys of a removal batch could not be removed
    #[error(
        "Failed to remove {} of {attempted} object(s):{}",
        .failures.len(),
        describe_removals(.failures)
    )]
    PartialBatchFailure {
        attempted: usize,
        failures: Vec<RemovalFailure>,
    },

    /// A folder push stopped (or finished) with failed files
    #[error(
        "Upload incomplete, {} object(s) uploaded, {} file(s) failed:{}",
        .uploaded.len(),
        .failures.len(),
        describe_uploads(.failures)
    )]
    UploadIncomplete {
        uploaded: Vec<String>,
        failures: Vec<UploadFailure>,
    },

    /// Object was uploaded but its tags could not be applied
    #[error("Uploaded {key} but tagging failed: {source}")]
    TaggingFailed {
        key: String,
        #[source]
        source: Box<Error>,
    },

    /// The command deadline passed before the operation completed
    #[error("Deadline exceeded during {0}")]
    DeadlineExceeded(String),

    /// The command was cancelled (e.g. Ctrl+C)
    #[error("Cancelled during {0}")]
    Cancelled(String),

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// General error
    #[error("{0}")]
    General(String),
}

fn describe_removals(failures: &[RemovalFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("\n  {}: {}", f.key, f.message))
        .collect()
}

fn describe_uploads(failures: &[UploadFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("\n  {}: {}", f.path.display(), f.error))
        .collect()
}

impl Error {
    /// Build a remote failure for the named storage operation
    pub fn remote(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Remote {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Whether this error means the command ran out of time or was interrupted
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::DeadlineExceeded(_) | Error::Cancelled(_))
    }

    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::UnknownEnvironment(_)
            | Error::NotAFile(_)
            | Error::PathTraversal(_)
            | Error::InvalidPath(_)
            | Error::InvalidTags(_)
            | Error::InvalidUrl(_)
            | Error::Config(_) => 2, // UsageError
            Error::Remote { .. } | Error::DeadlineExceeded(_) => 3, // NetworkError
            Error::Auth(_) => 4,                                  // AuthError
            Error::NotFound(_) => 5,                              // NotFound
            Error::Cancelled(_) => 130,                           // Interrupted
            Error::TaggingFailed { source, .. } => source.exit_code(),
            // A push stopped by timeout or Ctrl+C reports the interruption
            Error::UploadIncomplete { failures, .. }
                if !failures.is_empty() && failures.iter().all(|f| f.error.is_interrupted()) =>
            {
                failures[0].error.exit_code()
            }
            _ => 1, // GeneralError
        }
    }
}
