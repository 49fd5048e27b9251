//! space-core: Core library for the space deployment CLI
//!
//! This crate provides the core functionality for the space CLI, including:
//! - Configuration management
//! - Environment to bucket resolution
//! - Object key mapping and tag parsing
//! - Upload and batch removal tasks
//! - ObjectStore trait for S3 operations
//!
//! This crate is designed to be independent of any specific S3 SDK,
//! allowing for easy testing against mock stores.

pub mod config;
pub mod context;
pub mod environment;
pub mod error;
pub mod key;
pub mod tags;
pub mod task;
pub mod traits;

pub use config::{Config, ConfigManager, Connection};
pub use context::TaskContext;
pub use environment::{Environment, EnvironmentResolver};
pub use error::{Error, Result, UploadFailure};
pub use tags::TagSet;
pub use task::{ContentType, Remover, Uploader};
pub use traits::{BucketInfo, ObjectInfo, ObjectStore, PutOptions, RemovalFailure};
