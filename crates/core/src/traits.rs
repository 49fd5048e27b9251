//! ObjectStore trait definition
//!
//! This trait defines the interface for S3-compatible storage operations.
//! It allows the upload and removal tasks to be decoupled from the specific
//! S3 SDK implementation.

use std::path::Path;

use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::tags::TagSet;

/// Content type applied to uploads unless overridden
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Metadata for a bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketInfo {
    /// Bucket name
    pub name: String,

    /// Creation timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<Timestamp>,
}

impl BucketInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created: None,
        }
    }
}

/// Metadata for an object or common prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Object key
    pub key: String,

    /// Size in bytes (None for prefixes)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<i64>,

    /// Human-readable size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_human: Option<String>,

    /// Last modified timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,

    /// ETag (usually MD5 for single-part uploads)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    /// Whether this is a common prefix rather than an object
    pub is_dir: bool,
}

impl ObjectInfo {
    /// Create a new ObjectInfo for a file
    pub fn file(key: impl Into<String>, size: i64) -> Self {
        Self {
            key: key.into(),
            size_bytes: Some(size),
            size_human: Some(humansize::format_size(size.max(0) as u64, humansize::BINARY)),
            last_modified: None,
            etag: None,
            is_dir: false,
        }
    }

    /// Create a new ObjectInfo for a common prefix
    pub fn dir(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            size_bytes: None,
            size_human: None,
            last_modified: None,
            etag: None,
            is_dir: true,
        }
    }
}

/// Options for put operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOptions {
    /// Content type stored with the object
    pub content_type: String,
}

impl Default for PutOptions {
    fn default() -> Self {
        Self {
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }
}

/// A key the backing store refused to remove
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalFailure {
    /// Object key
    pub key: String,

    /// Cause reported for this key
    pub message: String,
}

impl RemovalFailure {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Trait for S3-compatible storage operations
///
/// This trait is implemented by the S3 adapter and can be mocked for testing.
/// None of the methods retry; failures surface to the caller as-is.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List buckets
    async fn list_buckets(&self) -> Result<Vec<BucketInfo>>;

    /// List objects under a prefix, following every continuation page
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        recursive: bool,
    ) -> Result<Vec<ObjectInfo>>;

    /// Upload a local file
    async fn put_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        options: &PutOptions,
    ) -> Result<()>;

    /// Download an object into a local file, creating parent directories
    async fn get_file(&self, bucket: &str, key: &str, path: &Path) -> Result<u64>;

    /// Remove one object
    async fn remove_object(&self, bucket: &str, key: &str) -> Result<()>;

    /// Remove up to 1000 objects in one request
    ///
    /// `Err` means the request itself failed. Keys the service refused are
    /// returned in the `Ok` vector.
    async fn remove_objects(&self, bucket: &str, keys: &[String]) -> Result<Vec<RemovalFailure>>;

    /// Replace the tag set of an object
    async fn put_tags(&self, bucket: &str, key: &str, tags: &TagSet) -> Result<()>;

    /// Get the tag set of an object
    async fn get_tags(&self, bucket: &str, key: &str) -> Result<TagSet>;

    /// Remove every tag from an object
    async fn remove_tags(&self, bucket: &str, key: &str) -> Result<()>;
}
