//! Upload and removal tasks
//!
//! Routine deployment tasks built on top of [`ObjectStore`]: pushing a file,
//! pushing a folder tree, and removing a batch of keys.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::context::TaskContext;
use crate::environment::EnvironmentResolver;
use crate::error::{Error, Result, UploadFailure};
use crate::key;
use crate::tags::TagSet;
use crate::traits::{DEFAULT_CONTENT_TYPE, ObjectStore, PutOptions, RemovalFailure};

/// Maximum keys per DeleteObjects request (S3 limit)
pub const MAX_BATCH_SIZE: usize = 1000;

/// How the content type of uploaded objects is chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentType {
    /// Same content type for every object
    Fixed(String),
    /// Guess from the file extension, falling back to octet-stream
    Guess,
}

impl Default for ContentType {
    fn default() -> Self {
        ContentType::Fixed(DEFAULT_CONTENT_TYPE.to_string())
    }
}

impl ContentType {
    fn for_path(&self, path: &Path) -> String {
        match self {
            ContentType::Fixed(value) => value.clone(),
            ContentType::Guess => mime_guess::from_path(path)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        }
    }
}

/// Callback invoked with each key once its object is stored
pub type UploadObserver<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// Uploads files and folders to the bucket of an environment
///
/// Tags configured with [`Uploader::with_tags`] are applied to every object
/// it uploads.
pub struct Uploader<'a> {
    store: &'a dyn ObjectStore,
    resolver: &'a EnvironmentResolver,
    tags: TagSet,
    content_type: ContentType,
    concurrency: usize,
    observer: Option<UploadObserver<'a>>,
}

impl<'a> Uploader<'a> {
    pub fn new(store: &'a dyn ObjectStore, resolver: &'a EnvironmentResolver) -> Self {
        Self {
            store,
            resolver,
            tags: TagSet::new(),
            content_type: ContentType::default(),
            concurrency: 1,
            observer: None,
        }
    }

    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    /// Files uploaded in parallel by [`Uploader::upload_folder`]
    ///
    /// 1 (the default) uploads sequentially and stops at the first failure.
    /// Above 1, every file is attempted and all failures are reported.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn on_uploaded(mut self, observer: UploadObserver<'a>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Upload one file as `prefix/<file name>`
    ///
    /// For objects whose content was stored but whose tags could not be
    /// applied, [`Error::TaggingFailed`] carries the key; the object is left
    /// in place.
    pub async fn upload_file(
        &self,
        ctx: &TaskContext,
        path: &Path,
        env: &str,
        prefix: &str,
    ) -> Result<String> {
        let bucket = self.resolver.resolve(env)?;

        let metadata = stat(path).await?;
        if metadata.is_dir() {
            return Err(Error::NotAFile(path.to_path_buf()));
        }

        let key = key::file_key(path, prefix)?;
        self.store_file(ctx, &bucket, path, &key).await?;
        Ok(key)
    }

    /// Upload every regular file below `folder`, keeping its relative layout
    ///
    /// Returns the uploaded keys in traversal order. On failure the error is
    /// [`Error::UploadIncomplete`], holding the keys already uploaded so the
    /// caller can clean them up.
    pub async fn upload_folder(
        &self,
        ctx: &TaskContext,
        folder: &Path,
        env: &str,
        prefix: &str,
    ) -> Result<Vec<String>> {
        let bucket = self.resolver.resolve(env)?;
        stat(folder).await?;

        let mut plan = Vec::new();
        for file in collect_files(folder)? {
            let key = key::folder_key(folder, &file, prefix)?;
            plan.push((file, key));
        }

        info!(
            bucket = %bucket,
            files = plan.len(),
            concurrency = self.concurrency,
            "uploading folder {}",
            folder.display()
        );

        let uploaded = if self.concurrency == 1 {
            self.upload_sequential(ctx, &bucket, plan).await?
        } else {
            self.upload_concurrent(ctx, &bucket, plan).await?
        };

        info!(bucket = %bucket, uploaded = uploaded.len(), "folder upload complete");
        Ok(uploaded)
    }

    async fn upload_sequential(
        &self,
        ctx: &TaskContext,
        bucket: &str,
        plan: Vec<(PathBuf, String)>,
    ) -> Result<Vec<String>> {
        let mut uploaded = Vec::with_capacity(plan.len());

        for (path, key) in plan {
            if let Err(error) = self.store_file(ctx, bucket, &path, &key).await {
                if matches!(error, Error::TaggingFailed { .. }) {
                    uploaded.push(key);
                }
                return Err(Error::UploadIncomplete {
                    uploaded,
                    failures: vec![UploadFailure { path, error }],
                });
            }
            uploaded.push(key);
        }

        Ok(uploaded)
    }

    async fn upload_concurrent(
        &self,
        ctx: &TaskContext,
        bucket: &str,
        plan: Vec<(PathBuf, String)>,
    ) -> Result<Vec<String>> {
        let mut uploaded = Vec::with_capacity(plan.len());
        let mut failures = Vec::new();

        // Every planned file yields an outcome. Once the context is finished,
        // ctx.run fails the remaining files before their put starts.
        let mut results = futures::stream::iter(plan)
            .map(|(path, key)| async move {
                let outcome = self.store_file(ctx, bucket, &path, &key).await;
                (path, key, outcome)
            })
            .buffered(self.concurrency);

        while let Some((path, key, outcome)) = results.next().await {
            match outcome {
                Ok(()) => uploaded.push(key),
                Err(error) => {
                    if matches!(error, Error::TaggingFailed { .. }) {
                        uploaded.push(key);
                    }
                    failures.push(UploadFailure { path, error });
                }
            }
        }

        if failures.is_empty() {
            Ok(uploaded)
        } else {
            Err(Error::UploadIncomplete { uploaded, failures })
        }
    }

    /// Put one file under `key`, then apply the tag set if there is one
    async fn store_file(
        &self,
        ctx: &TaskContext,
        bucket: &str,
        path: &Path,
        key: &str,
    ) -> Result<()> {
        let options = PutOptions {
            content_type: self.content_type.for_path(path),
        };

        debug!(bucket, key, path = %path.display(), "putting object");
        ctx.run("PutObject", self.store.put_file(bucket, key, path, &options))
            .await?;

        if let Some(observer) = self.observer {
            observer(key);
        }

        if !self.tags.is_empty() {
            if let Err(e) = ctx
                .run("PutObjectTagging", self.store.put_tags(bucket, key, &self.tags))
                .await
            {
                warn!(bucket, key, error = %e, "object uploaded but tagging failed");
                return Err(Error::TaggingFailed {
                    key: key.to_string(),
                    source: Box::new(e),
                });
            }
        }

        Ok(())
    }
}

/// Removes batches of keys from the bucket of an environment
pub struct Remover<'a> {
    store: &'a dyn ObjectStore,
    resolver: &'a EnvironmentResolver,
}

impl<'a> Remover<'a> {
    pub fn new(store: &'a dyn ObjectStore, resolver: &'a EnvironmentResolver) -> Self {
        Self { store, resolver }
    }

    /// Remove all `keys`, attempting every one of them
    ///
    /// Failures are collected across batches into a single
    /// [`Error::PartialBatchFailure`]. Keys removed before a failure stay
    /// removed. An empty key list succeeds without contacting the store.
    pub async fn remove_objects(
        &self,
        ctx: &TaskContext,
        env: &str,
        keys: &[String],
    ) -> Result<()> {
        let bucket = self.resolver.resolve(env)?;

        if keys.is_empty() {
            return Ok(());
        }

        let mut failures: Vec<RemovalFailure> = Vec::new();

        for batch in keys.chunks(MAX_BATCH_SIZE) {
            debug!(bucket = %bucket, batch_size = batch.len(), "sending DeleteObjects batch");

            match ctx
                .run("DeleteObjects", self.store.remove_objects(&bucket, batch))
                .await
            {
                Ok(rejected) => {
                    for failure in &rejected {
                        warn!(
                            bucket = %bucket,
                            key = %failure.key,
                            "failed to remove object: {}",
                            failure.message
                        );
                    }
                    failures.extend(rejected);
                }
                Err(e) if e.is_interrupted() => return Err(e),
                Err(e) => {
                    let message = e.to_string();
                    warn!(bucket = %bucket, batch_size = batch.len(), error = %message, "DeleteObjects request failed");
                    failures.extend(batch.iter().map(|k| RemovalFailure::new(k, &message)));
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::PartialBatchFailure {
                attempted: keys.len(),
                failures,
            })
        }
    }
}

async fn stat(path: &Path) -> Result<std::fs::Metadata> {
    tokio::fs::metadata(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(path.display().to_string())
        } else {
            Error::Io(e)
        }
    })
}

/// Regular files below `root`, depth-first, entries sorted by file name
///
/// Symbolic links are not followed below the root.
fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
