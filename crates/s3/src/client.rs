//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from space-core.

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier, Tag, Tagging};
use aws_smithy_types::error::display::DisplayErrorContext;
use tokio::io::AsyncWriteExt;

use space_core::{
    BucketInfo, Connection, Error, ObjectInfo, ObjectStore, PutOptions, RemovalFailure, Result,
    TagSet,
};

/// S3 client wrapper
pub struct SpaceClient {
    inner: aws_sdk_s3::Client,
}

impl SpaceClient {
    /// Create a new S3 client from connection settings
    pub async fn new(connection: &Connection) -> Result<Self> {
        connection.validate()?;

        let credentials = aws_credential_types::Credentials::new(
            connection.access_key.clone(),
            connection.secret_key.clone(),
            None, // session token
            None, // expiry
            "space-static-credentials",
        );

        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(connection.region.clone()))
            .endpoint_url(&connection.endpoint)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(connection.force_path_style())
            .build();

        tracing::debug!(
            endpoint = %connection.endpoint,
            region = %connection.region,
            "created S3 client"
        );

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
        })
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }
}

/// Map an SDK failure onto the storage error kinds
fn classify<E>(operation: &str, target: &str, err: SdkError<E, HttpResponse>) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    let code = err.code().map(str::to_string);
    let message = match (err.code(), err.message()) {
        (Some(code), Some(message)) => format!("{code}: {message}"),
        (Some(code), None) => code.to_string(),
        _ => DisplayErrorContext(&err).to_string(),
    };
    map_error(operation, target, code.as_deref(), status, message)
}

fn map_error(
    operation: &str,
    target: &str,
    code: Option<&str>,
    status: Option<u16>,
    message: String,
) -> Error {
    match (code, status) {
        (Some("NoSuchKey" | "NoSuchBucket" | "NotFound"), _) | (_, Some(404)) => {
            Error::NotFound(target.to_string())
        }
        (
            Some(
                "AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch" | "ExpiredToken",
            ),
            _,
        )
        | (_, Some(401 | 403)) => Error::Auth(format!("{operation} on {target}: {message}")),
        _ => Error::remote(operation, message),
    }
}

fn timestamp(value: &aws_smithy_types::DateTime) -> Option<jiff::Timestamp> {
    jiff::Timestamp::from_second(value.secs()).ok()
}

fn tagging_from(tags: &TagSet) -> Result<Tagging> {
    let tag_set = tags
        .iter()
        .map(|(key, value)| {
            Tag::builder()
                .key(key)
                .value(value)
                .build()
                .map_err(|e| Error::InvalidTags(e.to_string()))
        })
        .collect::<Result<Vec<_>>>()?;

    Tagging::builder()
        .set_tag_set(Some(tag_set))
        .build()
        .map_err(|e| Error::InvalidTags(e.to_string()))
}

fn tag_set_from(tags: &[Tag]) -> TagSet {
    tags.iter().map(|t| (t.key(), t.value())).collect()
}

fn location(bucket: &str, key: &str) -> String {
    format!("{bucket}/{key}")
}

#[async_trait]
impl ObjectStore for SpaceClient {
    async fn list_buckets(&self) -> Result<Vec<BucketInfo>> {
        let response = self
            .inner
            .list_buckets()
            .send()
            .await
            .map_err(|e| classify("ListBuckets", "buckets", e))?;

        let buckets = response
            .buckets()
            .iter()
            .map(|b| {
                let mut info = BucketInfo::new(b.name().unwrap_or_default());
                info.created = b.creation_date().and_then(timestamp);
                info
            })
            .collect();

        Ok(buckets)
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        recursive: bool,
    ) -> Result<Vec<ObjectInfo>> {
        let mut request = self.inner.list_objects_v2().bucket(bucket);
        if !prefix.is_empty() {
            request = request.prefix(prefix);
        }
        if !recursive {
            request = request.delimiter("/");
        }

        let mut pages = request.into_paginator().send();
        let mut items = Vec::new();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| classify("ListObjectsV2", bucket, e))?;

            for common in page.common_prefixes() {
                if let Some(p) = common.prefix() {
                    items.push(ObjectInfo::dir(p));
                }
            }

            for object in page.contents() {
                let mut info =
                    ObjectInfo::file(object.key().unwrap_or_default(), object.size().unwrap_or(0));
                info.last_modified = object.last_modified().and_then(timestamp);
                info.etag = object.e_tag().map(|e| e.trim_matches('"').to_string());
                items.push(info);
            }
        }

        Ok(items)
    }

    async fn put_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        options: &PutOptions,
    ) -> Result<()> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| Error::Io(std::io::Error::other(format!("{}: {e}", path.display()))))?;

        self.inner
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(&options.content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| classify("PutObject", &location(bucket, key), e))?;

        tracing::debug!(bucket, key, "object stored");
        Ok(())
    }

    async fn get_file(&self, bucket: &str, key: &str, path: &Path) -> Result<u64> {
        let response = self
            .inner
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify("GetObject", &location(bucket, key), e))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut body = response.body;
        let mut file = tokio::fs::File::create(path).await?;
        let mut written = 0u64;

        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| Error::remote("GetObject", e.to_string()))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.inner
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify("DeleteObject", &location(bucket, key), e))?;

        Ok(())
    }

    async fn remove_objects(&self, bucket: &str, keys: &[String]) -> Result<Vec<RemovalFailure>> {
        if keys.is_empty() {
            return Ok(vec![]);
        }

        let objects = keys
            .iter()
            .map(|k| {
                ObjectIdentifier::builder()
                    .key(k)
                    .build()
                    .map_err(|e| Error::InvalidPath(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|e| Error::General(e.to_string()))?;

        let response = self
            .inner
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| classify("DeleteObjects", bucket, e))?;

        let failures = response
            .errors()
            .iter()
            .map(|e| {
                let message = match (e.code(), e.message()) {
                    (Some(code), Some(message)) => format!("{code}: {message}"),
                    (Some(code), None) => code.to_string(),
                    (None, Some(message)) => message.to_string(),
                    (None, None) => "unknown error".to_string(),
                };
                RemovalFailure::new(e.key().unwrap_or_default(), message)
            })
            .collect();

        Ok(failures)
    }

    async fn put_tags(&self, bucket: &str, key: &str, tags: &TagSet) -> Result<()> {
        let tagging = tagging_from(tags)?;

        self.inner
            .put_object_tagging()
            .bucket(bucket)
            .key(key)
            .tagging(tagging)
            .send()
            .await
            .map_err(|e| classify("PutObjectTagging", &location(bucket, key), e))?;

        Ok(())
    }

    async fn get_tags(&self, bucket: &str, key: &str) -> Result<TagSet> {
        let response = self
            .inner
            .get_object_tagging()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify("GetObjectTagging", &location(bucket, key), e))?;

        Ok(tag_set_from(response.tag_set()))
    }

    async fn remove_tags(&self, bucket: &str, key: &str) -> Result<()> {
        self.inner
            .delete_object_tagging()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify("DeleteObjectTagging", &location(bucket, key), e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_error_not_found() {
        let err = map_error("GetObject", "b/k", Some("NoSuchKey"), Some(404), "gone".into());
        assert!(matches!(err, Error::NotFound(target) if target == "b/k"));

        // HeadObject-style responses carry no code, only the status
        let err = map_error("GetObject", "b/k", None, Some(404), "".into());
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_map_error_auth() {
        let err = map_error(
            "PutObject",
            "b/k",
            Some("AccessDenied"),
            Some(403),
            "AccessDenied: Access Denied".into(),
        );
        assert!(matches!(err, Error::Auth(_)));
        assert_eq!(err.exit_code(), 4);

        let err = map_error("ListBuckets", "buckets", Some("SignatureDoesNotMatch"), None, "x".into());
        assert!(matches!(err, Error::Auth(_)));
    }

    #[test]
    fn test_map_error_remote() {
        let err = map_error("PutObject", "b/k", Some("SlowDown"), Some(503), "SlowDown: reduce rate".into());
        match err {
            Error::Remote { operation, message } => {
                assert_eq!(operation, "PutObject");
                assert!(message.contains("SlowDown"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = map_error("PutObject", "b/k", None, None, "dispatch failure".into());
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_tagging_round_trip() {
        let tags = TagSet::parse("version: 1.0, type: app").unwrap();
        let tagging = tagging_from(&tags).unwrap();
        assert_eq!(tagging.tag_set().len(), 2);
        assert_eq!(tag_set_from(tagging.tag_set()), tags);
    }

    #[test]
    fn test_empty_tagging() {
        let tagging = tagging_from(&TagSet::new()).unwrap();
        assert!(tagging.tag_set().is_empty());
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_endpoint() {
        let connection = Connection::new("ftp://storage.local", "key", "secret");
        assert!(matches!(
            SpaceClient::new(&connection).await,
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_new_builds_client_without_network() {
        let connection = Connection::new("http://127.0.0.1:9000", "key", "secret");
        let client = SpaceClient::new(&connection).await.unwrap();
        assert_eq!(
            client.inner().config().region().map(|r| r.as_ref()),
            Some("us-east-1")
        );
    }
}
