//! MinIO/S3-compatible backend
//!
//! Uses rust-s3 with path-style addressing (`http://endpoint/bucket/key`),
//! which is what MinIO expects.

use async_trait::async_trait;
use axum::body::Bytes;
use futures::{StreamExt, TryStreamExt};
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, BucketConfiguration, Region};
use tracing::{debug, info, warn};

use super::backend::{ObjectBackend, ObjectStat, ObjectStream};
use super::config::MinioConfig;
use super::error::{StorageError, StorageResult};

/// Object store client bound to a single bucket
pub struct MinioBackend {
    bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
}

impl MinioBackend {
    /// Build a client from resolved configuration
    ///
    /// No request is made here; the first round trip happens on first use.
    pub fn new(config: &MinioConfig) -> StorageResult<Self> {
        let credentials = if config.access_key.is_empty() && config.secret_key.is_empty() {
            Credentials::anonymous()
        } else {
            Credentials::new(
                Some(&config.access_key),
                Some(&config.secret_key),
                None,
                None,
                None,
            )
        }
        .map_err(|e| StorageError::Config(format!("Failed to create MinIO credentials: {}", e)))?;

        // The client talks to the same origin the public URLs point at
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.base_url(),
        };

        let mut bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())
            .map_err(|e| StorageError::Config(format!("Failed to create MinIO bucket: {}", e)))?;
        bucket.set_path_style();

        debug!(
            "MinIO backend ready for endpoint: {}, bucket: {}",
            config.base_url(),
            config.bucket
        );

        Ok(Self {
            bucket,
            region,
            credentials,
        })
    }

    pub fn bucket_name(&self) -> String {
        self.bucket.name()
    }

    /// Create the bucket unless it already exists
    pub async fn ensure_bucket_exists(&self) -> StorageResult<()> {
        let name = self.bucket.name();
        let response = Bucket::create_with_path_style(
            &name,
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await;

        match response {
            Ok(created) if created.success() => {
                info!("Bucket '{}' created successfully", name);
                Ok(())
            }
            Ok(created) if is_already_exists(created.response_code, &created.response_text) => {
                debug!("Bucket '{}' already exists", name);
                Ok(())
            }
            Ok(created) => Err(StorageError::Backend(format!(
                "Failed to create bucket '{}': status {} {}",
                name, created.response_code, created.response_text
            ))),
            Err(S3Error::HttpFailWithBody(code, body)) if is_already_exists(code, &body) => {
                debug!("Bucket '{}' already exists", name);
                Ok(())
            }
            Err(e) => {
                warn!("Could not create bucket '{}': {}", name, e);
                Err(StorageError::Backend(format!(
                    "Failed to create bucket '{}': {}",
                    name, e
                )))
            }
        }
    }
}

fn is_already_exists(code: u16, body: &str) -> bool {
    code == 409
        || body.contains("BucketAlreadyOwnedByYou")
        || body.contains("BucketAlreadyExists")
}

fn map_s3_error(action: &str, key: &str, err: S3Error) -> StorageError {
    match err {
        S3Error::HttpFailWithBody(404, _) => StorageError::NotFound(key.to_string()),
        e => StorageError::Backend(format!("Failed to {} '{}': {}", action, key, e)),
    }
}

fn check_status(action: &str, key: &str, status: u16) -> StorageResult<()> {
    match status {
        200..=299 => Ok(()),
        404 => Err(StorageError::NotFound(key.to_string())),
        code => Err(StorageError::Backend(format!(
            "Failed to {} '{}': unexpected status {}",
            action, key, code
        ))),
    }
}

#[async_trait]
impl ObjectBackend for MinioBackend {
    async fn stat(&self, key: &str) -> StorageResult<ObjectStat> {
        let (head, status) = self
            .bucket
            .head_object(key)
            .await
            .map_err(|e| map_s3_error("stat", key, e))?;
        check_status("stat", key, status)?;

        Ok(ObjectStat {
            size: head.content_length.unwrap_or_default().max(0) as u64,
            etag: head.e_tag,
            content_type: head.content_type,
        })
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
        let response = self
            .bucket
            .put_object_with_content_type(key, &data, content_type)
            .await
            .map_err(|e| map_s3_error("upload", key, e))?;
        check_status("upload", key, response.status_code())?;

        debug!(
            "Uploaded '{}' ({} bytes) to bucket '{}'",
            key,
            data.len(),
            self.bucket.name()
        );
        Ok(())
    }

    async fn get_stream(&self, key: &str) -> StorageResult<ObjectStream> {
        let response = self
            .bucket
            .get_object_stream(key)
            .await
            .map_err(|e| map_s3_error("download", key, e))?;
        check_status("download", key, response.status_code)?;

        let key = key.to_string();
        Ok(response
            .bytes
            .map_err(move |e| {
                StorageError::Backend(format!("Failed while streaming '{}': {}", key, e))
            })
            .boxed())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let response = self
            .bucket
            .delete_object(key)
            .await
            .map_err(|e| map_s3_error("delete", key, e))?;

        match check_status("delete", key, response.status_code()) {
            Err(StorageError::NotFound(_)) | Ok(()) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
