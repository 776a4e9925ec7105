//! Storage adapter exposed to the host
//!
//! [`StorageAdapter`] is the capability contract every storage backend offers
//! the host; [`MinioStore`] fulfils it on top of an [`ObjectBackend`].

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use futures::TryStreamExt;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::backend::{with_timeout, ObjectBackend};
use super::config::{MinioConfig, MinioOptions};
use super::error::{StorageError, StorageResult};
use super::minio_backend::MinioBackend;
use super::naming;
use super::serve::ServeObject;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Upload handed over by the host after it has spooled the request body
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedFile {
    /// Temporary local location of the content
    pub path: PathBuf,
    /// Size in bytes as reported by the host
    pub size: u64,
    /// Original file name
    pub name: String,
    #[serde(default, rename = "type")]
    pub content_type: Option<String>,
}

#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Whether `target_dir/file_name` is present
    ///
    /// A failed probe is reported as `false`, so `false` does not guarantee
    /// the object is absent.
    async fn exists(&self, file_name: &str, target_dir: Option<&str>) -> bool;

    /// Store an upload under a fresh key and return its public URL
    async fn save(&self, file: &UploadedFile, target_dir: Option<&str>) -> StorageResult<String>;

    /// Handler streaming `target_dir/file_name` to the client
    fn serve(&self, file_name: &str, target_dir: Option<&str>) -> ServeObject;

    /// Full content of `target_dir/file_name`
    async fn read(&self, file_name: &str, target_dir: Option<&str>) -> StorageResult<Vec<u8>>;

    async fn delete(&self, file_name: &str, target_dir: Option<&str>) -> StorageResult<bool>;

    /// Date partitioned directory below `base_dir`, e.g. `base/2024/03`
    fn target_dir(&self, base_dir: Option<&str>) -> String {
        naming::target_dir(base_dir)
    }

    fn sanitized_file_name(&self, file_name: &str) -> String {
        naming::sanitize_file_name(file_name)
    }

    /// First free key for `file` in `target_dir`
    ///
    /// Tries `name.ext`, then `name-1.ext`, `name-2.ext` and so on.
    async fn unique_file_name(&self, file: &UploadedFile, target_dir: &str) -> String {
        let base_name = file.name.rsplit(['/', '\\']).next().unwrap_or_default();
        let (stem, ext) = naming::split_extension(base_name);

        let mut stem = self.sanitized_file_name(stem);
        if stem.is_empty() {
            stem = naming::REPLACEMENT.to_string();
        }
        let ext = naming::replace_disallowed(ext);

        let mut attempt: u32 = 0;
        loop {
            let candidate = naming::numbered_file_name(&stem, attempt, &ext);

            if !self.exists(&candidate, Some(target_dir)).await {
                return naming::join_key(target_dir, &candidate);
            }

            debug!("'{}' is taken in '{}', trying next suffix", candidate, target_dir);
            attempt += 1;
        }
    }
}

/// Storage adapter backed by a MinIO/S3-compatible bucket
pub struct MinioStore {
    config: MinioConfig,
    base_url: String,
    backend: Arc<dyn ObjectBackend>,
}

impl MinioStore {
    /// Resolve `options` against the process environment and connect
    pub fn new(options: &MinioOptions) -> StorageResult<Self> {
        Self::resolve_with(options, |key| env::var(key).ok())
    }

    /// Resolve `options` against `lookup` and connect
    ///
    /// Configuration errors surface before any backend call is attempted.
    pub fn resolve_with<F>(options: &MinioOptions, lookup: F) -> StorageResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = MinioConfig::resolve(options, lookup)?;
        let backend = MinioBackend::new(&config)?;
        Ok(Self::with_backend(config, Arc::new(backend)))
    }

    pub fn with_backend(config: MinioConfig, backend: Arc<dyn ObjectBackend>) -> Self {
        let base_url = config.base_url();
        info!(
            "Storage adapter initialized for {} (bucket: {})",
            base_url, config.bucket
        );
        Self {
            config,
            base_url,
            backend,
        }
    }

    pub fn config(&self) -> &MinioConfig {
        &self.config
    }

    /// `scheme://endpoint[:port]`, computed once at construction
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Public URL of a stored key
    pub fn object_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            self.config.bucket,
            naming::encode_key(key)
        )
    }

    /// Key behind a URL returned by [`StorageAdapter::save`]
    ///
    /// Returns `None` for URLs pointing at another store or bucket.
    pub fn url_to_key(&self, url: &str) -> Option<String> {
        let prefix = format!("{}/{}/", self.base_url, self.config.bucket);
        let encoded = url.strip_prefix(&prefix)?;
        naming::decode_key(encoded).filter(|key| !key.is_empty())
    }

    fn directory(&self, target_dir: Option<&str>) -> String {
        match target_dir {
            Some(dir) => dir.to_string(),
            None => self.target_dir(self.config.path_prefix.as_deref()),
        }
    }

    fn key_for(&self, file_name: &str, target_dir: Option<&str>) -> String {
        naming::join_key(&self.directory(target_dir), file_name)
    }
}

#[async_trait]
impl StorageAdapter for MinioStore {
    async fn exists(&self, file_name: &str, target_dir: Option<&str>) -> bool {
        let key = self.key_for(file_name, target_dir);

        match with_timeout(self.config.request_timeout, self.backend.stat(&key)).await {
            Ok(_) => true,
            Err(StorageError::NotFound(_)) => false,
            Err(e) => {
                warn!("Existence probe for '{}' failed, treating as absent: {}", key, e);
                false
            }
        }
    }

    async fn save(&self, file: &UploadedFile, target_dir: Option<&str>) -> StorageResult<String> {
        let directory = self.directory(target_dir);

        let data = tokio::fs::read(&file.path)
            .await
            .map_err(|source| StorageError::LocalRead {
                path: file.path.clone(),
                source,
            })?;

        if data.len() as u64 != file.size {
            warn!(
                "Upload '{}' reported {} bytes but {} were read",
                file.name,
                file.size,
                data.len()
            );
        }

        let key = self.unique_file_name(file, &directory).await;
        let content_type = file.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE);
        let size = data.len();

        with_timeout(
            self.config.request_timeout,
            self.backend.put(&key, Bytes::from(data), content_type),
        )
        .await?;

        info!("Saved '{}' as '{}' ({} bytes)", file.name, key, size);
        Ok(self.object_url(&key))
    }

    fn serve(&self, file_name: &str, target_dir: Option<&str>) -> ServeObject {
        ServeObject::new(
            Arc::clone(&self.backend),
            self.key_for(file_name, target_dir),
            self.config.request_timeout,
        )
    }

    async fn read(&self, file_name: &str, target_dir: Option<&str>) -> StorageResult<Vec<u8>> {
        let key = self.key_for(file_name, target_dir);

        // The limit applies to opening the stream and to each wait for the
        // next chunk, never to the whole transfer.
        let limit = self.config.request_timeout;
        let mut stream = with_timeout(limit, self.backend.get_stream(&key)).await?;
        let mut data = Vec::new();
        while let Some(chunk) = with_timeout(limit, stream.try_next()).await? {
            data.extend_from_slice(&chunk);
        }

        debug!("Read '{}' ({} bytes)", key, data.len());
        Ok(data)
    }

    async fn delete(&self, file_name: &str, target_dir: Option<&str>) -> StorageResult<bool> {
        let key = self.key_for(file_name, target_dir);
        with_timeout(self.config.request_timeout, self.backend.remove(&key)).await?;

        info!("Deleted '{}' from bucket '{}'", key, self.config.bucket);
        Ok(true)
    }
}
