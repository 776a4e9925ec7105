//! Object store backend seam
//!
//! One method per remote round trip the adapter needs. Implementations report
//! a missing object as [`StorageError::NotFound`](super::StorageError::NotFound).

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use futures::stream::BoxStream;

use super::error::{StorageError, StorageResult};

/// Object content as it arrives from the backend
pub type ObjectStream = BoxStream<'static, StorageResult<Bytes>>;

/// Metadata returned by a stat probe
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectStat {
    pub size: u64,
    pub etag: Option<String>,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait ObjectBackend: Send + Sync {
    /// Fetch object metadata
    async fn stat(&self, key: &str) -> StorageResult<ObjectStat>;

    /// Store `data` under `key`, replacing any existing object
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<()>;

    /// Open a byte stream over the object
    async fn get_stream(&self, key: &str) -> StorageResult<ObjectStream>;

    /// Remove the object
    ///
    /// Removing a missing key succeeds.
    async fn remove(&self, key: &str) -> StorageResult<()>;
}

/// Bound a backend call by `limit`, if any
pub(crate) async fn with_timeout<T, F>(limit: Option<Duration>, op: F) -> StorageResult<T>
where
    F: Future<Output = StorageResult<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, op)
            .await
            .map_err(|_| StorageError::Timeout(limit))?,
        None => op.await,
    }
}
