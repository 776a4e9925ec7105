//! In-memory backend (for testing and local runs without an object store)

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use axum::body::Bytes;
use futures::StreamExt;

use super::backend::{ObjectBackend, ObjectStat, ObjectStream};
use super::error::{StorageError, StorageResult};

const CHUNK_SIZE: usize = 8 * 1024;

struct StoredObject {
    data: Bytes,
    content_type: String,
}

#[derive(Default)]
pub struct InMemoryBackend {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored keys in lexical order
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.objects.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectBackend for InMemoryBackend {
    async fn stat(&self, key: &str) -> StorageResult<ObjectStat> {
        self.objects
            .read()
            .unwrap()
            .get(key)
            .map(|object| ObjectStat {
                size: object.data.len() as u64,
                etag: None,
                content_type: Some(object.content_type.clone()),
            })
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
        self.objects.write().unwrap().insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get_stream(&self, key: &str) -> StorageResult<ObjectStream> {
        let data = self
            .objects
            .read()
            .unwrap()
            .get(key)
            .map(|object| object.data.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;

        // Hand the content out in chunks like a network body would arrive
        let chunks: Vec<StorageResult<Bytes>> = (0..data.len())
            .step_by(CHUNK_SIZE)
            .map(|start| Ok(data.slice(start..(start + CHUNK_SIZE).min(data.len()))))
            .collect();
        Ok(futures::stream::iter(chunks).boxed())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.objects.write().unwrap().remove(key);
        Ok(())
    }
}
