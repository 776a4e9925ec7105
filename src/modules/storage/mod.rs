//! Storage module
//!
//! MinIO/S3-compatible storage adapter: configuration layering, key
//! construction and the existence, save, serve, read and delete operations.

mod adapter;
mod backend;
mod config;
mod error;
mod memory;
mod minio_backend;
mod naming;
mod serve;

pub use adapter::{MinioStore, StorageAdapter, UploadedFile};
pub use backend::{ObjectBackend, ObjectStat, ObjectStream};
pub use config::{parse_tls_flag, MinioConfig, MinioOptions};
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryBackend;
pub use minio_backend::MinioBackend;
pub use naming::{sanitize_file_name, split_key};
pub use serve::ServeObject;
