//! MinIO/S3-compatible storage adapter for content-management hosts
//!
//! The host hands uploads over as temporary files; the adapter stores them in
//! a bucket under sanitized, collision-free keys and answers existence checks,
//! reads, streamed serving and deletion for those keys.
//!
//! ```rust,ignore
//! use minio_store::modules::storage::{MinioOptions, MinioStore, StorageAdapter};
//!
//! let store = MinioStore::new(&MinioOptions::from_json(r#"{"endPoint":"localhost","port":9000,"bucket":"media"}"#)?)?;
//! let url = store.save(&upload, Some("2024/03")).await?;
//! ```

pub mod core;
pub mod features;
pub mod modules;
pub mod shared;
