//! Modules layer - Infrastructure components for external integrations
//!
//! Contains the object storage adapter and its backends.

pub mod storage;
