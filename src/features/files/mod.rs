//! Files feature: the HTTP surface this host puts in front of the storage adapter

pub mod dtos;
pub mod handlers;
pub mod routes;

pub use routes::routes;
