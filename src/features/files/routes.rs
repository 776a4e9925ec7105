use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;

use crate::features::files::handlers::{
    delete_file_by_url, file_exists, serve_content, upload_file, FilesState,
};
use crate::modules::storage::MinioStore;
use crate::shared::constants::CONTENT_ROUTE_PREFIX;

/// Create routes for the files feature
pub fn routes(store: Arc<MinioStore>, max_upload_size: usize, spool_dir: PathBuf) -> Router {
    Router::new()
        .route(
            "/api/files/upload",
            // Allow body size up to the limit + buffer for multipart overhead
            post(upload_file).layer(DefaultBodyLimit::max(max_upload_size + 1024 * 1024)),
        )
        .route("/api/files/exists", get(file_exists))
        .route("/api/files", delete(delete_file_by_url))
        .route(
            &format!("{}/{{*key}}", CONTENT_ROUTE_PREFIX),
            get(serve_content),
        )
        .with_state(FilesState { store, spool_dir })
}
