use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::Response,
    Json,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use validator::Validate;

use crate::core::error::AppError;
use crate::features::files::dtos::{
    DeleteFileByUrlDto, DeleteFileResponseDto, ExistsQueryDto, ExistsResponseDto,
    UploadResponseDto,
};
use crate::modules::storage::{split_key, MinioStore, StorageAdapter, UploadedFile};
use crate::shared::constants::{UPLOAD_DIRECTORY_FIELD, UPLOAD_FILE_FIELD, UPLOAD_SPOOL_PREFIX};
use crate::shared::types::ApiResponse;

/// Shared state of the files routes
#[derive(Clone)]
pub struct FilesState {
    pub store: Arc<MinioStore>,
    /// Directory uploads are spooled to while they are being saved
    pub spool_dir: PathBuf,
}

/// Upload a file
///
/// Accepts multipart/form-data with:
/// - `file`: The file to upload (required)
/// - `directory`: Target directory (optional, defaults to the date partition)
///
/// The body is spooled to a temporary file first, the same hand-over the
/// adapter expects from any host. The spool file is removed when the handler
/// finishes or is dropped.
pub async fn upload_file(
    State(state): State<FilesState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<UploadResponseDto>>), AppError> {
    let mut file_data = None;
    let mut file_name: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut directory: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            UPLOAD_FILE_FIELD => {
                content_type = field.content_type().map(|s| s.to_string());
                file_name = Some(
                    field
                        .file_name()
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "unnamed".to_string()),
                );
                file_data = Some(field.bytes().await.map_err(|e| {
                    debug!("Failed to read file bytes: {}", e);
                    AppError::BadRequest(format!("Failed to read file data: {}", e))
                })?);
            }
            UPLOAD_DIRECTORY_FIELD => {
                let text = field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read directory field: {}", e))
                })?;
                if !text.is_empty() {
                    directory = Some(text);
                }
            }
            _ => {
                debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let file_data =
        file_data.ok_or_else(|| AppError::BadRequest("File is required".to_string()))?;
    let file_name =
        file_name.ok_or_else(|| AppError::BadRequest("Filename is required".to_string()))?;

    let spool = tempfile::Builder::new()
        .prefix(UPLOAD_SPOOL_PREFIX)
        .tempfile_in(&state.spool_dir)
        .map_err(|e| AppError::Internal(format!("Failed to create spool file: {}", e)))?;
    tokio::fs::write(spool.path(), &file_data)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to spool upload: {}", e)))?;

    let upload = UploadedFile {
        path: spool.path().to_path_buf(),
        size: file_data.len() as u64,
        name: file_name,
        content_type,
    };
    let url = state.store.save(&upload, directory.as_deref()).await?;
    let key = state.store.url_to_key(&url).unwrap_or_default();

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(UploadResponseDto { url, key }),
            None,
        )),
    ))
}

/// Check whether a file exists
pub async fn file_exists(
    State(state): State<FilesState>,
    Query(query): Query<ExistsQueryDto>,
) -> Json<ApiResponse<ExistsResponseDto>> {
    let exists = state
        .store
        .exists(&query.name, query.directory.as_deref())
        .await;
    Json(ApiResponse::success(Some(ExistsResponseDto { exists }), None))
}

/// Stream a stored file by key
pub async fn serve_content(
    State(state): State<FilesState>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    let (directory, name) = split_key(&key);
    if name.is_empty() {
        return Err(AppError::NotFound(format!("File '{}' not found", key)));
    }

    let response = state.store.serve(name, Some(directory)).respond().await?;
    Ok(response)
}

/// Delete a file by the URL returned from its upload
pub async fn delete_file_by_url(
    State(state): State<FilesState>,
    Json(dto): Json<DeleteFileByUrlDto>,
) -> Result<Json<ApiResponse<DeleteFileResponseDto>>, AppError> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let key = state.store.url_to_key(&dto.url).ok_or_else(|| {
        AppError::BadRequest("URL does not point into this storage bucket".to_string())
    })?;
    let (directory, name) = split_key(&key);

    let deleted = state.store.delete(name, Some(directory)).await?;

    Ok(Json(ApiResponse::success(
        Some(DeleteFileResponseDto { deleted }),
        Some("File deleted successfully".to_string()),
    )))
}
