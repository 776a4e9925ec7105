use serde::{Deserialize, Serialize};
use validator::Validate;

/// Response DTO for a stored upload
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponseDto {
    /// Public URL of the stored object
    pub url: String,
    /// Object key inside the bucket
    pub key: String,
}

/// Query for existence checks
#[derive(Debug, Deserialize)]
pub struct ExistsQueryDto {
    pub name: String,
    /// Defaults to the current date partition
    pub directory: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExistsResponseDto {
    pub exists: bool,
}

/// Request DTO for deleting a file by URL
#[derive(Debug, Deserialize, Validate)]
pub struct DeleteFileByUrlDto {
    /// The URL returned when the file was uploaded
    #[validate(url(message = "Invalid URL format"))]
    #[validate(length(min = 1, message = "url is required"))]
    pub url: String,
}

/// Response DTO for delete operations
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteFileResponseDto {
    pub deleted: bool,
}
