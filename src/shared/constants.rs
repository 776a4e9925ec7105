/// Route prefix under which stored objects are streamed back to clients
pub const CONTENT_ROUTE_PREFIX: &str = "/content";

/// Multipart field carrying the uploaded file
pub const UPLOAD_FILE_FIELD: &str = "file";

/// Multipart field carrying an optional target directory
pub const UPLOAD_DIRECTORY_FIELD: &str = "directory";

/// File name prefix of uploads spooled to disk
pub const UPLOAD_SPOOL_PREFIX: &str = "minio-store-upload-";
