use std::env;
use std::fs;
use std::path::PathBuf;

use crate::modules::storage::MinioOptions;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub storage: StorageSettings,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub max_request_body_size: usize,
    /// Directory uploads are spooled to before they are handed to storage
    pub upload_spool_dir: PathBuf,
}

/// Storage options handed to the adapter by this host
///
/// The adapter applies its own `storage__minio__*` environment layer on top.
#[derive(Debug, Clone, Default)]
pub struct StorageSettings {
    /// Explicit options, read from the JSON file named by `STORAGE_CONFIG_FILE`
    pub options: MinioOptions,
    /// Create the bucket on startup when missing
    pub ensure_bucket: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            app: AppConfig::from_env()?,
            storage: StorageSettings::from_env()?,
        })
    }
}

impl AppConfig {
    const DEFAULT_MAX_REQUEST_BODY_SIZE: usize = 10 * 1024 * 1024; // 10MB

    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        let max_request_body_size = env::var("MAX_REQUEST_BODY_SIZE")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_REQUEST_BODY_SIZE.to_string())
            .parse::<usize>()
            .map_err(|_| "MAX_REQUEST_BODY_SIZE must be a valid number".to_string())?;

        let upload_spool_dir = env::var("UPLOAD_SPOOL_DIR")
            .ok()
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);

        Ok(Self {
            host,
            port,
            max_request_body_size,
            upload_spool_dir,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl StorageSettings {
    pub fn from_env() -> Result<Self, String> {
        let options = match env::var("STORAGE_CONFIG_FILE").ok().filter(|p| !p.is_empty()) {
            Some(path) => {
                let raw = fs::read_to_string(&path)
                    .map_err(|e| format!("Cannot read STORAGE_CONFIG_FILE '{}': {}", path, e))?;
                MinioOptions::from_json(&raw).map_err(|e| e.to_string())?
            }
            None => MinioOptions::default(),
        };

        let ensure_bucket = match env::var("STORAGE_ENSURE_BUCKET") {
            Ok(raw) => parse_switch(&raw)
                .ok_or_else(|| "STORAGE_ENSURE_BUCKET must be true/false or 1/0".to_string())?,
            Err(_) => false,
        };

        Ok(Self {
            options,
            ensure_bucket,
        })
    }
}

fn parse_switch(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Some(true),
        "0" | "false" | "" => Some(false),
        _ => None,
    }
}
