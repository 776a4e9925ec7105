//! Adapter configuration
//!
//! Values come from two layers: the explicit options handed over by the host
//! and `storage__minio__*` environment variables, which win when set to a
//! non-empty value.

use std::env;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use super::error::{StorageError, StorageResult};

pub const ENV_ENDPOINT: &str = "storage__minio__endPoint";
pub const ENV_PORT: &str = "storage__minio__port";
pub const ENV_USE_SSL: &str = "storage__minio__useSSL";
pub const ENV_ACCESS_KEY: &str = "storage__minio__accessKey";
pub const ENV_SECRET_KEY: &str = "storage__minio__secretKey";
pub const ENV_BUCKET: &str = "storage__minio__bucket";
pub const ENV_REGION: &str = "storage__minio__region";
pub const ENV_PATH_PREFIX: &str = "storage__minio__pathPrefix";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "storage__minio__requestTimeoutSecs";

/// Explicit adapter options as supplied by the host configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinioOptions {
    #[serde(alias = "endPoint")]
    pub endpoint: Option<String>,
    /// Accepts either a JSON number or a string
    #[serde(default, deserialize_with = "deserialize_port")]
    pub port: Option<String>,
    #[serde(rename = "useSSL", alias = "useTLS")]
    pub use_tls: Option<bool>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub path_prefix: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

impl MinioOptions {
    /// Load options from a JSON document
    pub fn from_json(raw: &str) -> StorageResult<Self> {
        serde_json::from_str(raw)
            .map_err(|e| StorageError::Config(format!("Invalid storage options: {}", e)))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PortValue {
    Number(u64),
    Text(String),
}

fn deserialize_port<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<PortValue>::deserialize(deserializer)?.map(|value| match value {
            PortValue::Number(n) => n.to_string(),
            PortValue::Text(s) => s,
        }),
    )
}

/// Resolved, immutable adapter configuration
#[derive(Clone)]
pub struct MinioConfig {
    pub endpoint: String,
    /// Port exactly as configured; see [`MinioConfig::numeric_port`]
    pub port: String,
    pub use_tls: bool,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub region: String,
    /// Base directory for date-partitioned default target directories
    pub path_prefix: Option<String>,
    /// Upper bound for a single backend call, `None` when disabled
    pub request_timeout: Option<Duration>,
}

impl MinioConfig {
    const DEFAULT_REGION: &'static str = "us-east-1";
    const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Resolve options against the process environment
    pub fn from_env(options: &MinioOptions) -> StorageResult<Self> {
        Self::resolve(options, |key| env::var(key).ok())
    }

    /// Resolve options against an arbitrary variable lookup
    ///
    /// Each field prefers the looked-up variable, then the explicit option,
    /// then its default. Empty variables are treated as unset.
    pub fn resolve<F>(options: &MinioOptions, lookup: F) -> StorageResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let layered = |key: &str, explicit: &Option<String>| {
            var(key).or_else(|| explicit.clone()).unwrap_or_default()
        };

        let use_tls = match var(ENV_USE_SSL) {
            Some(raw) => parse_tls_flag(&raw)?,
            None => options.use_tls.unwrap_or(false),
        };

        let request_timeout_secs = match var(ENV_REQUEST_TIMEOUT_SECS) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                StorageError::Config(format!(
                    "{} must be a whole number of seconds, got '{}'",
                    ENV_REQUEST_TIMEOUT_SECS, raw
                ))
            })?,
            None => options
                .request_timeout_secs
                .unwrap_or(Self::DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        let region = var(ENV_REGION)
            .or_else(|| options.region.clone())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| Self::DEFAULT_REGION.to_string());

        let path_prefix = var(ENV_PATH_PREFIX)
            .or_else(|| options.path_prefix.clone())
            .filter(|p| !p.is_empty());

        Ok(Self {
            endpoint: layered(ENV_ENDPOINT, &options.endpoint),
            port: layered(ENV_PORT, &options.port),
            use_tls,
            access_key: layered(ENV_ACCESS_KEY, &options.access_key),
            secret_key: layered(ENV_SECRET_KEY, &options.secret_key),
            bucket: layered(ENV_BUCKET, &options.bucket),
            region,
            path_prefix,
            request_timeout: (request_timeout_secs > 0)
                .then(|| Duration::from_secs(request_timeout_secs)),
        })
    }

    /// The configured port as an integer, if it is one
    pub fn numeric_port(&self) -> Option<u16> {
        self.port.trim().parse::<u16>().ok()
    }

    /// Port to put in URLs and client configuration
    ///
    /// Omitted for the well-known HTTP ports and for non-numeric values.
    pub fn explicit_port(&self) -> Option<u16> {
        self.numeric_port().filter(|p| *p != 80 && *p != 443)
    }

    pub fn scheme(&self) -> &'static str {
        if self.use_tls {
            "https"
        } else {
            "http"
        }
    }

    /// `scheme://endpoint[:port]`
    pub fn base_url(&self) -> String {
        match self.explicit_port() {
            Some(port) => format!("{}://{}:{}", self.scheme(), self.endpoint, port),
            None => format!("{}://{}", self.scheme(), self.endpoint),
        }
    }
}

impl fmt::Debug for MinioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MinioConfig")
            .field("endpoint", &self.endpoint)
            .field("port", &self.port)
            .field("use_tls", &self.use_tls)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("path_prefix", &self.path_prefix)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Parse the TLS flag accepted from the environment
pub fn parse_tls_flag(raw: &str) -> StorageResult<bool> {
    match raw {
        "0" | "false" => Ok(false),
        "1" | "true" => Ok(true),
        other => Err(StorageError::Config(format!(
            "Invalid value {} for useSSL",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn options(endpoint: &str, port: &str, use_tls: bool) -> MinioOptions {
        MinioOptions {
            endpoint: Some(endpoint.to_string()),
            port: Some(port.to_string()),
            use_tls: Some(use_tls),
            bucket: Some("media".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_tls_flag_tokens() {
        for raw in ["0", "false"] {
            let config = MinioConfig::resolve(&MinioOptions::default(), env_of(&[(ENV_USE_SSL, raw)]))
                .unwrap();
            assert!(!config.use_tls, "{raw} should disable TLS");
        }
        for raw in ["1", "true"] {
            let config = MinioConfig::resolve(&MinioOptions::default(), env_of(&[(ENV_USE_SSL, raw)]))
                .unwrap();
            assert!(config.use_tls, "{raw} should enable TLS");
        }
    }

    #[test]
    fn test_tls_flag_rejects_unknown_values() {
        for raw in ["maybe", "yes", "TRUE", "2", " true"] {
            let result = MinioConfig::resolve(
                &options("store.example.com", "443", true),
                env_of(&[(ENV_USE_SSL, raw)]),
            );
            match result {
                Err(StorageError::Config(msg)) => assert!(msg.contains(raw)),
                other => panic!("expected configuration error for {raw:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_tls_flag_falls_back_to_explicit_option() {
        let config =
            MinioConfig::resolve(&options("store.example.com", "", true), env_of(&[])).unwrap();
        assert!(config.use_tls);

        let config = MinioConfig::resolve(&MinioOptions::default(), env_of(&[])).unwrap();
        assert!(!config.use_tls);

        // an empty variable counts as unset
        let config = MinioConfig::resolve(
            &options("store.example.com", "", true),
            env_of(&[(ENV_USE_SSL, "")]),
        )
        .unwrap();
        assert!(config.use_tls);
    }

    #[test]
    fn test_environment_overrides_explicit_options() {
        let explicit = MinioOptions {
            endpoint: Some("explicit.local".to_string()),
            port: Some("9000".to_string()),
            access_key: Some("explicit-access".to_string()),
            secret_key: Some("explicit-secret".to_string()),
            bucket: Some("explicit-bucket".to_string()),
            ..Default::default()
        };
        let config = MinioConfig::resolve(
            &explicit,
            env_of(&[
                (ENV_ENDPOINT, "env.local"),
                (ENV_BUCKET, "env-bucket"),
                (ENV_SECRET_KEY, "env-secret"),
            ]),
        )
        .unwrap();

        assert_eq!(config.endpoint, "env.local");
        assert_eq!(config.port, "9000");
        assert_eq!(config.access_key, "explicit-access");
        assert_eq!(config.secret_key, "env-secret");
        assert_eq!(config.bucket, "env-bucket");
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = MinioConfig::resolve(&MinioOptions::default(), env_of(&[])).unwrap();
        assert_eq!(config.endpoint, "");
        assert_eq!(config.port, "");
        assert_eq!(config.access_key, "");
        assert_eq!(config.bucket, "");
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.path_prefix, None);
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_request_timeout() {
        let config = MinioConfig::resolve(
            &MinioOptions::default(),
            env_of(&[(ENV_REQUEST_TIMEOUT_SECS, "0")]),
        )
        .unwrap();
        assert_eq!(config.request_timeout, None);

        let result = MinioConfig::resolve(
            &MinioOptions::default(),
            env_of(&[(ENV_REQUEST_TIMEOUT_SECS, "soon")]),
        );
        assert!(matches!(result, Err(StorageError::Config(_))));
    }

    #[test]
    fn test_base_url_omits_well_known_ports() {
        for (use_tls, port) in [(true, "443"), (false, "80"), (true, "80"), (false, "443")] {
            let config =
                MinioConfig::resolve(&options("store.example.com", port, use_tls), env_of(&[]))
                    .unwrap();
            let expected = format!("{}://store.example.com", config.scheme());
            assert_eq!(config.base_url(), expected);
            assert_eq!(config.explicit_port(), None);
        }
    }

    #[test]
    fn test_base_url_includes_other_ports() {
        let config =
            MinioConfig::resolve(&options("localhost", "9000", false), env_of(&[])).unwrap();
        assert_eq!(config.base_url(), "http://localhost:9000");
        assert_eq!(config.explicit_port(), Some(9000));

        let config =
            MinioConfig::resolve(&options("minio.internal", "8443", true), env_of(&[])).unwrap();
        assert_eq!(config.base_url(), "https://minio.internal:8443");
    }

    #[test]
    fn test_base_url_ignores_non_numeric_ports() {
        for port in ["", "abc", "90a", "-1", "70000"] {
            let config =
                MinioConfig::resolve(&options("localhost", port, false), env_of(&[])).unwrap();
            assert_eq!(config.base_url(), "http://localhost", "port {port:?}");
            assert_eq!(config.explicit_port(), None);
            assert_eq!(config.port, port);
        }
    }

    #[test]
    fn test_options_from_host_json() {
        let options = MinioOptions::from_json(
            r#"{"endPoint":"store.example.com","port":443,"useSSL":true,"accessKey":"ak","secretKey":"sk","bucket":"media"}"#,
        )
        .unwrap();
        assert_eq!(options.endpoint.as_deref(), Some("store.example.com"));
        assert_eq!(options.port.as_deref(), Some("443"));
        assert_eq!(options.use_tls, Some(true));

        let options = MinioOptions::from_json(r#"{"port":"9000","useTLS":false}"#).unwrap();
        assert_eq!(options.port.as_deref(), Some("9000"));
        assert_eq!(options.use_tls, Some(false));

        assert!(MinioOptions::from_json("{not json").is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = MinioConfig::resolve(
            &MinioOptions {
                secret_key: Some("hunter2".to_string()),
                ..Default::default()
            },
            env_of(&[]),
        )
        .unwrap();
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
