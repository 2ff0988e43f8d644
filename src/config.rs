use crate::client::{PollOptions, RetryPolicy};
use crate::upload::UploadLimits;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 300_000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1000;
pub const DEFAULT_MAX_UPLOAD_MB: u64 = crate::upload::DEFAULT_MAX_UPLOAD_MB;

pub const CONFIG_PATH_ENV: &str = "STYLEFORGE_CONFIG";
const API_URL_ENV: &str = "STYLEFORGE_API_URL";
const POLL_INTERVAL_ENV: &str = "STYLEFORGE_POLL_INTERVAL_MS";
const POLL_TIMEOUT_ENV: &str = "STYLEFORGE_POLL_TIMEOUT_MS";
const REQUEST_TIMEOUT_ENV: &str = "STYLEFORGE_REQUEST_TIMEOUT_SECS";
const MAX_RETRIES_ENV: &str = "STYLEFORGE_MAX_RETRIES";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_url: String,
    pub poll_interval_ms: u64,
    pub poll_timeout_ms: u64,
    pub request_timeout_secs: u64,
    pub max_retries: u8,
    pub retry_base_delay_ms: u64,
    pub max_upload_mb: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            poll_timeout_ms: DEFAULT_POLL_TIMEOUT_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_retries: 0,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
        }
    }
}

impl ClientConfig {
    /// Defaults, then `$STYLEFORGE_CONFIG` if set, then environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => load_file(Path::new(path.trim()))?,
            _ => ClientConfig::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        normalize_config(&mut config);

        tracing::info!(
            "Config loaded: api_url={}, poll_interval={}ms, poll_timeout={}ms, max_retries={}",
            config.api_url,
            config.poll_interval_ms,
            config.poll_timeout_ms,
            config.max_retries
        );
        Ok(config)
    }

    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(API_URL_ENV) {
            self.api_url = url;
        }
        if let Some(ms) = parse_env(&lookup, POLL_INTERVAL_ENV) {
            self.poll_interval_ms = ms;
        }
        if let Some(ms) = parse_env(&lookup, POLL_TIMEOUT_ENV) {
            self.poll_timeout_ms = ms;
        }
        if let Some(secs) = parse_env(&lookup, REQUEST_TIMEOUT_ENV) {
            self.request_timeout_secs = secs;
        }
        if let Some(retries) = parse_env(&lookup, MAX_RETRIES_ENV) {
            self.max_retries = retries;
        }
    }

    pub fn poll_options(&self) -> PollOptions {
        PollOptions {
            interval: Duration::from_millis(self.poll_interval_ms),
            timeout: Duration::from_millis(self.poll_timeout_ms),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.retry_base_delay_ms),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn upload_limits(&self) -> UploadLimits {
        UploadLimits::from_megabytes(self.max_upload_mb)
    }
}

fn parse_env<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid {}={:?}", key, raw);
            None
        }
    }
}

/// Read a JSON config file. A missing file yields defaults; an unparsable one
/// is copied to `*.json.bak` and replaced by defaults.
pub fn load_file(path: &Path) -> Result<ClientConfig, ConfigError> {
    if !path.exists() {
        tracing::info!("No config file at {}, using defaults", path.display());
        return Ok(ClientConfig::default());
    }

    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    match serde_json::from_str::<ClientConfig>(&raw) {
        Ok(mut config) => {
            normalize_config(&mut config);
            Ok(config)
        }
        Err(e) => {
            let backup = path.with_extension("json.bak");
            tracing::warn!(
                "Config {} is invalid ({}), backing up to {} and using defaults",
                path.display(),
                e,
                backup.display()
            );
            let _ = fs::copy(path, backup);
            Ok(ClientConfig::default())
        }
    }
}

pub fn normalize_api_url(input: &str) -> String {
    let trimmed = input.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        DEFAULT_API_URL.to_string()
    } else {
        trimmed.to_string()
    }
}

fn normalize_config(config: &mut ClientConfig) {
    config.api_url = normalize_api_url(&config.api_url);
    if config.poll_interval_ms == 0 {
        config.poll_interval_ms = DEFAULT_POLL_INTERVAL_MS;
    }
    if config.poll_timeout_ms == 0 {
        config.poll_timeout_ms = DEFAULT_POLL_TIMEOUT_MS;
    }
    if config.request_timeout_secs == 0 {
        config.request_timeout_secs = DEFAULT_REQUEST_TIMEOUT_SECS;
    }
    if config.max_upload_mb == 0 {
        config.max_upload_mb = DEFAULT_MAX_UPLOAD_MB;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.api_url, "http://localhost:8000");
        assert_eq!(config.poll_options(), PollOptions::default());
        assert_eq!(config.retry_policy().max_retries(), 0);
        assert_eq!(config.upload_limits().max_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_normalize_api_url() {
        assert_eq!(normalize_api_url("http://h:8000/"), "http://h:8000");
        assert_eq!(normalize_api_url("   "), DEFAULT_API_URL);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (API_URL_ENV, "https://styleforge.example.com/"),
            (POLL_INTERVAL_ENV, "250"),
            (MAX_RETRIES_ENV, "3"),
            (POLL_TIMEOUT_ENV, "soon"),
        ]
        .into_iter()
        .collect();

        let mut config = ClientConfig::default();
        config.apply_env(|key| vars.get(key).map(|v| v.to_string()));
        normalize_config(&mut config);

        assert_eq!(config.api_url, "https://styleforge.example.com");
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.poll_timeout_ms, DEFAULT_POLL_TIMEOUT_MS);
    }

    #[test]
    fn test_load_file_partial_and_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("styleforge.json");
        fs::write(&path, r#"{"api_url":"http://10.0.0.5:8000/","poll_interval_ms":0}"#).unwrap();

        let config = load_file(&path).unwrap();
        assert_eq!(config.api_url, "http://10.0.0.5:8000");
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(config.poll_timeout_ms, DEFAULT_POLL_TIMEOUT_MS);
    }

    #[test]
    fn test_load_file_corrupt_is_backed_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("styleforge.json");
        fs::write(&path, "{ not json").unwrap();

        let config = load_file(&path).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert!(dir.path().join("styleforge.json.bak").exists());
    }

    #[test]
    fn test_load_file_missing_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_file(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, ClientConfig::default());
    }
}
