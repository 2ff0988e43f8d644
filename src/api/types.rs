// src/api/types.rs
// Wire types and error definitions for the StyleForge REST boundary

use crate::upload::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Immutable catalog entry describing one style transformation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StylePreset {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Generation prompt template, opaque to the client
    pub prompt: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleCatalog {
    pub styles: Vec<StylePreset>,
    pub count: usize,
}

impl StyleCatalog {
    pub fn new(styles: Vec<StylePreset>) -> Self {
        let count = styles.len();
        Self { styles, count }
    }

    pub fn contains(&self, style_id: &str) -> bool {
        self.styles.iter().any(|s| s.id == style_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server snapshot of one transformation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "job_id")]
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub result_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    pub style_id: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The result reference, if present and non-blank
    pub fn result_reference(&self) -> Option<&str> {
        self.result_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress.min(100)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    #[serde(default)]
    pub redis_connected: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceMetrics {
    pub total_jobs: u64,
    pub completed_jobs: u64,
    pub failed_jobs: u64,
    pub pending_jobs: u64,
    pub processing_jobs: u64,
}

/// Error body returned on non-success statuses.
///
/// Handlers emit `{error, detail?, request_id?}`, framework-level rejections
/// emit `{detail}` where `detail` may be a string or a list of issues.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
    #[serde(default)]
    pub request_id: Option<String>,
}

impl ErrorBody {
    pub fn detail_text(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) if s.trim().is_empty() => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Errors surfaced by the REST client and the polling loop
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({status}): {message}")]
    Server {
        status: u16,
        message: String,
        detail: Option<String>,
        request_id: Option<String>,
    },

    #[error("Timed out after {elapsed:?} waiting for job (last status: {last_status})")]
    Timeout {
        elapsed: Duration,
        last_status: JobStatus,
    },

    #[error("Protocol violation: {0}")]
    Protocol(String),

    #[error("Cancelled")]
    Cancelled,
}

impl ClientError {
    /// Returns true if a retry could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Network(_) => true,
            ClientError::Server { status, .. } => matches!(status, 429 | 502 | 503 | 504),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Server { status: 404, .. })
    }

    /// Single display string for the error phase
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(e) => e.to_string(),
            ClientError::Network(_) => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            ClientError::Server {
                message, detail, ..
            } => detail.clone().unwrap_or_else(|| message.clone()),
            ClientError::Timeout { .. } => {
                "Processing timed out. The job did not finish in time; please try again."
                    .to_string()
            }
            ClientError::Protocol(msg) => format!("Unexpected response from server: {}", msg),
            ClientError::Cancelled => "Generation was cancelled.".to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Protocol(format!("malformed response body: {}", e))
        } else if e.is_timeout() {
            ClientError::Network(format!("request timed out: {}", e))
        } else {
            ClientError::Network(e.to_string())
        }
    }
}

/// Accepts RFC 3339 and naive ISO-8601 timestamps; naive values are UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", raw)))
    }

    pub(super) fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}
