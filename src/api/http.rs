// src/api/http.rs
// reqwest implementation of the StyleForge REST API

use super::{
    ClientError, ErrorBody, HealthStatus, Job, JobApi, ServiceMetrics, StyleCatalog,
};
use crate::upload::{SelectedFile, ValidationError};
use async_trait::async_trait;
use reqwest::{multipart, Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub struct HttpJobApi {
    client: Client,
    origin: String,
}

impl HttpJobApi {
    pub fn new(origin: impl Into<String>, request_timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ClientError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(client, origin))
    }

    /// Reuse an existing [`reqwest::Client`] and its connection pool
    pub fn with_client(client: Client, origin: impl Into<String>) -> Self {
        let origin = origin.into().trim_end_matches('/').to_string();
        tracing::info!("StyleForge API client initialized: origin={}", origin);
        Self { client, origin }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.origin, path)
    }

    /// `/api/jobs/{id}` with the id percent-encoded as one path segment
    fn job_url(&self, job_id: &str) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.endpoint("/api/jobs"))
            .map_err(|e| ClientError::Network(format!("invalid API URL {}: {}", self.origin, e)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Network(format!("invalid API URL {}", self.origin)))?
            .push(job_id);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.endpoint(path);
        tracing::debug!("GET {}", url);
        let response = self.client.get(&url).send().await?;
        parse_response(response).await
    }
}

async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let response = ensure_success(response).await?;
    let raw = response.text().await?;
    decode_body(&raw)
}

fn decode_body<T: DeserializeOwned>(raw: &str) -> Result<T, ClientError> {
    serde_json::from_str(raw)
        .map_err(|e| ClientError::Protocol(format!("malformed response body: {}", e)))
}

/// Map a non-success response onto [`ClientError::Server`]
async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let header_request_id = response
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let raw = response.text().await.unwrap_or_default();
    let error = server_error(status, header_request_id, &raw);

    if let ClientError::Server {
        message,
        detail,
        request_id,
        ..
    } = &error
    {
        tracing::warn!(
            "Server returned {}: {} (detail={:?}, request_id={:?})",
            status.as_u16(),
            message,
            detail,
            request_id
        );
    }

    Err(error)
}

/// Build the error for a failed response. The body may be the service's
/// JSON envelope, a bare `{"detail": ...}`, or not JSON at all.
fn server_error(status: StatusCode, header_request_id: Option<String>, raw: &str) -> ClientError {
    let body: ErrorBody = serde_json::from_str(raw).unwrap_or_default();

    let detail = body.detail_text();
    let message = body
        .error
        .filter(|e| !e.trim().is_empty())
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
    let request_id = body.request_id.or(header_request_id);

    ClientError::Server {
        status: status.as_u16(),
        message,
        detail,
        request_id,
    }
}

#[async_trait]
impl JobApi for HttpJobApi {
    async fn list_styles(&self) -> Result<StyleCatalog, ClientError> {
        self.get_json("/api/styles").await
    }

    async fn create_job(&self, image: &SelectedFile, style_id: &str) -> Result<Job, ClientError> {
        let image_part = multipart::Part::bytes(image.bytes.clone())
            .file_name(image.name.clone())
            .mime_str(&image.media_type)
            .map_err(|_| ValidationError::UnsupportedMediaType(image.media_type.clone()))?;

        let form = multipart::Form::new()
            .part("image", image_part)
            .text("style_id", style_id.to_string());

        let url = self.endpoint("/api/jobs");
        tracing::debug!("POST {} ({} bytes, style={})", url, image.size(), style_id);

        let response = self.client.post(&url).multipart(form).send().await?;
        parse_response(response).await
    }

    async fn get_job(&self, job_id: &str) -> Result<Job, ClientError> {
        let url = self.job_url(job_id)?;
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        parse_response(response).await
    }

    async fn health(&self) -> Result<HealthStatus, ClientError> {
        self.get_json("/health").await
    }

    async fn metrics(&self) -> Result<ServiceMetrics, ClientError> {
        self.get_json("/metrics").await
    }

    async fn fetch_bytes(&self, location: &str) -> Result<Vec<u8>, ClientError> {
        tracing::debug!("GET {}", location);
        let response = self.client.get(location).send().await?;
        let response = ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    fn origin(&self) -> &str {
        &self.origin
    }
}
