// src/api/mod.rs
// REST boundary - the StyleForge HTTP API

mod http;
mod types;

pub use http::HttpJobApi;
pub use types::{
    ClientError, ErrorBody, HealthStatus, Job, JobStatus, ServiceMetrics, StyleCatalog,
    StylePreset,
};

use crate::upload::SelectedFile;
use async_trait::async_trait;
use std::sync::Arc;

/// Raw operations exposed by the backend.
///
/// Implementations perform exactly one request per call; retries,
/// validation and polling are layered on top by [`crate::client::JobClient`].
#[async_trait]
pub trait JobApi: Send + Sync {
    /// `GET /api/styles`
    async fn list_styles(&self) -> Result<StyleCatalog, ClientError>;

    /// `POST /api/jobs` (multipart: `image`, `style_id`)
    async fn create_job(&self, image: &SelectedFile, style_id: &str) -> Result<Job, ClientError>;

    /// `GET /api/jobs/{job_id}`
    async fn get_job(&self, job_id: &str) -> Result<Job, ClientError>;

    /// `GET /health`
    async fn health(&self) -> Result<HealthStatus, ClientError>;

    /// `GET /metrics`
    async fn metrics(&self) -> Result<ServiceMetrics, ClientError>;

    /// Download raw bytes from an absolute location
    async fn fetch_bytes(&self, location: &str) -> Result<Vec<u8>, ClientError>;

    /// Backend origin that relative result locations resolve against
    fn origin(&self) -> &str;
}

#[async_trait]
impl<T: JobApi + ?Sized> JobApi for Arc<T> {
    async fn list_styles(&self) -> Result<StyleCatalog, ClientError> {
        (**self).list_styles().await
    }

    async fn create_job(&self, image: &SelectedFile, style_id: &str) -> Result<Job, ClientError> {
        (**self).create_job(image, style_id).await
    }

    async fn get_job(&self, job_id: &str) -> Result<Job, ClientError> {
        (**self).get_job(job_id).await
    }

    async fn health(&self) -> Result<HealthStatus, ClientError> {
        (**self).health().await
    }

    async fn metrics(&self) -> Result<ServiceMetrics, ClientError> {
        (**self).metrics().await
    }

    async fn fetch_bytes(&self, location: &str) -> Result<Vec<u8>, ClientError> {
        (**self).fetch_bytes(location).await
    }

    fn origin(&self) -> &str {
        (**self).origin()
    }
}
