// src/client/mod.rs
// JobClient - REST calls plus the job polling loop

mod location;
mod retry;

pub use location::resolve_result_location;
pub use retry::RetryPolicy;

use crate::api::{
    ClientError, HealthStatus, HttpJobApi, Job, JobApi, ServiceMetrics, StyleCatalog,
};
use crate::config::ClientConfig;
use crate::upload::{validate_upload, SelectedFile, UploadLimits};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(300_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Delay between the end of one fetch and the start of the next
    pub interval: Duration,
    /// Wall-clock budget measured from the start of the poll
    pub timeout: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

pub struct JobClient {
    api: Box<dyn JobApi>,
    retry: RetryPolicy,
    limits: UploadLimits,
}

impl JobClient {
    pub fn new(api: Box<dyn JobApi>) -> Self {
        Self {
            api,
            retry: RetryPolicy::none(),
            limits: UploadLimits::default(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let api = HttpJobApi::new(config.api_url.clone(), config.request_timeout())?;
        Ok(Self::new(Box::new(api))
            .with_retry(config.retry_policy())
            .with_limits(config.upload_limits()))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_limits(mut self, limits: UploadLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn origin(&self) -> &str {
        self.api.origin()
    }

    pub fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    /// Fetch the style catalog. The reported count must match the list.
    pub async fn list_styles(&self) -> Result<StyleCatalog, ClientError> {
        let catalog = self.retrying("list_styles", || self.api.list_styles()).await?;

        if catalog.count != catalog.styles.len() {
            return Err(ClientError::Protocol(format!(
                "style catalog reports count {} but lists {} styles",
                catalog.count,
                catalog.styles.len()
            )));
        }

        tracing::info!("Loaded {} styles", catalog.count);
        Ok(catalog)
    }

    /// Submit a new job. Never retried: the request is not idempotent.
    pub async fn create_job(&self, image: &SelectedFile, style_id: &str) -> Result<Job, ClientError> {
        validate_upload(image, &self.limits)?;

        let job = self.api.create_job(image, style_id).await?;
        tracing::info!(
            "Job {} created: style={}, status={}",
            job.id,
            job.style_id,
            job.status
        );
        Ok(job)
    }

    pub async fn get_job(&self, job_id: &str) -> Result<Job, ClientError> {
        self.retrying("get_job", || self.api.get_job(job_id)).await
    }

    /// Poll until the job is terminal or `options.timeout` is exceeded.
    ///
    /// `on_update` receives every fetched snapshot, terminal or not, before
    /// termination is evaluated. A fetch error aborts the poll.
    pub async fn poll_job<F>(
        &self,
        job_id: &str,
        options: PollOptions,
        on_update: F,
    ) -> Result<Job, ClientError>
    where
        F: FnMut(Job),
    {
        let never = CancellationToken::new();
        self.poll_job_cancellable(job_id, options, &never, on_update)
            .await
    }

    /// Same as [`JobClient::poll_job`], stopping early with
    /// [`ClientError::Cancelled`] once `cancel` fires.
    pub async fn poll_job_cancellable<F>(
        &self,
        job_id: &str,
        options: PollOptions,
        cancel: &CancellationToken,
        mut on_update: F,
    ) -> Result<Job, ClientError>
    where
        F: FnMut(Job),
    {
        let started = Instant::now();
        let mut polls = 0u32;
        let mut last_progress: Option<u8> = None;

        tracing::info!(
            "Polling job {} every {}ms (timeout {}ms)",
            job_id,
            options.interval.as_millis(),
            options.timeout.as_millis()
        );

        loop {
            let job = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("Polling job {} cancelled after {} polls", job_id, polls);
                    return Err(ClientError::Cancelled);
                }
                fetched = self.get_job(job_id) => match fetched {
                    Ok(job) => job,
                    Err(e) => {
                        tracing::error!("Polling job {} aborted after {} polls: {}", job_id, polls, e);
                        return Err(e);
                    }
                },
            };
            polls += 1;

            if let Some(previous) = last_progress {
                if job.progress < previous {
                    tracing::debug!(
                        "Job {} progress moved backwards ({} -> {})",
                        job_id,
                        previous,
                        job.progress
                    );
                }
            }
            last_progress = Some(job.progress);

            tracing::debug!(
                "Job {} poll #{}: status={}, progress={}%",
                job_id,
                polls,
                job.status,
                job.progress_percent()
            );

            let status = job.status;
            on_update(job.clone());

            if status.is_terminal() {
                tracing::info!("Job {} reached {} after {} polls", job_id, status, polls);
                return Ok(job);
            }

            let elapsed = started.elapsed();
            if elapsed > options.timeout {
                tracing::warn!(
                    "Job {} still {} after {:?} ({} polls), giving up",
                    job_id,
                    status,
                    elapsed,
                    polls
                );
                return Err(ClientError::Timeout {
                    elapsed,
                    last_status: status,
                });
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("Polling job {} cancelled after {} polls", job_id, polls);
                    return Err(ClientError::Cancelled);
                }
                _ = sleep(options.interval) => {}
            }
        }
    }

    pub fn resolve_result_location(&self, path_or_url: &str) -> String {
        resolve_result_location(self.origin(), path_or_url)
    }

    /// Download the transformed image behind a result reference
    pub async fn fetch_result(&self, path_or_url: &str) -> Result<Vec<u8>, ClientError> {
        let location = self.resolve_result_location(path_or_url);
        let bytes = self
            .retrying("fetch_result", || self.api.fetch_bytes(&location))
            .await?;
        tracing::info!("Downloaded {} bytes from {}", bytes.len(), location);
        Ok(bytes)
    }

    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        self.api.health().await
    }

    pub async fn metrics(&self) -> Result<ServiceMetrics, ClientError> {
        self.api.metrics().await
    }

    async fn retrying<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let mut attempt = 0u8;

        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if self.retry.should_retry(attempt, &e) {
                        tracing::warn!(
                            "{} attempt {}/{} failed: {}",
                            operation,
                            u32::from(attempt) + 1,
                            u32::from(self.retry.max_retries()) + 1,
                            e
                        );
                        self.retry.wait_before_retry(attempt).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(e);
                }
            }
        }
    }
}
