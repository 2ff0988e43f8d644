// Scripted in-memory backend for unit tests

use crate::api::{
    ClientError, HealthStatus, Job, JobApi, JobStatus, ServiceMetrics, StyleCatalog,
};
use crate::upload::SelectedFile;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn job(id: &str, status: JobStatus, progress: u8, result_url: Option<&str>) -> Job {
    let now = Utc::now();
    Job {
        id: id.to_string(),
        status,
        progress,
        result_url: result_url.map(str::to_string),
        error: None,
        style_id: "cyberpunk".to_string(),
        created_at: now,
        updated_at: now,
    }
}

pub fn server_error(status: u16, detail: &str) -> ClientError {
    ClientError::Server {
        status,
        message: "error".to_string(),
        detail: Some(detail.to_string()),
        request_id: Some("req-1234".to_string()),
    }
}

pub fn jpeg_file(name: &str, len: usize) -> SelectedFile {
    let mut bytes = vec![0u8; len.max(3)];
    bytes[..3].copy_from_slice(b"\xff\xd8\xff");
    SelectedFile::new(name, "image/jpeg", bytes)
}

/// `get_job` answers from a queue, then repeats the fallback snapshot
pub struct ScriptedApi {
    origin: String,
    jobs: Mutex<VecDeque<Result<Job, ClientError>>>,
    fallback: Mutex<Option<Job>>,
    catalog: Mutex<Option<Result<StyleCatalog, ClientError>>>,
    create: Mutex<Option<Result<Job, ClientError>>>,
    create_delay: Mutex<Option<Duration>>,
    get_calls: AtomicUsize,
    create_calls: AtomicUsize,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::with_origin("http://localhost:8000")
    }

    pub fn with_origin(origin: &str) -> Self {
        Self {
            origin: origin.to_string(),
            jobs: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(None),
            catalog: Mutex::new(None),
            create: Mutex::new(None),
            create_delay: Mutex::new(None),
            get_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
        }
    }

    pub fn push_job(&self, response: Result<Job, ClientError>) {
        self.jobs.lock().unwrap().push_back(response);
    }

    pub fn set_fallback(&self, job: Job) {
        *self.fallback.lock().unwrap() = Some(job);
    }

    pub fn set_catalog(&self, catalog: Result<StyleCatalog, ClientError>) {
        *self.catalog.lock().unwrap() = Some(catalog);
    }

    pub fn set_create(&self, response: Result<Job, ClientError>) {
        *self.create.lock().unwrap() = Some(response);
    }

    /// Stall `create_job` for `delay` before answering
    pub fn set_create_delay(&self, delay: Duration) {
        *self.create_delay.lock().unwrap() = Some(delay);
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobApi for ScriptedApi {
    async fn list_styles(&self) -> Result<StyleCatalog, ClientError> {
        self.catalog
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(ClientError::Network("no catalog scripted".to_string())))
    }

    async fn create_job(&self, _image: &SelectedFile, style_id: &str) -> Result<Job, ClientError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.create_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(response) = self.create.lock().unwrap().clone() {
            return response;
        }
        let mut created = job("created", JobStatus::Pending, 0, None);
        created.style_id = style_id.to_string();
        Ok(created)
    }

    async fn get_job(&self, job_id: &str) -> Result<Job, ClientError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(response) = self.jobs.lock().unwrap().pop_front() {
            return response;
        }
        match self.fallback.lock().unwrap().clone() {
            Some(job) => Ok(job),
            None => Err(ClientError::Server {
                status: 404,
                message: "Not Found".to_string(),
                detail: Some(format!("Job '{}' not found", job_id)),
                request_id: None,
            }),
        }
    }

    async fn health(&self) -> Result<HealthStatus, ClientError> {
        Ok(HealthStatus {
            status: "healthy".to_string(),
            version: "1.0.0".to_string(),
            redis_connected: true,
        })
    }

    async fn metrics(&self) -> Result<ServiceMetrics, ClientError> {
        Ok(ServiceMetrics::default())
    }

    async fn fetch_bytes(&self, _location: &str) -> Result<Vec<u8>, ClientError> {
        Ok(b"\x89PNG\r\n\x1a\n".to_vec())
    }

    fn origin(&self) -> &str {
        &self.origin
    }
}
