// src/session/mod.rs
// JobSessionController - drives one upload -> generate -> result session

use crate::api::{ClientError, Job, JobStatus, StyleCatalog};
use crate::catalog::fallback_catalog;
use crate::client::{JobClient, PollOptions};
use crate::upload::{validate_upload, SelectedFile, ValidationError};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;

pub mod preview;
pub mod state;

pub use preview::{DataUrlPreviewStore, PreviewRef, PreviewStore};
pub use state::{SessionState, UiPhase};

const FAILED_FALLBACK_MESSAGE: &str = "Processing failed. Please try again.";

/// Notifications for whatever renders the session
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    PhaseChanged { phase: UiPhase },
    JobUpdated { job: Job },
    Completed { job: Job, result_location: String },
    Failed { message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Not allowed in the {actual} phase (expected {expected})")]
    InvalidPhase { expected: UiPhase, actual: UiPhase },

    #[error("No file selected")]
    NoFileSelected,

    #[error("No style selected")]
    NoStyleSelected,

    #[error("Unknown style: {0}")]
    UnknownStyle(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub struct JobSessionController {
    client: JobClient,
    previews: Arc<dyn PreviewStore>,
    poll: PollOptions,
    catalog: StyleCatalog,
    state: SessionState,
    events: Option<UnboundedSender<SessionEvent>>,
    cancel: CancellationToken,
}

impl JobSessionController {
    pub fn new(client: JobClient, poll: PollOptions) -> Self {
        Self {
            client,
            previews: Arc::new(DataUrlPreviewStore::new()),
            poll,
            catalog: StyleCatalog::new(Vec::new()),
            state: SessionState::default(),
            events: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_preview_store(mut self, previews: Arc<dyn PreviewStore>) -> Self {
        self.previews = previews;
        self
    }

    /// Start publishing [`SessionEvent`]s. Replaces any earlier subscriber.
    pub fn subscribe(&mut self) -> UnboundedReceiver<SessionEvent> {
        let (tx, rx) = unbounded_channel();
        self.events = Some(tx);
        rx
    }

    /// Token that stops an in-flight poll. Renewed on every reset.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn client(&self) -> &JobClient {
        &self.client
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> UiPhase {
        self.state.phase()
    }

    pub fn catalog(&self) -> &StyleCatalog {
        &self.catalog
    }

    /// Load presets from the server, falling back to the built-in catalog.
    pub async fn load_styles(&mut self) -> &StyleCatalog {
        self.catalog = match self.client.list_styles().await {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::warn!("Style catalog unavailable ({}), using built-in presets", e);
                fallback_catalog()
            }
        };
        &self.catalog
    }

    pub fn select_file(&mut self, file: SelectedFile) -> Result<(), SessionError> {
        self.require_phase(UiPhase::Upload)?;
        validate_upload(&file, self.client.limits())?;

        self.release_preview();
        self.state.preview = Some(self.previews.create(&file));
        tracing::info!("Selected {} ({} bytes)", file.name, file.size());
        self.state.file = Some(file);
        Ok(())
    }

    pub fn clear_file(&mut self) -> Result<(), SessionError> {
        self.require_phase(UiPhase::Upload)?;
        self.release_preview();
        self.state.file = None;
        Ok(())
    }

    pub fn select_style(&mut self, style_id: &str) -> Result<(), SessionError> {
        self.require_phase(UiPhase::Upload)?;

        if !self.catalog.styles.is_empty() && !self.catalog.contains(style_id) {
            return Err(SessionError::UnknownStyle(style_id.to_string()));
        }

        self.state.style_id = Some(style_id.to_string());
        Ok(())
    }

    /// Create the job and poll it to completion.
    ///
    /// Precondition failures leave the session in `upload` and return an
    /// error. Once the job is submitted every failure lands in the `error`
    /// phase instead, and the resulting phase is returned.
    pub async fn generate(&mut self) -> Result<UiPhase, SessionError> {
        self.require_phase(UiPhase::Upload)?;
        let style_id = self
            .state
            .style_id
            .clone()
            .ok_or(SessionError::NoStyleSelected)?;
        if self.state.file.is_none() {
            return Err(SessionError::NoFileSelected);
        }

        self.state.in_flight = true;
        self.emit_phase();

        let created = match self.state.file.as_ref() {
            Some(_) if self.cancel.is_cancelled() => Err(ClientError::Cancelled),
            Some(file) => {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => Err(ClientError::Cancelled),
                    created = self.client.create_job(file, &style_id) => created,
                }
            }
            None => Err(ClientError::Protocol("selected file disappeared".to_string())),
        };
        let job = match created {
            Ok(job) => job,
            Err(e) => return Ok(self.fail(&e)),
        };

        self.state.job = Some(job.clone());
        emit(self.events.as_ref(), SessionEvent::JobUpdated { job: job.clone() });

        let events = self.events.as_ref();
        let slot = &mut self.state.job;
        let polled = self
            .client
            .poll_job_cancellable(&job.id, self.poll, &self.cancel, |snapshot| {
                emit(events, SessionEvent::JobUpdated { job: snapshot.clone() });
                *slot = Some(snapshot);
            })
            .await;

        let phase = match polled {
            Ok(job) => self.finish(job),
            Err(e) => self.fail(&e),
        };
        Ok(phase)
    }

    /// Clear file, preview, style, job and error in one step
    pub fn reset(&mut self) {
        self.release_preview();
        self.state = SessionState::default();
        self.cancel = CancellationToken::new();
        tracing::info!("Session reset");
        self.emit_phase();
    }

    fn finish(&mut self, job: Job) -> UiPhase {
        self.state.in_flight = false;

        match job.status {
            JobStatus::Completed => match job.result_reference().map(str::to_string) {
                Some(reference) => {
                    let location = self.client.resolve_result_location(&reference);
                    tracing::info!("Job {} completed: {}", job.id, location);
                    self.state.result_location = Some(location.clone());
                    self.state.job = Some(job.clone());
                    emit(
                        self.events.as_ref(),
                        SessionEvent::Completed {
                            job,
                            result_location: location,
                        },
                    );
                    self.emit_phase();
                    self.phase()
                }
                None => self.fail(&ClientError::Protocol(format!(
                    "job {} completed without a result",
                    job.id
                ))),
            },
            JobStatus::Failed => {
                let message = job
                    .error_message()
                    .unwrap_or(FAILED_FALLBACK_MESSAGE)
                    .to_string();
                tracing::error!("Job {} failed: {}", job.id, message);
                self.state.job = Some(job);
                self.fail_with(message)
            }
            status => self.fail(&ClientError::Protocol(format!(
                "poll returned non-terminal status {}",
                status
            ))),
        }
    }

    fn fail(&mut self, error: &ClientError) -> UiPhase {
        tracing::error!("Generation failed: {}", error);
        self.fail_with(error.user_message())
    }

    fn fail_with(&mut self, message: String) -> UiPhase {
        self.state.in_flight = false;
        self.state.error = Some(message.clone());
        emit(self.events.as_ref(), SessionEvent::Failed { message });
        self.emit_phase();
        self.phase()
    }

    fn release_preview(&mut self) {
        if let Some(preview) = self.state.preview.take() {
            self.previews.revoke(preview);
        }
    }

    fn require_phase(&self, expected: UiPhase) -> Result<(), SessionError> {
        let actual = self.phase();
        if actual == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidPhase { expected, actual })
        }
    }

    fn emit_phase(&self) {
        emit(
            self.events.as_ref(),
            SessionEvent::PhaseChanged {
                phase: self.phase(),
            },
        );
    }
}

impl Drop for JobSessionController {
    fn drop(&mut self) {
        self.release_preview();
    }
}

fn emit(events: Option<&UnboundedSender<SessionEvent>>, event: SessionEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}
