use super::preview::PreviewRef;
use crate::api::Job;
use crate::upload::SelectedFile;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UiPhase {
    Upload,
    Processing,
    Result,
    Error,
}

impl fmt::Display for UiPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UiPhase::Upload => "upload",
            UiPhase::Processing => "processing",
            UiPhase::Result => "result",
            UiPhase::Error => "error",
        };
        f.write_str(name)
    }
}

/// Client-local session data. Only the controller mutates it.
#[derive(Debug, Default)]
pub struct SessionState {
    pub(super) file: Option<SelectedFile>,
    pub(super) preview: Option<PreviewRef>,
    pub(super) style_id: Option<String>,
    pub(super) job: Option<Job>,
    pub(super) error: Option<String>,
    pub(super) result_location: Option<String>,
    pub(super) in_flight: bool,
}

impl SessionState {
    /// The phase is derived, never stored. An error always wins so a
    /// processing indicator is never shown next to one.
    pub fn phase(&self) -> UiPhase {
        if self.error.is_some() {
            UiPhase::Error
        } else if self.result_location.is_some() {
            UiPhase::Result
        } else if self.in_flight || self.job.is_some() {
            UiPhase::Processing
        } else {
            UiPhase::Upload
        }
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    pub fn preview(&self) -> Option<&PreviewRef> {
        self.preview.as_ref()
    }

    pub fn style_id(&self) -> Option<&str> {
        self.style_id.as_deref()
    }

    pub fn job(&self) -> Option<&Job> {
        self.job.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn result_location(&self) -> Option<&str> {
        self.result_location.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.file.is_none()
            && self.preview.is_none()
            && self.style_id.is_none()
            && self.job.is_none()
            && self.error.is_none()
            && self.result_location.is_none()
            && !self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::JobStatus;
    use crate::testing::job;

    #[test]
    fn test_phase_derivation() {
        let mut state = SessionState::default();
        assert_eq!(state.phase(), UiPhase::Upload);
        assert!(state.is_empty());

        state.in_flight = true;
        assert_eq!(state.phase(), UiPhase::Processing);

        state.job = Some(job("j", JobStatus::Processing, 20, None));
        assert_eq!(state.phase(), UiPhase::Processing);

        state.in_flight = false;
        state.result_location = Some("http://h/outputs/j.png".to_string());
        assert_eq!(state.phase(), UiPhase::Result);

        state.error = Some("boom".to_string());
        assert_eq!(state.phase(), UiPhase::Error);
    }
}
