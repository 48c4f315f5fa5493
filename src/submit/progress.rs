//! Submission state, alerts, and the observer hook for both
//!
//! The orchestrator and the status tracker report through
//! [`ProgressCallback`]; the CLI prints, tests record.

use crate::error::Error;
use crate::submit::PlannedUpload;
use crate::types::Status;
use async_trait::async_trait;
use std::fmt;

/// Submission state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmissionState {
    /// Ready to accept a submission
    #[default]
    Idle,
    /// A submission is in flight
    Submitting,
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Submitting => write!(f, "Submitting"),
        }
    }
}

/// Banner severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    /// Submission succeeded
    Success,
    /// Something failed; the user may retry
    Error,
    /// Informational, not a failure (e.g. still processing)
    Advisory,
}

/// User-facing banner message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    /// Severity
    pub kind: AlertKind,
    /// Message text
    pub message: String,
}

impl Alert {
    /// Success banner
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Success,
            message: message.into(),
        }
    }

    /// Error banner
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Error,
            message: message.into(),
        }
    }

    /// Advisory banner
    pub fn advisory(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Advisory,
            message: message.into(),
        }
    }
}

/// Observer for submissions and the pollers they start
///
/// Methods are awaited inline, so implementations should return quickly.
#[async_trait]
pub trait ProgressCallback: Send + Sync {
    /// Called when the submission state changes
    async fn on_state(&self, state: SubmissionState);

    /// Called when the server created a record for an upload
    async fn on_record_created(&self, upload: &PlannedUpload, record_id: u64);

    /// Called when one upload failed (siblings still proceed)
    async fn on_upload_failed(&self, upload: &PlannedUpload, error: &Error);

    /// Called when a record reaches a terminal status
    async fn on_status(&self, record_id: u64, status: Status);

    /// Called when an error occurs (non-fatal)
    async fn on_error(&self, error: &Error);

    /// Called when the latest alert changes
    async fn on_alert(&self, alert: &Alert);

    /// Called with a general status message
    async fn on_message(&self, message: &str);
}

/// Ignores every event
pub struct NoopProgress;

#[async_trait]
impl ProgressCallback for NoopProgress {
    async fn on_state(&self, _state: SubmissionState) {}
    async fn on_record_created(&self, _upload: &PlannedUpload, _record_id: u64) {}
    async fn on_upload_failed(&self, _upload: &PlannedUpload, _error: &Error) {}
    async fn on_status(&self, _record_id: u64, _status: Status) {}
    async fn on_error(&self, _error: &Error) {}
    async fn on_alert(&self, _alert: &Alert) {}
    async fn on_message(&self, _message: &str) {}
}
