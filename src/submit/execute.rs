//! Phase 2: Submission execution
//!
//! Uploads each planned file, records the created ids, and starts status
//! polling for every record the server accepted.

use crate::error::{Error, Result};
use crate::poll::{PollConfig, StatusTracker};
use crate::records::RecordStore;
use crate::session::SessionState;
use crate::submit::{
    Alert, PlannedUpload, ProgressCallback, SubmissionPlan, SubmissionState, SubmissionTransform,
    create_submission_plan,
};
use crate::transport::Transport;
use crate::types::{
    Quarter, RecordFilters, RecordMetadata, Section, SlotId, Status, SubmittedRecord,
};
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Shown when submit is requested with nothing staged
pub const NO_CHANGES_MESSAGE: &str = "No changes have been made to data files";

/// Shown when one or more uploads were refused by the server
pub const SUBMIT_FAILED_MESSAGE: &str =
    "Error: one or more data files could not be submitted. Please try again.";

/// Shown for any other failure during a submission
pub const UNEXPECTED_ERROR_MESSAGE: &str =
    "Something went wrong while submitting your data files. Please try again.";

/// Shown when the submission history cannot be loaded
pub const HISTORY_FAILED_MESSAGE: &str =
    "Error: the submission history could not be loaded. Please try again.";

/// An upload the server accepted
#[derive(Debug, Clone)]
pub struct SubmittedUpload {
    /// The planned upload
    pub upload: PlannedUpload,
    /// Id of the created record
    pub record_id: u64,
}

/// An upload that failed
#[derive(Debug, Clone)]
pub struct FailedUpload {
    /// The planned upload; its slot stays staged
    pub upload: PlannedUpload,
    /// Error message
    pub error: String,
    /// Whether the failure came from the transport
    pub transport: bool,
}

/// Result of submission execution
#[derive(Debug, Clone)]
pub struct SubmissionResult {
    /// Whether every upload succeeded
    pub success: bool,
    /// Uploads that created records
    pub submitted: Vec<SubmittedUpload>,
    /// Uploads that failed (non-fatal to siblings)
    pub failed: Vec<FailedUpload>,
    /// Banner summarizing the submission
    pub alert: Alert,
}

/// What a call to [`Submitter::submit`] did
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// Another submission was in flight; nothing happened
    Skipped,
    /// The submission ran
    Completed(SubmissionResult),
}

/// Clears the in-flight flag on every exit path
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Submission orchestrator
///
/// Owns the single-flight guard, the submission state and latest alert, and
/// the status tracker for records it creates.
pub struct Submitter {
    transport: Arc<dyn Transport>,
    records: RecordStore,
    tracker: StatusTracker,
    progress: Arc<dyn ProgressCallback>,
    in_flight: AtomicBool,
    state: watch::Sender<SubmissionState>,
    alert: Mutex<Option<Alert>>,
}

impl Submitter {
    /// Create a submitter writing into `records`
    pub fn new(
        transport: Arc<dyn Transport>,
        records: RecordStore,
        progress: Arc<dyn ProgressCallback>,
        poll_config: PollConfig,
    ) -> Self {
        let tracker = StatusTracker::new(
            Arc::clone(&transport),
            records.clone(),
            Arc::clone(&progress),
            poll_config,
        );
        let (state, _rx) = watch::channel(SubmissionState::Idle);

        Self {
            transport,
            records,
            tracker,
            progress,
            in_flight: AtomicBool::new(false),
            state,
            alert: Mutex::new(None),
        }
    }

    /// Status tracker for created records
    pub const fn tracker(&self) -> &StatusTracker {
        &self.tracker
    }

    /// Record store this submitter writes into
    pub const fn records(&self) -> &RecordStore {
        &self.records
    }

    /// Current submission state
    pub fn state(&self) -> SubmissionState {
        *self.state.borrow()
    }

    /// Receive submission state changes
    pub fn subscribe_state(&self) -> watch::Receiver<SubmissionState> {
        self.state.subscribe()
    }

    /// Latest banner, if any
    pub fn latest_alert(&self) -> Option<Alert> {
        self.alert
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Clear the latest banner
    pub fn dismiss_alert(&self) {
        *self.alert.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    async fn set_alert(&self, alert: Alert) {
        *self.alert.lock().unwrap_or_else(PoisonError::into_inner) = Some(alert.clone());
        self.progress.on_alert(&alert).await;
    }

    async fn set_state(&self, state: SubmissionState) {
        self.state.send_replace(state);
        self.progress.on_state(state).await;
    }

    /// Submit every unsubmitted file staged in `session`
    ///
    /// Fails with [`Error::NoChanges`] (and no transport call) when nothing
    /// is staged. While another submission is in flight on this submitter
    /// the call does nothing and returns [`SubmitOutcome::Skipped`].
    pub async fn submit(
        &self,
        session: &SessionState,
        transform: &dyn SubmissionTransform,
    ) -> Result<SubmitOutcome> {
        let (params, staged) = session.snapshot();
        if staged.is_empty() {
            self.set_alert(Alert::error(NO_CHANGES_MESSAGE)).await;
            return Err(Error::NoChanges);
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Submission already in flight, ignoring");
            return Ok(SubmitOutcome::Skipped);
        }
        let _in_flight = InFlight(&self.in_flight);

        self.set_state(SubmissionState::Submitting).await;
        self.dismiss_alert();

        let outcome = match create_submission_plan(&params, &staged, transform) {
            Ok(plan) => Ok(self.execute(&plan, session).await),
            Err(e) => Err(e),
        };

        let outcome = match outcome {
            Ok(result) => {
                self.set_alert(result.alert.clone()).await;
                Ok(SubmitOutcome::Completed(result))
            }
            Err(e) => {
                warn!("Submission failed: {e}");
                let message = if matches!(e, Error::NoChanges) {
                    NO_CHANGES_MESSAGE
                } else {
                    UNEXPECTED_ERROR_MESSAGE
                };
                self.progress.on_error(&e).await;
                self.set_alert(Alert::error(message)).await;
                Err(e)
            }
        };

        self.set_state(SubmissionState::Idle).await;
        outcome
    }

    /// Upload every file in `plan`, each independently of the others
    async fn execute(&self, plan: &SubmissionPlan, session: &SessionState) -> SubmissionResult {
        let mut submitted = Vec::new();
        let mut failed = Vec::new();

        for upload in &plan.uploads {
            let metadata = RecordMetadata {
                section: upload.section,
                quarter: upload.quarter,
                year: plan.session.year,
                program_type: plan.session.program_type,
                organization_id: plan.session.organization_id,
            };

            self.progress
                .on_message(&format!(
                    "Submitting {} for {} {}",
                    upload.file.file_name, upload.section, upload.quarter
                ))
                .await;

            match self.transport.create_record(upload, &metadata).await {
                Ok(created) => {
                    info!(
                        record_id = created.id,
                        slot = %upload.origin,
                        file = %upload.file.file_name,
                        "Record created"
                    );

                    if !session.mark_submitted(&upload.file, created.id) {
                        warn!(
                            slot = %upload.origin,
                            record_id = created.id,
                            "Slot changed while submitting, leaving it unsubmitted"
                        );
                    }

                    self.records.insert(SubmittedRecord {
                        id: created.id,
                        section: upload.section.label().to_string(),
                        quarter: upload.quarter,
                        year: plan.session.year,
                        created_at: created.created_at.unwrap_or_else(Utc::now),
                        submitted_by: created.submitted_by.clone().unwrap_or_default(),
                        file_name: upload.file.file_name.clone(),
                        status: Status::Pending,
                        error_count: 0,
                    });
                    self.tracker.track(created.id);

                    self.progress.on_record_created(upload, created.id).await;
                    submitted.push(SubmittedUpload {
                        upload: upload.clone(),
                        record_id: created.id,
                    });
                }
                Err(e) => {
                    warn!(slot = %upload.origin, "Upload failed: {e}");
                    self.progress.on_upload_failed(upload, &e).await;
                    failed.push(FailedUpload {
                        upload: upload.clone(),
                        error: e.to_string(),
                        transport: e.is_transport(),
                    });
                }
            }
        }

        let alert = if failed.is_empty() {
            Alert::success(success_message(&submitted))
        } else if failed.iter().all(|f| f.transport) {
            Alert::error(SUBMIT_FAILED_MESSAGE)
        } else {
            Alert::error(UNEXPECTED_ERROR_MESSAGE)
        };

        SubmissionResult {
            success: failed.is_empty(),
            submitted,
            failed,
            alert,
        }
    }

    /// Load the submission history for `filters` into the record store
    ///
    /// Records the server still reports as pending are tracked until they
    /// finish.
    pub async fn load_history(&self, filters: &RecordFilters) -> Result<Vec<SubmittedRecord>> {
        match self.transport.list_records(filters).await {
            Ok(records) => {
                self.records.replace_all(records.clone());
                for record in records.iter().filter(|r| r.status == Status::Pending) {
                    self.tracker.track(record.id);
                }
                Ok(records)
            }
            Err(e) => {
                warn!("Loading history failed: {e}");
                self.progress.on_error(&e).await;
                self.set_alert(Alert::error(HISTORY_FAILED_MESSAGE)).await;
                Err(e)
            }
        }
    }
}

/// Summary banner for the uploads that went through
///
/// Lists quarters when the uploads came from quarter slots and sections
/// otherwise, in natural order.
pub fn success_message(submitted: &[SubmittedUpload]) -> String {
    let by_quarter = submitted
        .iter()
        .any(|s| matches!(s.upload.origin, SlotId::Quarter(_)));

    if by_quarter {
        let quarters: BTreeSet<Quarter> = submitted.iter().map(|s| s.upload.quarter).collect();
        let items: Vec<String> = quarters.iter().map(ToString::to_string).collect();
        format!("Successfully submitted quarter(s): {}", join_with_and(&items))
    } else {
        let sections: BTreeSet<Section> = submitted.iter().map(|s| s.upload.section).collect();
        let items: Vec<String> = sections.iter().map(ToString::to_string).collect();
        format!("Successfully submitted section(s): {}", join_with_and(&items))
    }
}

/// Join items as "a", "a and b", "a, b and c"
pub fn join_with_and(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}
