//! Two-phase submission engine
//!
//! Handles the workflow of submitting staged data files:
//! 1. Planning - map staged files to uploads through a transform
//! 2. Execution - create server records, update staging, start polling

mod execute;
mod plan;
mod progress;

pub use execute::{
    FailedUpload, HISTORY_FAILED_MESSAGE, NO_CHANGES_MESSAGE, SUBMIT_FAILED_MESSAGE,
    SubmissionResult, SubmitOutcome, SubmittedUpload, Submitter, UNEXPECTED_ERROR_MESSAGE,
    join_with_and, success_message,
};
pub use plan::{
    PlannedUpload, QuarterlyAuditTransform, SectionTransform, SubmissionPlan, SubmissionTransform,
    create_submission_plan, transform_for,
};
pub use progress::{Alert, AlertKind, NoopProgress, ProgressCallback, SubmissionState};
