//! Phase 1: Submission planning
//!
//! Turns the staged files into the list of uploads to perform. Some program
//! types remap their staging slots onto a canonical section, so the mapping
//! is pluggable through [`SubmissionTransform`].

use crate::error::{Error, Result};
use crate::types::{FileSlot, ProgramType, Quarter, Section, SlotId, SubmissionSession};
use tracing::{debug, warn};

/// One file to upload, after transformation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpload {
    /// Staging slot the file came from
    pub origin: SlotId,
    /// Canonical section sent to the server
    pub section: Section,
    /// Quarter sent to the server
    pub quarter: Quarter,
    /// The staged file
    pub file: FileSlot,
}

/// Pure mapping from staged files to planned uploads
///
/// Implementations must not touch the staging store. Any
/// `Fn(&SubmissionSession, &[FileSlot]) -> Vec<PlannedUpload>` closure is a
/// transform.
pub trait SubmissionTransform: Send + Sync {
    /// Map `staged` to the uploads to perform
    fn transform(&self, session: &SubmissionSession, staged: &[FileSlot]) -> Vec<PlannedUpload>;
}

impl<F> SubmissionTransform for F
where
    F: Fn(&SubmissionSession, &[FileSlot]) -> Vec<PlannedUpload> + Send + Sync,
{
    fn transform(&self, session: &SubmissionSession, staged: &[FileSlot]) -> Vec<PlannedUpload> {
        self(session, staged)
    }
}

/// One upload per section slot, tagged with the session quarter
#[derive(Debug, Clone, Copy, Default)]
pub struct SectionTransform;

impl SubmissionTransform for SectionTransform {
    fn transform(&self, session: &SubmissionSession, staged: &[FileSlot]) -> Vec<PlannedUpload> {
        staged
            .iter()
            .filter_map(|file| match file.slot {
                SlotId::Section(section) => Some(PlannedUpload {
                    origin: file.slot,
                    section,
                    quarter: session.quarter,
                    file: file.clone(),
                }),
                SlotId::Quarter(_) => {
                    warn!(slot = %file.slot, "Quarter slot has no section mapping, skipping");
                    None
                }
            })
            .collect()
    }
}

/// Quarterly audit: every quarter slot maps to the audit section, tagged
/// with the slot's own quarter
#[derive(Debug, Clone, Copy, Default)]
pub struct QuarterlyAuditTransform;

impl SubmissionTransform for QuarterlyAuditTransform {
    fn transform(&self, session: &SubmissionSession, staged: &[FileSlot]) -> Vec<PlannedUpload> {
        staged
            .iter()
            .map(|file| {
                let (section, quarter) = match file.slot {
                    SlotId::Quarter(quarter) => (Section::ProgramAudit, quarter),
                    SlotId::Section(section) => (section, session.quarter),
                };
                PlannedUpload {
                    origin: file.slot,
                    section,
                    quarter,
                    file: file.clone(),
                }
            })
            .collect()
    }
}

/// Default transform for a program type
pub fn transform_for(program_type: ProgramType) -> Box<dyn SubmissionTransform> {
    if program_type.uses_quarter_slots() {
        Box::new(QuarterlyAuditTransform)
    } else {
        Box::new(SectionTransform)
    }
}

/// Submission plan
#[derive(Debug, Clone)]
pub struct SubmissionPlan {
    /// Session the uploads belong to
    pub session: SubmissionSession,
    /// Uploads ordered by quarter, then section
    pub uploads: Vec<PlannedUpload>,
}

/// Create a submission plan
///
/// Fails with [`Error::NoChanges`] when nothing is staged.
pub fn create_submission_plan(
    session: &SubmissionSession,
    staged: &[FileSlot],
    transform: &dyn SubmissionTransform,
) -> Result<SubmissionPlan> {
    if staged.is_empty() {
        return Err(Error::NoChanges);
    }

    let mut uploads = transform.transform(session, staged);
    if uploads.is_empty() {
        warn!(staged = staged.len(), "Transform produced no uploads");
        return Err(Error::NoChanges);
    }
    uploads.sort_by_key(|u| (u.quarter, u.section));

    debug!(
        staged = staged.len(),
        uploads = uploads.len(),
        "Created submission plan"
    );

    Ok(SubmissionPlan {
        session: *session,
        uploads,
    })
}
