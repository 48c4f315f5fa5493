//! Shared session state
//!
//! `SessionState` is the explicit handle that the submitter, the
//! unsaved-changes guard and the CLI share instead of a global context.
//! Cloning the handle shares the same session.

use crate::error::ValidationError;
use crate::staging::StagingStore;
use crate::types::{FileSlot, ProgramType, Quarter, SlotId, StagedFile, SubmissionSession};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// A requested change to one session parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChange {
    /// Change the fiscal year
    Year(i32),
    /// Change the fiscal quarter
    Quarter(Quarter),
    /// Change the program type
    ProgramType(ProgramType),
    /// Change the organization
    Organization(u64),
}

impl SubmissionSession {
    /// Copy of this session with `change` applied
    #[must_use]
    pub const fn with_change(self, change: SessionChange) -> Self {
        match change {
            SessionChange::Year(year) => Self { year, ..self },
            SessionChange::Quarter(quarter) => Self { quarter, ..self },
            SessionChange::ProgramType(program_type) => Self {
                program_type,
                ..self
            },
            SessionChange::Organization(organization_id) => Self {
                organization_id,
                ..self
            },
        }
    }
}

#[derive(Debug)]
struct SessionInner {
    session: SubmissionSession,
    staging: StagingStore,
}

/// Shared handle to the active session and its staging store
#[derive(Debug, Clone)]
pub struct SessionState {
    inner: Arc<Mutex<SessionInner>>,
}

impl SessionState {
    /// Open a session with an empty staging store
    pub fn new(session: SubmissionSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                session,
                staging: StagingStore::new(session.program_type),
            })),
        }
    }

    // Never held across an await.
    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current session parameters
    pub fn session(&self) -> SubmissionSession {
        self.lock().session
    }

    /// Replace the session wholesale
    ///
    /// The staging store is rebuilt for the new program type; anything staged
    /// under the old session is dropped.
    pub fn replace_session(&self, session: SubmissionSession) {
        let mut inner = self.lock();
        debug!(?session, "Replacing session");
        inner.session = session;
        inner.staging = StagingStore::new(session.program_type);
    }

    /// Replace the session only if nothing unsubmitted is staged
    ///
    /// The check and the replacement happen under one lock. Returns whether
    /// the session was replaced.
    pub fn replace_session_if_clean(&self, session: SubmissionSession) -> bool {
        let mut inner = self.lock();
        if inner.staging.has_unsubmitted() {
            return false;
        }
        debug!(?session, "Replacing session");
        inner.session = session;
        inner.staging = StagingStore::new(session.program_type);
        true
    }

    /// Validate and stage a file
    pub fn stage(
        &self,
        slot: SlotId,
        file: Option<StagedFile>,
    ) -> Result<FileSlot, ValidationError> {
        self.lock().staging.stage(slot, file).cloned()
    }

    /// Remove the entry for `slot`
    pub fn clear(&self, slot: SlotId) -> Option<FileSlot> {
        self.lock().staging.clear(slot)
    }

    /// Empty the staging store, returning how many unsubmitted files were dropped
    pub fn clear_staging(&self) -> usize {
        self.lock().staging.clear_all()
    }

    /// Attach a server id to the staged file that was uploaded
    pub fn mark_submitted(&self, uploaded: &FileSlot, record_id: u64) -> bool {
        self.lock().staging.mark_submitted(uploaded, record_id)
    }

    /// Unsubmitted staged files
    pub fn list_unsubmitted(&self) -> Vec<FileSlot> {
        self.lock().staging.list_unsubmitted()
    }

    /// Whether staged work would be lost by changing the session
    pub fn has_unsubmitted(&self) -> bool {
        self.lock().staging.has_unsubmitted()
    }

    /// Session parameters together with the unsubmitted files, read atomically
    pub fn snapshot(&self) -> (SubmissionSession, Vec<FileSlot>) {
        let inner = self.lock();
        (inner.session, inner.staging.list_unsubmitted())
    }

    /// Run `f` against the staging store
    pub fn with_staging<R>(&self, f: impl FnOnce(&StagingStore) -> R) -> R {
        f(&self.lock().staging)
    }
}
