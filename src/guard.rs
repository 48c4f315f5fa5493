//! Unsaved-changes guard
//!
//! Changing a session parameter while files are staged would silently drop
//! them, so such changes are suspended until the user either keeps working
//! or discards the staged files.

use crate::session::{SessionChange, SessionState};
use crate::types::SubmissionSession;
use tracing::{debug, info};

/// What asked for the change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// A session parameter was edited
    ParameterEdit,
    /// The user asked to abandon the current work
    CancelWork,
}

/// Result of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Nothing was staged; the request took effect
    Applied,
    /// Staged files exist; the user must confirm
    ConfirmationRequired,
}

/// Result of resolving a suspended request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The proposal was dropped; this session stays active
    Reverted(SubmissionSession),
    /// Staging was cleared and this session is now active
    Applied(SubmissionSession),
    /// Staging was cleared and the work cancelled; the session is unchanged
    WorkCancelled,
    /// There was nothing to resolve
    NothingPending,
}

/// A suspended request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingChange {
    /// What asked for the change
    pub trigger: Trigger,
    /// Session active when the first request was suspended
    pub previous: SubmissionSession,
    /// Session to apply on confirmation, `None` when cancelling work
    pub proposed: Option<SubmissionSession>,
}

/// Guards session changes against losing staged files
#[derive(Debug)]
pub struct UnsavedChangesGuard {
    state: SessionState,
    pending: Option<PendingChange>,
}

impl UnsavedChangesGuard {
    /// Guard `state`
    pub const fn new(state: SessionState) -> Self {
        Self {
            state,
            pending: None,
        }
    }

    /// The guarded session
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Request a change to one session parameter
    pub fn request_change(&mut self, change: SessionChange) -> GuardDecision {
        let base = self
            .pending
            .and_then(|p| p.proposed)
            .unwrap_or_else(|| self.state.session());
        let proposed = base.with_change(change);

        if self.pending.is_none() && self.state.replace_session_if_clean(proposed) {
            debug!(?change, "No staged files, applied change");
            return GuardDecision::Applied;
        }

        self.suspend(Trigger::ParameterEdit, Some(proposed));
        GuardDecision::ConfirmationRequired
    }

    /// Request to abandon the current work
    pub fn request_cancel(&mut self) -> GuardDecision {
        if self.pending.is_none() && !self.state.has_unsubmitted() {
            return GuardDecision::Applied;
        }

        self.suspend(Trigger::CancelWork, None);
        GuardDecision::ConfirmationRequired
    }

    fn suspend(&mut self, trigger: Trigger, proposed: Option<SubmissionSession>) {
        let previous = self
            .pending
            .map_or_else(|| self.state.session(), |p| p.previous);
        debug!(?trigger, "Staged files present, confirmation required");
        self.pending = Some(PendingChange {
            trigger,
            previous,
            proposed,
        });
    }

    /// Drop the suspended request and keep the staged files
    pub fn keep_working(&mut self) -> Resolution {
        match self.pending.take() {
            Some(pending) => {
                debug!("Keeping staged work");
                Resolution::Reverted(pending.previous)
            }
            None => Resolution::NothingPending,
        }
    }

    /// Clear the staged files and carry out the suspended request
    pub fn discard_and_proceed(&mut self) -> Resolution {
        let Some(pending) = self.pending.take() else {
            return Resolution::NothingPending;
        };

        let dropped = self.state.clear_staging();
        info!(dropped, trigger = ?pending.trigger, "Discarded staged files");

        match (pending.trigger, pending.proposed) {
            (Trigger::ParameterEdit, Some(session)) => {
                self.state.replace_session(session);
                Resolution::Applied(session)
            }
            _ => Resolution::WorkCancelled,
        }
    }

    /// Whether a request awaits confirmation
    pub const fn is_confirming(&self) -> bool {
        self.pending.is_some()
    }

    /// Trigger of the suspended request
    pub fn trigger(&self) -> Option<Trigger> {
        self.pending.map(|p| p.trigger)
    }

    /// The suspended request
    pub const fn pending(&self) -> Option<&PendingChange> {
        self.pending.as_ref()
    }

    /// Parameters to display: the proposal while confirming, else the session
    pub fn selection(&self) -> SubmissionSession {
        self.pending
            .and_then(|p| p.proposed)
            .unwrap_or_else(|| self.state.session())
    }
}
