//! Error types for datafile-portal

use crate::types::{SlotId, Status};
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// A staged file that cannot be accepted
///
/// Validation errors are reported next to the offending slot and never reach
/// the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No file was selected for the slot
    #[error("no file selected for {slot}")]
    MissingFile {
        /// Slot the file was meant for
        slot: SlotId,
    },

    /// The slot is not offered for the current program type
    #[error("{slot} is not an upload slot for this program type")]
    UnknownSlot {
        /// Slot that was requested
        slot: SlotId,
    },

    /// The file extension is not accepted for this program type
    #[error("{file_name} has an unsupported extension (expected one of: {allowed})")]
    InvalidExtension {
        /// Rejected file name
        file_name: String,
        /// Comma-separated list of accepted extensions
        allowed: String,
    },

    /// A companion field required by the upload rules is missing
    #[error("{field} is required for {slot}")]
    MissingField {
        /// Slot the file was meant for
        slot: SlotId,
        /// Human-readable field name
        field: &'static str,
    },
}

/// Errors that can occur in datafile-portal
#[derive(Debug, Error)]
pub enum Error {
    /// A staged file failed local validation
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Submit was requested with nothing staged
    #[error("no changes have been made to data files")]
    NoChanges,

    /// The server rejected or failed a request
    #[error("transport error: {0}")]
    Transport(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A status write that would break the Pending -> terminal rule
    #[error("record {id}: illegal status transition {from} -> {to}")]
    IllegalTransition {
        /// Record id
        id: u64,
        /// Current status
        from: Status,
        /// Rejected status
        to: Status,
    },

    /// Record id is not in the record store
    #[error("record not found: {0}")]
    RecordNotFound(u64),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Parse error
    #[error("parse error: {0}")]
    Parse(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error came from talking to the server
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Http(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Section;

    #[test]
    fn test_validation_error_message() {
        let err = Error::from(ValidationError::InvalidExtension {
            file_name: "report.pdf".to_string(),
            allowed: "txt, csv".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "validation failed: report.pdf has an unsupported extension (expected one of: txt, csv)"
        );
    }

    #[test]
    fn test_missing_field_names_slot() {
        let err = ValidationError::MissingField {
            slot: SlotId::Section(Section::FeedbackReport),
            field: "date extracted on",
        };
        assert_eq!(
            err.to_string(),
            "date extracted on is required for Feedback Report"
        );
    }

    #[test]
    fn test_is_transport() {
        assert!(Error::Transport("boom".to_string()).is_transport());
        assert!(!Error::NoChanges.is_transport());
        assert!(!Error::Internal("x".to_string()).is_transport());
    }
}
