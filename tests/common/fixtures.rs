//! Test data factories for datafile-portal types
//!
//! These are test utilities - not all may be used in every test binary.

#![allow(dead_code)]

use chrono::Utc;
use datafile_portal::poll::PollConfig;
use datafile_portal::types::{ProgramType, Quarter, Status, SubmissionSession, SubmittedRecord};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// TANF session for fiscal year 2021, Q1, organization 1
pub fn tanf_session() -> SubmissionSession {
    SubmissionSession {
        year: 2021,
        quarter: Quarter::Q1,
        program_type: ProgramType::Tanf,
        organization_id: 1,
    }
}

/// Session for `program_type`, otherwise like [`tanf_session`]
pub fn session_for(program_type: ProgramType) -> SubmissionSession {
    SubmissionSession {
        program_type,
        ..tanf_session()
    }
}

/// Fast poll settings for paused-time tests
pub fn fast_poll(max_attempts: u32) -> PollConfig {
    PollConfig::new(max_attempts, Duration::from_millis(100))
}

/// Write a small upload file named `name` into `dir`
pub fn write_upload(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, "HEADER20211A01TAN1 N\nTRAILER0000001\n").unwrap();
    path
}

/// Create a submitted record with default values
pub fn make_record(id: u64, section: &str, quarter: Quarter) -> SubmittedRecord {
    SubmittedRecord {
        id,
        section: section.to_string(),
        quarter,
        year: 2021,
        created_at: Utc::now(),
        submitted_by: "test-user@example.com".to_string(),
        file_name: format!("file{id}.txt"),
        status: Status::Accepted,
        error_count: 0,
    }
}

/// Create a record still being processed
pub fn make_pending_record(id: u64, section: &str) -> SubmittedRecord {
    SubmittedRecord {
        status: Status::Pending,
        ..make_record(id, section, Quarter::Q1)
    }
}
