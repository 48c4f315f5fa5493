//! Mock transport for testing
//!
//! These are test utilities - not all may be used in every test binary.

#![allow(dead_code)]

use async_trait::async_trait;
use datafile_portal::error::{Error, Result};
use datafile_portal::submit::PlannedUpload;
use datafile_portal::transport::Transport;
use datafile_portal::types::{
    CreatedRecord, RecordFilters, RecordMetadata, Section, Status, StatusReport, SubmittedRecord,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Call record for `create_record`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCall {
    pub file_name: String,
    pub metadata: RecordMetadata,
}

/// Simple mock transport for testing
///
/// Features:
/// - Auto-incrementing record ids starting at 1
/// - Call tracking for verification
/// - Scripted status sequences per record (the last entry repeats)
/// - Error injection per section and for status checks
/// - Optional delay on `create_record` to hold a submission in flight
pub struct MockTransport {
    next_id: AtomicU64,
    status_scripts: Mutex<HashMap<u64, VecDeque<Status>>>,
    error_counts: Mutex<HashMap<u64, u32>>,
    listed: Mutex<Vec<SubmittedRecord>>,
    create_delay: Mutex<Option<Duration>>,
    // Call tracking
    create_calls: Mutex<Vec<CreateCall>>,
    status_calls: Mutex<Vec<u64>>,
    list_calls: Mutex<Vec<RecordFilters>>,
    // Error injection
    fail_sections: Mutex<HashSet<Section>>,
    unreadable_sections: Mutex<HashSet<Section>>,
    fail_status: Mutex<Option<String>>,
    fail_list: Mutex<Option<String>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Create a mock whose records stay pending
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            status_scripts: Mutex::new(HashMap::new()),
            error_counts: Mutex::new(HashMap::new()),
            listed: Mutex::new(Vec::new()),
            create_delay: Mutex::new(None),
            create_calls: Mutex::new(Vec::new()),
            status_calls: Mutex::new(Vec::new()),
            list_calls: Mutex::new(Vec::new()),
            fail_sections: Mutex::new(HashSet::new()),
            unreadable_sections: Mutex::new(HashSet::new()),
            fail_status: Mutex::new(None),
            fail_list: Mutex::new(None),
        }
    }

    // === Response configuration ===

    /// Statuses returned by successive `get_status(id)` calls
    pub fn script_status(&self, id: u64, statuses: &[Status]) {
        self.status_scripts
            .lock()
            .unwrap()
            .insert(id, statuses.iter().copied().collect());
    }

    /// Error count reported once record `id` is terminal
    pub fn set_error_count(&self, id: u64, count: u32) {
        self.error_counts.lock().unwrap().insert(id, count);
    }

    /// Records returned by `list_records`
    pub fn set_listed(&self, records: Vec<SubmittedRecord>) {
        *self.listed.lock().unwrap() = records;
    }

    /// Delay every `create_record` call
    pub fn delay_create(&self, delay: Duration) {
        *self.create_delay.lock().unwrap() = Some(delay);
    }

    // === Error injection methods ===

    /// Make `create_record` fail for uploads to `section`
    pub fn fail_section(&self, section: Section) {
        self.fail_sections.lock().unwrap().insert(section);
    }

    /// Make `create_record` fail with an I/O error for uploads to `section`
    pub fn unreadable_section(&self, section: Section) {
        self.unreadable_sections.lock().unwrap().insert(section);
    }

    /// Make `get_status` fail
    pub fn fail_status(&self, msg: &str) {
        *self.fail_status.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `list_records` fail
    pub fn fail_list(&self, msg: &str) {
        *self.fail_list.lock().unwrap() = Some(msg.to_string());
    }

    // === Call verification methods ===

    /// All `create_record` calls
    pub fn get_create_calls(&self) -> Vec<CreateCall> {
        self.create_calls.lock().unwrap().clone()
    }

    /// Ids passed to `get_status`, in call order
    pub fn get_status_calls(&self) -> Vec<u64> {
        self.status_calls.lock().unwrap().clone()
    }

    /// Number of `get_status` calls for record `id`
    pub fn status_calls_for(&self, id: u64) -> usize {
        self.status_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|&&c| c == id)
            .count()
    }

    /// All `list_records` calls
    pub fn get_list_calls(&self) -> Vec<RecordFilters> {
        self.list_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn create_record(
        &self,
        upload: &PlannedUpload,
        metadata: &RecordMetadata,
    ) -> Result<CreatedRecord> {
        self.create_calls.lock().unwrap().push(CreateCall {
            file_name: upload.file.file_name.clone(),
            metadata: metadata.clone(),
        });

        let delay = *self.create_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        // Check for injected error
        if self.unreadable_sections.lock().unwrap().contains(&metadata.section) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("cannot read {}", upload.file.file_name),
            )));
        }

        if self.fail_sections.lock().unwrap().contains(&metadata.section) {
            return Err(Error::Transport(format!(
                "500 Internal Server Error for {}",
                metadata.section
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(CreatedRecord {
            id,
            created_at: None,
            submitted_by: Some("test-user@example.com".to_string()),
        })
    }

    async fn get_status(&self, id: u64) -> Result<StatusReport> {
        self.status_calls.lock().unwrap().push(id);

        // Check for injected error
        if let Some(msg) = self.fail_status.lock().unwrap().as_ref() {
            return Err(Error::Transport(msg.clone()));
        }

        let mut scripts = self.status_scripts.lock().unwrap();
        let status = match scripts.get_mut(&id) {
            Some(script) if script.len() > 1 => script.pop_front().unwrap_or_default(),
            Some(script) => script.front().copied().unwrap_or_default(),
            None => Status::Pending,
        };
        let error_count = status
            .is_terminal()
            .then(|| self.error_counts.lock().unwrap().get(&id).copied().unwrap_or(0));

        Ok(StatusReport {
            status,
            error_count,
        })
    }

    async fn list_records(&self, filters: &RecordFilters) -> Result<Vec<SubmittedRecord>> {
        self.list_calls.lock().unwrap().push(filters.clone());

        // Check for injected error
        if let Some(msg) = self.fail_list.lock().unwrap().as_ref() {
            return Err(Error::Transport(msg.clone()));
        }

        Ok(self.listed.lock().unwrap().clone())
    }
}
