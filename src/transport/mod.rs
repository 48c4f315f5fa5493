//! Transport collaborator
//!
//! Provides the interface the submission core uses to talk to the server.

mod factory;
mod http;

pub use factory::create_transport;
pub use http::HttpTransport;

use crate::error::Result;
use crate::submit::PlannedUpload;
use crate::types::{CreatedRecord, RecordFilters, RecordMetadata, StatusReport, SubmittedRecord};
use async_trait::async_trait;

/// Server operations needed by the submission core
///
/// This trait abstracts the wire binding, allowing the same submission logic
/// to run against the HTTP server or an in-memory double.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Upload a file and create a server record for it
    async fn create_record(
        &self,
        upload: &PlannedUpload,
        metadata: &RecordMetadata,
    ) -> Result<CreatedRecord>;

    /// Current processing status of a record
    async fn get_status(&self, id: u64) -> Result<StatusReport>;

    /// Records matching `filters`, in server order
    async fn list_records(&self, filters: &RecordFilters) -> Result<Vec<SubmittedRecord>>;
}
