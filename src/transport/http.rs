//! HTTP transport implementation

use crate::error::{Error, Result};
use crate::submit::PlannedUpload;
use crate::transport::Transport;
use crate::types::{CreatedRecord, RecordFilters, RecordMetadata, StatusReport, SubmittedRecord};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Transport talking JSON to the data file API using reqwest
pub struct HttpTransport {
    client: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Serialize)]
struct CreateRecordPayload<'a> {
    section: &'a str,
    quarter: String,
    year: i32,
    program_type: &'a str,
    stt: u64,
    original_filename: &'a str,
    mime_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_extracted_on: Option<NaiveDate>,
    file: String,
}

impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/v1{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn create_record(
        &self,
        upload: &PlannedUpload,
        metadata: &RecordMetadata,
    ) -> Result<CreatedRecord> {
        let bytes = tokio::fs::read(&upload.file.path).await?;
        debug!(
            file = %upload.file.file_name,
            size = bytes.len(),
            section = %metadata.section,
            "Uploading data file"
        );

        let payload = CreateRecordPayload {
            section: metadata.section.label(),
            quarter: metadata.quarter.to_string(),
            year: metadata.year,
            program_type: metadata.program_type.api_code(),
            stt: metadata.organization_id,
            original_filename: &upload.file.file_name,
            mime_type: &upload.file.mime_type,
            date_extracted_on: upload.file.date_extracted_on,
            file: BASE64.encode(&bytes),
        };

        let created: CreatedRecord = self
            .authorize(self.client.post(self.api_url("/data_files/")))
            .json(&payload)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::Transport(e.to_string()))?
            .json()
            .await?;

        Ok(created)
    }

    async fn get_status(&self, id: u64) -> Result<StatusReport> {
        let url = self.api_url(&format!("/data_files/{id}/summary/"));

        let report: StatusReport = self
            .authorize(self.client.get(&url))
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::Transport(e.to_string()))?
            .json()
            .await?;

        Ok(report)
    }

    async fn list_records(&self, filters: &RecordFilters) -> Result<Vec<SubmittedRecord>> {
        let mut query = vec![
            ("year", filters.year.to_string()),
            ("program_type", filters.program_type.api_code().to_string()),
            ("stt", filters.organization_id.to_string()),
        ];
        if let Some(quarter) = filters.quarter {
            query.push(("quarter", quarter.to_string()));
        }
        if let Some(section) = filters.section {
            query.push(("section", section.label().to_string()));
        }

        let records: Vec<SubmittedRecord> = self
            .authorize(self.client.get(self.api_url("/data_files/")))
            .query(&query)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::Transport(e.to_string()))?
            .json()
            .await?;

        Ok(records)
    }
}
