//! HTTP transport tests against a local mock server

mod common;

use chrono::{NaiveDate, Utc};
use common::fixtures::write_upload;
use datafile_portal::config::Config;
use datafile_portal::submit::PlannedUpload;
use datafile_portal::transport::{HttpTransport, Transport, create_transport};
use datafile_portal::types::{
    FileSlot, ProgramType, Quarter, RecordFilters, RecordMetadata, Section, SlotId, Status,
};
use mockito::Matcher;
use serde_json::json;
use std::path::Path;
use std::time::Duration;

fn transport(server: &mockito::ServerGuard, token: Option<&str>) -> HttpTransport {
    HttpTransport::new(
        &server.url(),
        token.map(ToString::to_string),
        Duration::from_secs(5),
    )
}

fn upload(path: &Path, section: Section) -> PlannedUpload {
    PlannedUpload {
        origin: SlotId::Section(section),
        section,
        quarter: Quarter::Q1,
        file: FileSlot {
            slot: SlotId::Section(section),
            file_name: path.file_name().unwrap().to_string_lossy().into_owned(),
            mime_type: "text/plain".to_string(),
            staged_at: Utc::now(),
            path: path.to_path_buf(),
            date_extracted_on: None,
            server_record_id: None,
        },
    }
}

fn metadata(section: Section) -> RecordMetadata {
    RecordMetadata {
        section,
        quarter: Quarter::Q1,
        year: 2021,
        program_type: ProgramType::Tanf,
        organization_id: 4,
    }
}

#[tokio::test]
async fn test_create_record_posts_metadata_and_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_upload(dir.path(), "report.txt");

    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/data_files/")
        .match_header("authorization", "Bearer secret")
        .match_body(Matcher::PartialJson(json!({
            "section": "Active Case Data",
            "quarter": "Q1",
            "year": 2021,
            "program_type": "TAN",
            "stt": 4,
            "original_filename": "report.txt",
            "mime_type": "text/plain",
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": 42, "submitted_by": "analyst@example.org"}"#)
        .create_async()
        .await;

    let created = transport(&server, Some("secret"))
        .create_record(
            &upload(&path, Section::ActiveCaseData),
            &metadata(Section::ActiveCaseData),
        )
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(created.id, 42);
    assert_eq!(created.submitted_by.as_deref(), Some("analyst@example.org"));
    assert!(created.created_at.is_none());
}

#[tokio::test]
async fn test_create_record_sends_extraction_date() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_upload(dir.path(), "feedback.zip");
    let mut planned = upload(&path, Section::FeedbackReport);
    planned.file.date_extracted_on = NaiveDate::from_ymd_opt(2021, 3, 31);

    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/data_files/")
        .match_body(Matcher::PartialJson(json!({
            "date_extracted_on": "2021-03-31",
        })))
        .with_status(201)
        .with_body(r#"{"id": 7}"#)
        .create_async()
        .await;

    let created = transport(&server, None)
        .create_record(&planned, &metadata(Section::FeedbackReport))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(created.id, 7);
}

#[tokio::test]
async fn test_server_error_is_transport_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_upload(dir.path(), "report.txt");

    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/data_files/")
        .with_status(500)
        .create_async()
        .await;

    let err = transport(&server, None)
        .create_record(
            &upload(&path, Section::ClosedCaseData),
            &metadata(Section::ClosedCaseData),
        )
        .await
        .unwrap_err();

    assert!(err.is_transport());
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_get_status() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v1/data_files/9/summary/")
        .with_status(200)
        .with_body(r#"{"status": "Accepted with Errors", "error_count": 3}"#)
        .create_async()
        .await;

    let report = transport(&server, None).get_status(9).await.unwrap();

    mock.assert_async().await;
    assert_eq!(report.status, Status::AcceptedWithErrors);
    assert_eq!(report.error_count, Some(3));
}

#[tokio::test]
async fn test_list_records_with_filters() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v1/data_files/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("year".into(), "2021".into()),
            Matcher::UrlEncoded("program_type".into(), "PIA".into()),
            Matcher::UrlEncoded("stt".into(), "4".into()),
            Matcher::UrlEncoded("quarter".into(), "Q2".into()),
        ]))
        .with_status(200)
        .with_body(
            json!([{
                "id": 3,
                "section": "Program Integrity Audit",
                "quarter": "Q2",
                "year": 2021,
                "created_at": "2021-02-01T10:00:00Z",
                "submitted_by": "analyst@example.org",
                "original_filename": "q2.xlsx",
                "status": "Pending"
            }])
            .to_string(),
        )
        .create_async()
        .await;

    let filters = RecordFilters {
        year: 2021,
        program_type: ProgramType::ProgramAudit,
        organization_id: 4,
        quarter: Some(Quarter::Q2),
        section: None,
    };
    let records = transport(&server, None).list_records(&filters).await.unwrap();

    mock.assert_async().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].file_name, "q2.xlsx");
    assert_eq!(records[0].status, Status::Pending);
    assert_eq!(records[0].error_count, 0);
}

#[tokio::test]
async fn test_factory_requires_server_url() {
    assert!(create_transport(&Config::default()).is_err());

    let server = mockito::Server::new_async().await;
    let config = Config {
        server_url: Some(server.url()),
        ..Config::default()
    };
    assert!(create_transport(&config).is_ok());
}
