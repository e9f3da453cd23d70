//! HTTP endpoint tests

mod helpers;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use debtfeed_ingest::store::RecordStore;
use debtfeed_ingest::tasks::{RecordingDispatcher, Task};
use debtfeed_ingest::{build_router, AppState};
use helpers::{context, csv_content, csv_row, memory_store, settings};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

const BOUNDARY: &str = "debtfeed-test-boundary";

/// Test helper: router backed by an in-memory store and a recording dispatcher
async fn create_test_app() -> (axum::Router, AppState, Arc<RecordingDispatcher>) {
    let store = memory_store().await;
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let state = AppState::new(store, dispatcher.clone(), settings(2000));
    (build_router(state.clone()), state, dispatcher)
}

fn multipart_body(field: &str, file_name: Option<&str>, content: &[u8]) -> Vec<u8> {
    let disposition = match file_name {
        Some(name) => format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, name
        ),
        None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", field),
    };

    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(disposition.as_bytes());
    body.extend_from_slice(b"Content-Type: text/csv\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/process-csv/")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _state, _dispatcher) = create_test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "debtfeed-ingest");
    assert!(json["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn test_csv_upload_accepted_and_dispatched() {
    let (app, _state, dispatcher) = create_test_app().await;
    let content = csv_content(&[csv_row("John Doe", Uuid::new_v4())]);

    let response = app
        .oneshot(upload_request(multipart_body(
            "file",
            Some("debts.csv"),
            content.as_bytes(),
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = json_body(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["message"], "The CSV file is being processed");

    assert_eq!(dispatcher.tasks(), vec![Task::ProcessCsv { content }]);
}

#[tokio::test]
async fn test_upload_without_file_rejected() {
    let (app, _state, dispatcher) = create_test_app().await;

    let response = app
        .oneshot(upload_request(multipart_body("comment", None, b"hello")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
    assert_eq!(json["error"]["message"], "No file was uploaded");
    assert!(dispatcher.is_empty());
}

#[tokio::test]
async fn test_file_part_without_filename_rejected() {
    let (app, _state, dispatcher) = create_test_app().await;
    let content = csv_content(&[csv_row("John Doe", Uuid::new_v4())]);

    let response = app
        .oneshot(upload_request(multipart_body("file", None, content.as_bytes())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"]["message"], "No file was uploaded");
    assert!(dispatcher.is_empty());
}

#[tokio::test]
async fn test_non_csv_upload_rejected() {
    let (app, _state, dispatcher) = create_test_app().await;

    let response = app
        .oneshot(upload_request(multipart_body(
            "file",
            Some("debts.txt"),
            b"name,governmentId\n",
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"]["message"], "Invalid file format");
    assert!(dispatcher.is_empty());
}

#[tokio::test]
async fn test_non_utf8_upload_rejected() {
    let (app, _state, dispatcher) = create_test_app().await;

    let response = app
        .oneshot(upload_request(multipart_body(
            "file",
            Some("debts.csv"),
            &[0xff, 0xfe, 0x00, 0x41],
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"]["message"], "File is not valid UTF-8");
    assert!(dispatcher.is_empty());
}

#[tokio::test]
async fn test_debt_lookup_after_processing() {
    let (app, state, dispatcher) = create_test_app().await;
    let external_id = Uuid::new_v4();
    let content = csv_content(&[csv_row("John Doe", external_id)]);

    let response = app
        .clone()
        .oneshot(upload_request(multipart_body(
            "file",
            Some("debts.csv"),
            content.as_bytes(),
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let ctx = context(state.store.clone(), dispatcher.clone());
    dispatcher.drain(&ctx).await.unwrap();
    assert_eq!(state.store.count_debts().await.unwrap(), 1);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/debts/{}", external_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["debt"]["name"], "John Doe");
    assert_eq!(json["invoices"][0]["status"], "Processed");
    assert_eq!(json["email_logs"][0]["status"], "Sent");
}

#[tokio::test]
async fn test_unknown_debt_is_not_found() {
    let (app, _state, _dispatcher) = create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/debts/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}
