//! Validation Service Integration Tests
//!
//! Drives the real reqwest transport against a local axum server standing
//! in for the Validation Service.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tsv_client::models::{CyclePhase, FileSlot};
use tsv_client::{
    FileCandidate, ServiceClient, SlotKind, SubmitOutcome, ValidationError, ValidationOrchestrator,
};
use tsv_common::api::ReportKind;
use tsv_common::{ServiceEndpoints, TermStatus};

/// What the stub service saw for one validate call
#[derive(Debug, Clone)]
struct CapturedRequest {
    accept: Option<String>,
    content_type: Option<String>,
    body: String,
}

#[derive(Clone)]
struct StubState {
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    responses: Arc<Mutex<Vec<(StatusCode, String)>>>,
}

impl StubState {
    fn new(responses: Vec<(StatusCode, String)>) -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            // Popped from the back
            responses: Arc::new(Mutex::new(responses.into_iter().rev().collect())),
        }
    }

    fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn validate_handler(
    State(state): State<StubState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    state.requests.lock().unwrap().push(CapturedRequest {
        accept: header_value(header::ACCEPT),
        content_type: header_value(header::CONTENT_TYPE),
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    let (status, body) = state
        .responses
        .lock()
        .unwrap()
        .pop()
        .unwrap_or((StatusCode::INTERNAL_SERVER_ERROR, "no scripted response".to_string()));
    (status, [(header::CONTENT_TYPE, "application/json")], body)
}

async fn slow_handler() -> impl IntoResponse {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({}))
}

async fn pdf_handler() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"term_sheet_validation.pdf\"",
            ),
        ],
        b"%PDF-1.4 report".to_vec(),
    )
}

async fn excel_missing_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": "Report not found"})),
    )
}

/// Start a stub service on an ephemeral port, return its base URL
async fn spawn_service(state: StubState) -> String {
    let router = Router::new()
        .route("/api/validate", post(validate_handler))
        .route("/slow/api/validate", post(slow_handler))
        .route("/api/download/pdf", get(pdf_handler))
        .route("/api/download/excel", get(excel_missing_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn orchestrator(base: &str, timeout: Duration) -> ValidationOrchestrator<ServiceClient> {
    let endpoints = ServiceEndpoints::parse(base).unwrap();
    ValidationOrchestrator::new(ServiceClient::new(endpoints, timeout).unwrap())
}

fn slot(kind: SlotKind, name: &str, bytes: &[u8]) -> FileSlot {
    FileSlot::default().accept(kind, FileCandidate::new(name, bytes.to_vec()))
}

fn interest_rate_response() -> String {
    json!({
        "success": true,
        "masterSheetData": [{"Term": "Interest Rate", "Expected Value": "5%"}],
        "validationResults": [{
            "Term": "Interest Rate",
            "Extracted Value": "5%",
            "Status": "✅",
            "Expected Value": "5%",
            "Allowed Range": "4%-6%",
            "Notes": ""
        }],
        "extractedTerms": {"Interest Rate": "5%"},
        "summary": {
            "totalTerms": 1, "validTerms": 1, "invalidTerms": 0, "unknownTerms": 0,
            "validPercent": 100.0, "invalidPercent": 0.0, "unknownPercent": 0.0
        },
        "extractedText": "Interest Rate: 5%",
        "htmlReport": "<html>report</html>"
    })
    .to_string()
}

#[tokio::test]
async fn test_successful_validation_cycle() {
    let state = StubState::new(vec![(StatusCode::OK, interest_rate_response())]);
    let base = spawn_service(state.clone()).await;
    let orchestrator = orchestrator(&base, Duration::from_secs(10));

    let outcome = orchestrator
        .submit(
            &slot(SlotKind::TermSheet, "ts.pdf", b"%PDF term sheet"),
            &slot(SlotKind::MasterSheet, "ms.xlsx", b"PK master sheet"),
        )
        .await;

    let result = match outcome {
        SubmitOutcome::Success(result) => result,
        other => panic!("expected success, got {:?}", other),
    };

    assert_eq!(result.outcome.validation_results.len(), 1);
    assert_eq!(result.outcome.validation_results[0].status, TermStatus::Valid);
    assert_eq!(result.outcome.summary.as_ref().unwrap().total_terms, 1);
    assert_eq!(result.reports.pdf, format!("{}/api/download/pdf", base));
    assert_eq!(result.reports.excel, format!("{}/api/download/excel", base));
    assert_eq!(result.reports.html.as_deref(), Some("<html>report</html>"));
    assert_eq!(orchestrator.phase().await, CyclePhase::Success);

    // Exactly one multipart request with both parts
    let requests = state.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.accept.as_deref(), Some("application/json"));
    assert!(request
        .content_type
        .as_deref()
        .unwrap()
        .starts_with("multipart/form-data"));
    assert!(request.body.contains(r#"name="termsheet"; filename="ts.pdf""#));
    assert!(request.body.contains(r#"name="mastersheet"; filename="ms.xlsx""#));
    assert!(request.body.contains("%PDF term sheet"));
    assert!(request.body.contains("PK master sheet"));
}

#[tokio::test]
async fn test_empty_slot_makes_no_request() {
    let state = StubState::new(vec![(StatusCode::OK, interest_rate_response())]);
    let base = spawn_service(state.clone()).await;
    let orchestrator = orchestrator(&base, Duration::from_secs(10));

    let outcome = orchestrator
        .submit(
            &slot(SlotKind::TermSheet, "ts.pdf", b"data"),
            &FileSlot::default(),
        )
        .await;

    assert!(matches!(outcome, SubmitOutcome::PreconditionNotMet(_)));
    assert_eq!(orchestrator.phase().await, CyclePhase::Idle);
    assert!(state.requests().is_empty());
}

#[tokio::test]
async fn test_server_error_keeps_prior_results() {
    let error_body = r#"{"error":"OCR failed"}"#.to_string();
    let state = StubState::new(vec![
        (StatusCode::OK, interest_rate_response()),
        (StatusCode::INTERNAL_SERVER_ERROR, error_body.clone()),
    ]);
    let base = spawn_service(state).await;
    let orchestrator = orchestrator(&base, Duration::from_secs(10));
    let term = slot(SlotKind::TermSheet, "ts.pdf", b"data");
    let master = slot(SlotKind::MasterSheet, "ms.xlsx", b"data");

    assert!(orchestrator.submit(&term, &master).await.is_success());
    let outcome = orchestrator.submit(&term, &master).await;

    assert_eq!(
        outcome.error(),
        Some(&ValidationError::Server {
            status: 500,
            body: error_body,
        })
    );

    let snapshot = orchestrator.snapshot().await;
    assert_eq!(snapshot.phase, CyclePhase::Failed);
    let previous = snapshot.outcome.expect("prior results remain visible");
    assert_eq!(previous.validation_results[0].term, "Interest Rate");
}

#[tokio::test]
async fn test_malformed_success_body() {
    let state = StubState::new(vec![(StatusCode::OK, "[]".to_string())]);
    let base = spawn_service(state).await;
    let orchestrator = orchestrator(&base, Duration::from_secs(10));

    let outcome = orchestrator
        .submit(
            &slot(SlotKind::TermSheet, "ts.pdf", b"data"),
            &slot(SlotKind::MasterSheet, "ms.xlsx", b"data"),
        )
        .await;

    assert!(matches!(
        outcome,
        SubmitOutcome::Failed(ValidationError::MalformedResponse(_))
    ));
}

#[tokio::test]
async fn test_unreachable_service_is_transport_error() {
    // Bind then release a port so nothing is listening on it
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let orchestrator = orchestrator(&format!("http://{}", addr), Duration::from_secs(5));
    let outcome = orchestrator
        .submit(
            &slot(SlotKind::TermSheet, "ts.pdf", b"data"),
            &slot(SlotKind::MasterSheet, "ms.xlsx", b"data"),
        )
        .await;

    let error = outcome.error().expect("cycle should fail").clone();
    assert!(matches!(error, ValidationError::Transport(_)), "got {:?}", error);
    assert!(error.to_string().contains("Could not reach the validation service"));
    assert_eq!(orchestrator.phase().await, CyclePhase::Failed);
}

/// Answer one request with a status line and a body cut short of its Content-Length
async fn spawn_truncating_service(status_line: &'static str) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        // Drain the whole multipart request before answering
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            if request.ends_with(b"--\r\n") || request.ends_with(b"0\r\n\r\n") {
                break;
            }
        }

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: 64\r\n\r\n{{\"error\":",
            status_line
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_unreadable_error_body_keeps_status() {
    let base = spawn_truncating_service("502 Bad Gateway").await;
    let orchestrator = orchestrator(&base, Duration::from_secs(5));

    let outcome = orchestrator
        .submit(
            &slot(SlotKind::TermSheet, "ts.pdf", b"data"),
            &slot(SlotKind::MasterSheet, "ms.xlsx", b"data"),
        )
        .await;

    let error = outcome.error().expect("cycle should fail").clone();
    assert!(
        matches!(error, ValidationError::Server { status: 502, .. }),
        "got {:?}",
        error
    );
    assert_eq!(orchestrator.phase().await, CyclePhase::Failed);
}

#[tokio::test]
async fn test_slow_service_times_out() {
    let base = spawn_service(StubState::new(vec![])).await;
    let orchestrator = orchestrator(&format!("{}/slow", base), Duration::from_millis(300));

    let outcome = orchestrator
        .submit(
            &slot(SlotKind::TermSheet, "ts.pdf", b"data"),
            &slot(SlotKind::MasterSheet, "ms.xlsx", b"data"),
        )
        .await;

    assert!(
        matches!(outcome, SubmitOutcome::Failed(ValidationError::Timeout { .. })),
        "got {:?}",
        outcome
    );
}

#[tokio::test]
async fn test_report_downloads() {
    let base = spawn_service(StubState::new(vec![])).await;
    let endpoints = ServiceEndpoints::parse(&base).unwrap();
    let client = ServiceClient::new(endpoints, Duration::from_secs(5)).unwrap();

    let pdf = client.download_report(ReportKind::Pdf).await.unwrap();
    assert_eq!(pdf.file_name, "term_sheet_validation.pdf");
    assert_eq!(pdf.bytes, b"%PDF-1.4 report");

    let dir = tempfile::tempdir().unwrap();
    let saved = pdf.save_to(dir.path()).unwrap();
    assert!(saved.ends_with("term_sheet_validation.pdf"));

    let excel = client.download_report(ReportKind::Excel).await.unwrap_err();
    assert!(matches!(excel, ValidationError::Server { status: 404, .. }));
    assert_eq!(excel.service_message().as_deref(), Some("Report not found"));
}
