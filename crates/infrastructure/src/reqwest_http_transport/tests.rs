use std::collections::HashMap;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::{Multipart, Query};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use fundline_application::{
    HttpMethod, HttpRequest, HttpTransport, MultipartForm, RequestBody,
};
use fundline_core::{AppError, BearerToken};
use serde_json::{Value, json};

use super::{ReqwestHttpTransport, disposition_filename, endpoint_url, parse_base_url};

async fn list_cases(
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let request_id = headers.contains_key("x-request-id");

    Json(json!({
        "cases": [],
        "total": 0,
        "authorization": authorization,
        "status": params.get("status"),
        "request_id": request_id,
    }))
}

async fn upload(mut multipart: Multipart) -> Json<Value> {
    let mut fields = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(str::to_owned);
        let file_name = field.file_name().map(str::to_owned);
        let size = field.bytes().await.map(|bytes| bytes.len()).unwrap_or_default();
        fields.push(json!({"name": name, "file_name": file_name, "size": size}));
    }
    Json(json!({"fields": fields}))
}

async fn export() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"cases.csv\""),
        ],
        "id,status\n1,active\n",
    )
}

async fn broken() -> impl IntoResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"detail": "boom"})),
    )
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({}))
}

async fn spawn_backend() -> String {
    let router = Router::new()
        .route("/api/v1/cases", get(list_cases))
        .route("/api/v1/documents/upload", post(upload))
        .route("/api/v1/reports/export", get(export))
        .route("/api/v1/broken", get(broken))
        .route("/api/v1/slow", get(slow));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await;
    assert!(listener.is_ok());
    let listener = listener.unwrap_or_else(|_| unreachable!());
    let address = listener.local_addr().unwrap_or_else(|_| unreachable!());
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    format!("http://{address}/api/v1")
}

fn transport(base_url: &str, timeout: Duration) -> ReqwestHttpTransport {
    ReqwestHttpTransport::new(base_url, timeout).unwrap_or_else(|_| unreachable!())
}

#[tokio::test]
async fn sends_bearer_query_and_request_id() {
    let base_url = spawn_backend().await;
    let transport = transport(&base_url, Duration::from_secs(5));
    let mut request = HttpRequest::new(HttpMethod::Get, "/cases")
        .with_query(vec![("status".to_owned(), "active".to_owned())]);
    request.bearer = BearerToken::new("demo-token").ok();

    let response = transport.send(request).await;

    assert!(response.is_ok());
    let response = response.unwrap_or_else(|_| unreachable!());
    assert_eq!(response.status, 200);
    let body = response.json_value().unwrap_or_default();
    assert_eq!(body["authorization"], json!("Bearer demo-token"));
    assert_eq!(body["status"], json!("active"));
    assert_eq!(body["request_id"], json!(true));
}

#[tokio::test]
async fn multipart_uploads_carry_file_and_fields() {
    let base_url = spawn_backend().await;
    let transport = transport(&base_url, Duration::from_secs(5));
    let form = MultipartForm::default()
        .file(
            "file",
            "scan.pdf",
            Some("application/pdf".to_owned()),
            b"%PDF-1.4".to_vec(),
        )
        .text("case_id", "4");
    let request = HttpRequest::new(HttpMethod::Post, "/documents/upload")
        .with_body(RequestBody::Multipart(form));

    let response = transport.send(request).await;

    let body = response
        .ok()
        .and_then(|response| response.json_value().ok())
        .unwrap_or_default();
    assert_eq!(body["fields"][0]["name"], json!("file"));
    assert_eq!(body["fields"][0]["file_name"], json!("scan.pdf"));
    assert_eq!(body["fields"][0]["size"], json!(8));
    assert_eq!(body["fields"][1]["name"], json!("case_id"));
}

#[tokio::test]
async fn downloads_report_the_advertised_file_name() {
    let base_url = spawn_backend().await;
    let transport = transport(&base_url, Duration::from_secs(5));

    let response = transport
        .send(HttpRequest::new(HttpMethod::Get, "/reports/export"))
        .await;

    assert!(response.is_ok());
    let response = response.unwrap_or_else(|_| unreachable!());
    assert_eq!(response.filename.as_deref(), Some("cases.csv"));
    assert_eq!(response.content_type.as_deref(), Some("text/csv"));
    assert_eq!(response.body, b"id,status\n1,active\n".to_vec());
}

#[tokio::test]
async fn error_statuses_are_returned_not_raised() {
    let base_url = spawn_backend().await;
    let transport = transport(&base_url, Duration::from_secs(5));

    let response = transport
        .send(HttpRequest::new(HttpMethod::Get, "/broken"))
        .await;

    assert!(matches!(response, Ok(ref response) if response.status == 500));
}

#[tokio::test]
async fn timeouts_become_transport_errors() {
    let base_url = spawn_backend().await;
    let transport = transport(&base_url, Duration::from_millis(100));

    let response = transport
        .send(HttpRequest::new(HttpMethod::Get, "/slow"))
        .await;

    assert!(matches!(response, Err(AppError::Transport(ref message)) if message.contains("timed out")));
}

#[tokio::test]
async fn unreachable_backends_become_transport_errors() {
    let transport = transport("http://127.0.0.1:9/api/v1", Duration::from_secs(2));

    let response = transport
        .send(HttpRequest::new(HttpMethod::Get, "/cases"))
        .await;

    assert!(matches!(response, Err(AppError::Transport(_))));
}

#[test]
fn base_url_must_be_http() {
    assert!(parse_base_url("ftp://example.com").is_err());
    assert!(parse_base_url("not a url").is_err());
    assert!(parse_base_url("https://crm.example.com/api/v1/").is_ok());
}

#[test]
fn paths_join_below_the_prefix() {
    let base = parse_base_url("http://localhost:8000/api/v1/").unwrap_or_else(|_| unreachable!());

    let url = endpoint_url(
        &base,
        "/cases/7",
        &[("search".to_owned(), "smith & co".to_owned())],
    )
    .unwrap_or_else(|_| unreachable!());

    assert_eq!(
        url.as_str(),
        "http://localhost:8000/api/v1/cases/7?search=smith+%26+co"
    );
}

#[test]
fn disposition_file_names_are_unquoted() {
    assert_eq!(
        disposition_filename("attachment; filename=\"report.pdf\"").as_deref(),
        Some("report.pdf")
    );
    assert_eq!(
        disposition_filename("attachment; FILENAME=plain.csv").as_deref(),
        Some("plain.csv")
    );
    assert_eq!(disposition_filename("inline"), None);
}
