use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{any, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use story_proxy::api::create_router;
use story_proxy::config::CopyleaksConfig;
use story_proxy::copyleaks::{CopyleaksClient, ExportFormat, ExportReceipt, ScanProvider};
use story_proxy::error::{AppError, Result};
use story_proxy::llm::{Completion, CompletionBackend, CompletionOptions, LlmProvider, Message, ProviderSelector};
use story_proxy::store::CorrelationStore;
use story_proxy::AppState;

struct EchoBackend {
    provider: LlmProvider,
    reply: &'static str,
}

#[async_trait]
impl CompletionBackend for EchoBackend {
    async fn complete(&self, messages: &[Message], _options: &CompletionOptions) -> Result<Completion> {
        assert!(!messages.is_empty());
        Ok(Completion {
            content: self.reply.to_string(),
            provider: self.provider,
            model: "test-model".to_string(),
        })
    }
}

/// Scan provider that rejects detail lookups the way Copyleaks does for unknown results.
struct MissingResults;

#[async_trait]
impl ScanProvider for MissingResults {
    async fn submit_scan(&self, _: &str, _: &str, _: &str) -> Result<()> {
        Ok(())
    }

    async fn export_result(&self, scan_id: &str, result_id: &str, format: ExportFormat) -> Result<ExportReceipt> {
        Ok(ExportReceipt {
            scan_id: scan_id.to_string(),
            result_id: result_id.to_string(),
            export_id: "exp-1".to_string(),
            format,
            status: "pending",
        })
    }

    async fn get_detailed_result(&self, _: &str, _: &str) -> Result<Value> {
        Err(AppError::provider("Copyleaks", Some(404), "Result not found"))
    }
}

fn state(scanner: Option<Arc<dyn ScanProvider>>) -> AppState {
    let openai: Arc<dyn CompletionBackend> = Arc::new(EchoBackend {
        provider: LlmProvider::OpenAi,
        reply: "```\nCity council approves new budget.\n```",
    });
    AppState {
        providers: Arc::new(ProviderSelector::new(LlmProvider::OpenAi, Some(openai), None)),
        scanner,
        store: Arc::new(CorrelationStore::new()),
    }
}

fn app() -> Router {
    create_router(state(None))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if body.is_some() {
        request = request.header("content-type", "application/json");
    }
    let request = request
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn export_data_is_empty_before_any_webhook() {
    let app = app();
    let (status, body) = send(&app, "GET", "/copyleaks/export-data?scanId=s1", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hasData"], false);
    assert_eq!(body["data"], json!({}));
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn completed_webhook_is_visible_through_export_data() {
    let app = app();
    let (status, ack) = send(&app, "POST", "/copyleaks/export/completed/s1", Some(r#"{"foo": 1}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["key"], "completed-s1");

    let (status, body) = send(&app, "GET", "/copyleaks/export-data?scanId=s1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hasData"], true);
    assert_eq!(body["data"], json!({"completed": {"foo": 1}}));
}

#[tokio::test]
async fn export_data_includes_result_only_when_requested() {
    let app = app();
    send(&app, "POST", "/copyleaks/export/source/s1", Some(r#"{"text": "original"}"#)).await;
    send(&app, "POST", "/copyleaks/export/result/s1/r7", Some(r#"{"matched": 12}"#)).await;

    let (_, body) = send(&app, "GET", "/copyleaks/export-data?scanId=s1", None).await;
    assert_eq!(body["data"], json!({"source": {"text": "original"}}));

    let (_, body) = send(&app, "GET", "/copyleaks/export-data?scanId=s1&resultId=r7", None).await;
    assert_eq!(body["data"]["result"], json!({"matched": 12}));
    assert_eq!(body["data"]["source"], json!({"text": "original"}));
}

#[tokio::test]
async fn export_status_reports_pending_then_available() {
    let app = app();
    let (status, body) = send(&app, "GET", "/copyleaks/export/completed/s2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "not_found");
    assert!(body.get("data").is_none());

    send(&app, "POST", "/copyleaks/export/completed/s2", Some(r#"{"results": []}"#)).await;
    let (_, body) = send(&app, "GET", "/copyleaks/export/completed/s2", None).await;
    assert_eq!(body["status"], "available");
    assert_eq!(body["data"], json!({"results": []}));
}

#[tokio::test]
async fn redelivered_webhook_leaves_store_unchanged() {
    let app = app();
    let payload = r#"{"status": 0, "results": [{"id": "r1"}]}"#;
    send(&app, "POST", "/copyleaks/export/completed/s3", Some(payload)).await;
    let (_, before) = send(&app, "GET", "/copyleaks/correlation-keys", None).await;
    send(&app, "POST", "/copyleaks/export/completed/s3", Some(payload)).await;
    let (_, after) = send(&app, "GET", "/copyleaks/correlation-keys", None).await;

    assert_eq!(before["keys"], after["keys"]);
    assert_eq!(after["count"], 1);
    let (_, body) = send(&app, "GET", "/copyleaks/export/completed/s3", None).await;
    assert_eq!(body["data"], serde_json::from_str::<Value>(payload).unwrap());
}

#[tokio::test]
async fn malformed_webhook_body_is_rejected() {
    let app = app();
    let (status, body) = send(&app, "POST", "/copyleaks/export/source/s1", Some("{not json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "malformed_payload");
    assert!(body["error"].as_str().unwrap().starts_with("Malformed JSON payload"));
}

#[tokio::test]
async fn export_data_requires_scan_id() {
    let (status, body) = send(&app(), "GET", "/copyleaks/export-data", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required field: scanId");
}

#[tokio::test]
async fn scan_validates_before_checking_credentials() {
    let app = app();
    let (status, body) = send(&app, "POST", "/copyleaks/scan", Some(r#"{"sourceArticle": "", "finalArticle": "B"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "missing_field");

    let (status, body) = send(&app, "POST", "/copyleaks/scan", Some(r#"{"sourceArticle": "A"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required field: finalArticle");

    let (status, body) = send(&app, "POST", "/copyleaks/scan", Some(r#"{"sourceArticle": "A", "finalArticle": "B"}"#)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Copyleaks is not configured");
}

#[tokio::test]
async fn scan_submits_to_copyleaks_without_waiting_for_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/account/login/api"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "tok"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/v3/scans/submit/file/[a-z0-9]{20}-(source|final)$"))
        .respond_with(ResponseTemplate::new(201))
        .expect(2)
        .mount(&server)
        .await;

    let client = CopyleaksClient::new(CopyleaksConfig {
        email: "desk@example.com".to_string(),
        api_key: "key".to_string(),
        identity_url: server.uri(),
        api_url: server.uri(),
        webhook_base_url: "https://hooks.example.com".to_string(),
        sandbox: true,
    });
    let app = create_router(state(Some(Arc::new(client))));

    let (status, body) = send(&app, "POST", "/copyleaks/scan", Some(r#"{"sourceArticle": "A", "finalArticle": "B"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "submitted");
    let scan_id = body["scanId"].as_str().unwrap();
    assert!(scan_id.ends_with("-final"));
    assert!(body["sourceScanId"].as_str().unwrap().ends_with("-source"));
}

#[tokio::test]
async fn scan_article_reports_counts_and_poll_urls() {
    let app = create_router(state(Some(Arc::new(MissingResults))));
    let (status, body) = send(
        &app,
        "POST",
        "/copyleaks/scan-article",
        Some(r#"{"sourceArticle": "one two three", "finalArticle": "one two"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sourceWordCount"], 3);
    assert_eq!(body["finalWordCount"], 2);
    let scan_id = body["scanId"].as_str().unwrap();
    assert_eq!(body["exportDataUrl"], format!("/copyleaks/export-data?scanId={}", scan_id));
}

#[tokio::test]
async fn test_scan_requires_filename_and_valid_id() {
    let app = create_router(state(Some(Arc::new(MissingResults))));
    let (status, body) = send(&app, "POST", "/copyleaks/test-scan", Some(r#"{"content": "hello"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required field: filename");

    let (status, body) = send(
        &app,
        "POST",
        "/copyleaks/test-scan",
        Some(r#"{"content": "hello", "filename": "a.txt", "scanId": "Not Valid"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_scan_id");

    let (status, body) = send(
        &app,
        "POST",
        "/copyleaks/test-scan",
        Some(r#"{"content": "hello", "filename": "a.txt", "scanId": "diag-1"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scanId"], "diag-1");
}

#[tokio::test]
async fn export_returns_acknowledgement_and_checks_format() {
    let app = create_router(state(Some(Arc::new(MissingResults))));
    let (status, body) = send(&app, "POST", "/copyleaks/export", Some(r#"{"scanId": "s1", "resultId": "r1"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["format"], "full");

    let (status, body) = send(
        &app,
        "POST",
        "/copyleaks/export",
        Some(r#"{"scanId": "s1", "resultId": "r1", "format": "pdf"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_export_format");
}

#[tokio::test]
async fn detailed_result_surfaces_provider_failure() {
    let app = create_router(state(Some(Arc::new(MissingResults))));
    let (status, body) = send(&app, "GET", "/copyleaks/detailed-result?scanId=s1&resultId=r1", None).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "provider_error");
    assert_eq!(body["error"], "Copyleaks error (404): Result not found");
}

#[tokio::test]
async fn ids_with_path_separators_never_reach_copyleaks() {
    let server = MockServer::start().await;
    Mock::given(any()).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;
    let client = CopyleaksClient::new(CopyleaksConfig {
        email: "desk@example.com".to_string(),
        api_key: "key".to_string(),
        identity_url: server.uri(),
        api_url: server.uri(),
        webhook_base_url: "https://hooks.example.com".to_string(),
        sandbox: true,
    });
    let app = create_router(state(Some(Arc::new(client))));

    let (status, body) = send(
        &app,
        "GET",
        "/copyleaks/detailed-result?scanId=..%2F..%2F..%2Fv3%2Faccount%2Fsecret&resultId=x",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_scan_id");

    let (status, body) = send(
        &app,
        "POST",
        "/copyleaks/export",
        Some(r#"{"scanId": "s1", "resultId": "../../v3/account"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_scan_id");
}

#[tokio::test]
async fn blank_webhook_scan_id_is_rejected() {
    let app = app();
    let (status, body) = send(&app, "POST", "/copyleaks/export/completed/%20", Some(r#"{"status": 0}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_callback");

    let (_, keys) = send(&app, "GET", "/copyleaks/correlation-keys", None).await;
    assert_eq!(keys["count"], 0);
}

#[tokio::test]
async fn padded_scan_ids_match_between_webhook_and_poll() {
    let app = app();
    let (_, ack) = send(&app, "POST", "/copyleaks/export/completed/%20s9%20", Some(r#"{"status": 0}"#)).await;
    assert_eq!(ack["key"], "completed-s9");

    let (status, body) = send(&app, "GET", "/copyleaks/export-data?scanId=%20s9", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scanId"], "s9");
    assert_eq!(body["hasData"], true);
}

#[tokio::test]
async fn provider_switch_rejects_unknown_vendor() {
    let app = app();
    let (_, body) = send(&app, "GET", "/ai-provider", None).await;
    assert_eq!(body["provider"], "openai");
    assert_eq!(body["available"], json!({"gemini": false, "openai": true}));

    let (status, body) = send(&app, "POST", "/ai-provider", Some(r#"{"provider": "anthropic"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_provider");

    let (_, body) = send(&app, "GET", "/ai-provider", None).await;
    assert_eq!(body["provider"], "openai");

    let (status, body) = send(&app, "POST", "/ai-provider", Some(r#"{"provider": "gemini"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["provider"], "gemini");
    assert_eq!(body["configured"], false);
}

#[tokio::test]
async fn lead_generation_uses_active_provider() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/generate/lead",
        Some(r#"{"articleText": "The council met on Tuesday.", "style": "straight"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lead"], "City council approves new budget.");
    assert_eq!(body["provider"], "openai");
    assert_eq!(body["style"], "straight");

    send(&app, "POST", "/ai-provider", Some(r#"{"provider": "gemini"}"#)).await;
    let (status, body) = send(&app, "POST", "/generate/lead", Some(r#"{"articleText": "Text"}"#)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Gemini is not configured");
}

#[tokio::test]
async fn narrative_requires_final_story() {
    let app = app();
    let (status, body) = send(&app, "POST", "/generate/narrative-story", Some(r#"{"narrativeOption": "scene"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required field: finalStory");

    let (status, body) = send(&app, "POST", "/generate/narrative-story", Some(r#"{"finalStory": "Story"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["narrativeOption"], "chronological");
}

#[tokio::test]
async fn non_json_request_body_uses_error_envelope() {
    let (status, body) = send(&app(), "POST", "/generate/lead", Some("articleText=hi")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "malformed_payload");
}
