use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use serde_json::Value;

use crate::AppState;
use crate::api::extract::{require_text, JsonBody};
use crate::api::models::{
    CompareRequest, CorrelationKeys, DetailedResultResponse, ExportDataResponse, ExportPayloads, ExportRequest,
    ExportStatus, ExportStatusResponse, ScanArticleResponse, ScanQuery, TestScanRequest, WebhookAck,
};
use crate::api::response::{self, Success};
use crate::copyleaks::{self, ExportFormat};
use crate::error::{AppError, Result};
use crate::store::CorrelationKey;

pub async fn scan(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CompareRequest>,
) -> Result<impl IntoResponse> {
    let source_article = require_text("sourceArticle", req.source_article.as_deref())?;
    let final_article = require_text("finalArticle", req.final_article.as_deref())?;

    let submission = copyleaks::compare_articles(state.scanner()?, source_article, final_article).await?;
    Ok(response::success(submission))
}

pub async fn scan_article(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CompareRequest>,
) -> Result<impl IntoResponse> {
    let source_article = require_text("sourceArticle", req.source_article.as_deref())?;
    let final_article = require_text("finalArticle", req.final_article.as_deref())?;

    let submission = copyleaks::compare_articles(state.scanner()?, source_article, final_article).await?;

    Ok(response::success(ScanArticleResponse {
        export_status_url: format!("/copyleaks/export/completed/{}", submission.scan_id),
        export_data_url: format!("/copyleaks/export-data?scanId={}", submission.scan_id),
        scan_id: submission.scan_id,
        source_scan_id: submission.source_scan_id,
        status: submission.status,
        submitted_at: submission.submitted_at,
        source_word_count: source_article.split_whitespace().count(),
        final_word_count: final_article.split_whitespace().count(),
    }))
}

pub async fn test_scan(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<TestScanRequest>,
) -> Result<impl IntoResponse> {
    let content = require_text("content", req.content.as_deref())?;
    let filename = require_text("filename", req.filename.as_deref())?;
    let scan_id = req.scan_id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty());

    let submission = copyleaks::submit_single(state.scanner()?, content, filename.trim(), scan_id).await?;
    Ok(response::success(submission))
}

pub async fn export(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ExportRequest>,
) -> Result<impl IntoResponse> {
    let (scan_id, result_id) = provider_ids(req.scan_id.as_deref(), req.result_id.as_deref())?;
    let format = match req.format.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
        Some(raw) => raw.parse::<ExportFormat>()?,
        None => ExportFormat::default(),
    };

    let receipt = state.scanner()?.export_result(scan_id, result_id, format).await?;
    Ok(response::success(receipt))
}

/// Everything the webhooks have delivered for a scan so far.
pub async fn export_data(
    State(state): State<AppState>,
    Query(query): Query<ScanQuery>,
) -> Result<impl IntoResponse> {
    let scan_id = require_text("scanId", query.scan_id.as_deref())?.trim().to_string();
    let result_id = query
        .result_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());

    let payload = |key: CorrelationKey| state.store.get(&key).map(|record| record.data);
    let data = ExportPayloads {
        completed: payload(CorrelationKey::Completed(scan_id.clone())),
        source: payload(CorrelationKey::Source(scan_id.clone())),
        result: result_id.and_then(|result_id| {
            payload(CorrelationKey::Result {
                scan_id: scan_id.clone(),
                result_id,
            })
        }),
    };

    Ok(response::success(ExportDataResponse {
        scan_id,
        has_data: !data.is_empty(),
        data,
    }))
}

pub async fn detailed_result(
    State(state): State<AppState>,
    Query(query): Query<ScanQuery>,
) -> Result<impl IntoResponse> {
    let (scan_id, result_id) = provider_ids(query.scan_id.as_deref(), query.result_id.as_deref())?;

    let result = state.scanner()?.get_detailed_result(scan_id, result_id).await?;
    Ok(response::success(DetailedResultResponse {
        scan_id: scan_id.to_string(),
        result_id: result_id.to_string(),
        result,
    }))
}

pub async fn completed_webhook(
    State(state): State<AppState>,
    Path(scan_id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let scan_id = callback_id(scan_id)?;
    ingest(&state, CorrelationKey::Completed(scan_id), &body)
}

pub async fn source_webhook(
    State(state): State<AppState>,
    Path(scan_id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let scan_id = callback_id(scan_id)?;
    ingest(&state, CorrelationKey::Source(scan_id), &body)
}

pub async fn result_webhook(
    State(state): State<AppState>,
    Path((scan_id, result_id)): Path<(String, String)>,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let key = CorrelationKey::Result {
        scan_id: callback_id(scan_id)?,
        result_id: callback_id(result_id)?,
    };
    ingest(&state, key, &body)
}

/// Export completion notice. Payloads arrive on the other routes, so this
/// only records the outcome in the log.
pub async fn export_done_webhook(Path(scan_id): Path<String>, body: Bytes) -> Result<impl IntoResponse> {
    let scan_id = callback_id(scan_id)?;
    let payload = parse_payload(&body)?;
    let completed = payload["completed"].as_bool().unwrap_or(false);
    if completed {
        tracing::info!(scan_id = %scan_id, "Copyleaks export completed");
    } else {
        tracing::warn!(scan_id = %scan_id, payload = %payload, "Copyleaks export finished with failures");
    }

    Ok(response::success(WebhookAck {
        message: "Webhook received",
        key: format!("export-done-{}", scan_id),
    }))
}

pub async fn completed_status(
    State(state): State<AppState>,
    Path(scan_id): Path<String>,
) -> Result<impl IntoResponse> {
    let scan_id = callback_id(scan_id)?;
    Ok(export_status(&state, CorrelationKey::Completed(scan_id)))
}

pub async fn source_status(
    State(state): State<AppState>,
    Path(scan_id): Path<String>,
) -> Result<impl IntoResponse> {
    let scan_id = callback_id(scan_id)?;
    Ok(export_status(&state, CorrelationKey::Source(scan_id)))
}

pub async fn correlation_keys(State(state): State<AppState>) -> impl IntoResponse {
    let keys = state.store.keys();
    response::success(CorrelationKeys { count: keys.len(), keys })
}

/// A payload that has not arrived yet is reported as `not_found`, not as an error.
fn export_status(state: &AppState, key: CorrelationKey) -> Success<ExportStatusResponse> {
    let scan_id = key.scan_id().to_string();
    let body = match state.store.get(&key) {
        Some(record) => ExportStatusResponse {
            scan_id,
            status: ExportStatus::Available,
            data: Some(record.data),
            received_at: Some(record.timestamp),
        },
        None => ExportStatusResponse {
            scan_id,
            status: ExportStatus::NotFound,
            data: None,
            received_at: None,
        },
    };
    response::success(body)
}

fn ingest(state: &AppState, key: CorrelationKey, body: &[u8]) -> Result<Success<WebhookAck>> {
    let payload = parse_payload(body)?;
    let record = state.store.put(key, payload);
    tracing::info!(key = %record.key, bytes = body.len(), "Stored webhook payload");

    Ok(response::success(WebhookAck {
        message: "Webhook received",
        key: record.key,
    }))
}

fn parse_payload(body: &[u8]) -> Result<Value> {
    serde_json::from_slice(body).map_err(|e| AppError::MalformedPayload(e.to_string()))
}

/// Ids forwarded into Copyleaks request paths.
fn provider_ids<'a>(scan_id: Option<&'a str>, result_id: Option<&'a str>) -> Result<(&'a str, &'a str)> {
    let scan_id = require_text("scanId", scan_id)?.trim();
    let result_id = require_text("resultId", result_id)?.trim();
    copyleaks::validate_scan_id(scan_id)?;
    copyleaks::validate_result_id(result_id)?;
    Ok((scan_id, result_id))
}

fn callback_id(raw: String) -> Result<String> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(AppError::InvalidCallback("missing scan identifier in callback path".to_string()));
    }
    Ok(id.to_string())
}
