use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::LlmProvider;

// Request fields are optional so absence surfaces as `MissingField`
// rather than a deserialization failure.

#[derive(Deserialize)]
pub struct SetProviderRequest {
    pub provider: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadRequest {
    pub article_text: Option<String>,
    pub style: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeRequest {
    pub final_story: Option<String>,
    pub narrative_option: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareRequest {
    pub source_article: Option<String>,
    pub final_article: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestScanRequest {
    pub content: Option<String>,
    pub filename: Option<String>,
    pub scan_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub scan_id: Option<String>,
    pub result_id: Option<String>,
    pub format: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanQuery {
    pub scan_id: Option<String>,
    pub result_id: Option<String>,
}

#[derive(Serialize)]
pub struct ProviderStatus {
    pub provider: LlmProvider,
    /// Whether credentials are present, per vendor.
    pub available: BTreeMap<&'static str, bool>,
}

#[derive(Serialize)]
pub struct ProviderChanged {
    pub provider: LlmProvider,
    pub configured: bool,
    pub message: String,
}

#[derive(Serialize)]
pub struct LeadResponse {
    pub lead: String,
    pub provider: LlmProvider,
    pub model: String,
    pub style: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeResponse {
    pub story: String,
    pub provider: LlmProvider,
    pub model: String,
    pub narrative_option: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanArticleResponse {
    pub scan_id: String,
    pub source_scan_id: String,
    pub status: &'static str,
    pub submitted_at: DateTime<Utc>,
    pub source_word_count: usize,
    pub final_word_count: usize,
    pub export_status_url: String,
    pub export_data_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    NotFound,
    Available,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportStatusResponse {
    pub scan_id: String,
    pub status: ExportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_at: Option<DateTime<Utc>>,
}

#[derive(Default, Serialize)]
pub struct ExportPayloads {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl ExportPayloads {
    pub fn is_empty(&self) -> bool {
        self.completed.is_none() && self.source.is_none() && self.result.is_none()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDataResponse {
    pub scan_id: String,
    pub has_data: bool,
    pub data: ExportPayloads,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedResultResponse {
    pub scan_id: String,
    pub result_id: String,
    pub result: Value,
}

#[derive(Serialize)]
pub struct WebhookAck {
    pub message: &'static str,
    pub key: String,
}

#[derive(Serialize)]
pub struct CorrelationKeys {
    pub count: usize,
    pub keys: Vec<String>,
}
