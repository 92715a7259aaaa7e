//! Plagiarism scanning through Copyleaks.
//!
//! Submissions return as soon as the provider accepts the job. Results come
//! back later through the webhook routes in `api::copyleaks`, which park them
//! in the [`CorrelationStore`](crate::store::CorrelationStore).

pub mod client;

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AppError, Result};

pub use client::CopyleaksClient;

const MAX_SCAN_ID_LEN: usize = 36;
const SCAN_ID_SYMBOLS: &str = "!@$^&-+%=";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Matched results plus the crawled source document.
    #[default]
    Full,
    /// Matched results only.
    Results,
}

impl FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" | "json" => Ok(ExportFormat::Full),
            "results" => Ok(ExportFormat::Results),
            _ => Err(AppError::InvalidExportFormat(s.to_string())),
        }
    }
}

/// Acknowledgement for an export; the payloads arrive later by webhook.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportReceipt {
    pub scan_id: String,
    pub result_id: String,
    pub export_id: String,
    pub format: ExportFormat,
    pub status: &'static str,
}

#[async_trait]
pub trait ScanProvider: Send + Sync {
    /// Queue `content` for scanning under `scan_id`. The filename extension
    /// tells the provider how to read the document.
    async fn submit_scan(&self, scan_id: &str, content: &str, filename: &str) -> Result<()>;

    async fn export_result(&self, scan_id: &str, result_id: &str, format: ExportFormat) -> Result<ExportReceipt>;

    async fn get_detailed_result(&self, scan_id: &str, result_id: &str) -> Result<Value>;
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSubmission {
    pub scan_id: String,
    pub status: &'static str,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSubmission {
    /// Scan of the final article; its results are the ones clients poll for.
    pub scan_id: String,
    pub source_scan_id: String,
    pub status: &'static str,
    pub submitted_at: DateTime<Utc>,
}

/// Fresh lowercase id short enough to take a `-source` or `-final` suffix.
pub fn new_scan_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[..20].to_string()
}

pub fn validate_scan_id(scan_id: &str) -> Result<()> {
    validate_id("scanId", scan_id)
}

pub fn validate_result_id(result_id: &str) -> Result<()> {
    validate_id("resultId", result_id)
}

/// Ids end up as URL path segments, so anything outside the provider
/// alphabet (notably `/` and `.`) is refused.
fn validate_id(field: &'static str, id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(AppError::MissingField(field));
    }
    let valid = id.len() <= MAX_SCAN_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || SCAN_ID_SYMBOLS.contains(c));
    if !valid {
        return Err(AppError::InvalidScanId(id.to_string()));
    }
    Ok(())
}

/// Submit both articles as separate scans sharing one base id.
pub async fn compare_articles(
    provider: &dyn ScanProvider,
    source_article: &str,
    final_article: &str,
) -> Result<ComparisonSubmission> {
    let base = new_scan_id();
    let source_scan_id = format!("{}-source", base);
    let scan_id = format!("{}-final", base);

    provider
        .submit_scan(&source_scan_id, source_article, "source-article.txt")
        .await?;
    provider.submit_scan(&scan_id, final_article, "final-article.txt").await?;

    tracing::info!(scan_id = %scan_id, source_scan_id = %source_scan_id, "Comparison scans submitted");
    Ok(ComparisonSubmission {
        scan_id,
        source_scan_id,
        status: "submitted",
        submitted_at: Utc::now(),
    })
}

/// Single document submission used to check the provider wiring.
pub async fn submit_single(
    provider: &dyn ScanProvider,
    content: &str,
    filename: &str,
    scan_id: Option<String>,
) -> Result<ScanSubmission> {
    let scan_id = scan_id.unwrap_or_else(new_scan_id);
    validate_scan_id(&scan_id)?;

    provider.submit_scan(&scan_id, content, filename).await?;

    tracing::info!(scan_id = %scan_id, filename, "Test scan submitted");
    Ok(ScanSubmission {
        scan_id,
        status: "submitted",
        submitted_at: Utc::now(),
    })
}
