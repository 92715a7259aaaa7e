use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;

use super::{new_scan_id, ExportFormat, ExportReceipt, ScanProvider};
use crate::config::CopyleaksConfig;
use crate::error::{AppError, Result};
use crate::http::{upstream_message, CLIENT};

const PROVIDER: &str = "Copyleaks";

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    key: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    access_token: String,
    #[serde(rename = ".expires")]
    expires: Option<DateTime<Utc>>,
}

#[derive(Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Utc::now() + Duration::minutes(5) < self.expires_at
    }
}

pub struct CopyleaksClient {
    config: CopyleaksConfig,
    token: Mutex<Option<AccessToken>>,
}

impl CopyleaksClient {
    pub fn new(config: CopyleaksConfig) -> Self {
        Self {
            config,
            token: Mutex::new(None),
        }
    }

    /// Webhook URL for `path` under the public base.
    fn webhook(&self, path: &str) -> String {
        format!("{}/copyleaks/{}", self.config.webhook_base_url, path)
    }

    /// API URL with each segment percent-encoded, so an id can never add path levels.
    fn api_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.config.api_url)
            .map_err(|e| AppError::ConfigError(format!("Invalid COPYLEAKS_API_URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::ConfigError("COPYLEAKS_API_URL is not a base URL".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        tracing::debug!("Logging in to Copyleaks");
        let res = CLIENT
            .post(format!("{}/v3/account/login/api", self.config.identity_url))
            .json(&LoginRequest {
                email: &self.config.email,
                key: &self.config.api_key,
            })
            .send()
            .await
            .map_err(transport)?;
        let res = check(res).await?;
        let login: LoginResponse = res
            .json()
            .await
            .map_err(|e| AppError::provider(PROVIDER, None, format!("Invalid login response: {}", e)))?;

        // Tokens are issued for 48 hours; assume slightly less when no expiry is sent
        let token = AccessToken {
            value: login.access_token,
            expires_at: login.expires.unwrap_or_else(|| Utc::now() + Duration::hours(47)),
        };
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    /// A rejected token is dropped so the next call logs in again.
    async fn forget_token_on_unauthorized(&self, status: StatusCode) {
        if status == StatusCode::UNAUTHORIZED {
            *self.token.lock().await = None;
        }
    }

    async fn authorized(&self, res: Response) -> Result<Response> {
        self.forget_token_on_unauthorized(res.status()).await;
        check(res).await
    }
}

fn transport(err: reqwest::Error) -> AppError {
    AppError::provider(PROVIDER, None, err.to_string())
}

async fn check(res: Response) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    Err(AppError::provider(PROVIDER, Some(status.as_u16()), upstream_message(&body)))
}

#[async_trait]
impl ScanProvider for CopyleaksClient {
    async fn submit_scan(&self, scan_id: &str, content: &str, filename: &str) -> Result<()> {
        let token = self.access_token().await?;
        let body = json!({
            "base64": STANDARD.encode(content.as_bytes()),
            "filename": filename,
            "properties": {
                "sandbox": self.config.sandbox,
                "webhooks": {
                    "status": self.webhook(&format!("export/completed/{}", scan_id)),
                },
            },
        });

        let res = CLIENT
            .put(self.api_url(&["v3", "scans", "submit", "file", scan_id])?)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        self.authorized(res).await?;

        tracing::debug!(scan_id, filename, sandbox = self.config.sandbox, "Scan accepted by Copyleaks");
        Ok(())
    }

    async fn export_result(&self, scan_id: &str, result_id: &str, format: ExportFormat) -> Result<ExportReceipt> {
        let token = self.access_token().await?;
        let export_id = new_scan_id();

        let mut body = json!({
            "results": [{
                "id": result_id,
                "verb": "POST",
                "endpoint": self.webhook(&format!("export/result/{}/{}", scan_id, result_id)),
            }],
            "completionWebhook": self.webhook(&format!("export/done/{}", scan_id)),
            "maxRetries": 3,
        });
        if format == ExportFormat::Full {
            body["crawledVersion"] = json!({
                "verb": "POST",
                "endpoint": self.webhook(&format!("export/source/{}", scan_id)),
            });
        }

        let res = CLIENT
            .post(self.api_url(&["v3", "downloads", scan_id, "export", &export_id])?)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        self.authorized(res).await?;

        tracing::info!(scan_id, result_id, export_id = %export_id, "Export requested");
        Ok(ExportReceipt {
            scan_id: scan_id.to_string(),
            result_id: result_id.to_string(),
            export_id,
            format,
            status: "pending",
        })
    }

    async fn get_detailed_result(&self, scan_id: &str, result_id: &str) -> Result<Value> {
        let token = self.access_token().await?;
        let res = CLIENT
            .get(self.api_url(&["v3", "downloads", scan_id, "results", result_id])?)
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;
        let res = self.authorized(res).await?;

        res.json()
            .await
            .map_err(|e| AppError::provider(PROVIDER, None, format!("Invalid result payload: {}", e)))
    }
}
