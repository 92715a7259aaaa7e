use axum::{
    response::{IntoResponse, Response},
    Json,
    http::StatusCode,
};
use serde::Serialize;

#[derive(Serialize)]
pub struct ErrorResponse {
    error: String,
    code: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid AI provider '{0}', expected 'openai' or 'gemini'")]
    InvalidProvider(String),

    #[error("Invalid scan or result id '{0}': use up to 36 characters from a-z, 0-9 and !@$^&-+%=")]
    InvalidScanId(String),

    #[error("Invalid export format '{0}', expected 'full' or 'results'")]
    InvalidExportFormat(String),

    #[error("{0} is not configured")]
    ProviderNotConfigured(&'static str),

    #[error("{provider} error{}: {message}", status_suffix(.status))]
    Provider {
        provider: &'static str,
        status: Option<u16>,
        message: String,
    },

    #[error("Malformed JSON payload: {0}")]
    MalformedPayload(String),

    #[error("Invalid webhook callback: {0}")]
    InvalidCallback(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AppError {
    pub fn provider(provider: &'static str, status: Option<u16>, message: impl Into<String>) -> Self {
        AppError::Provider {
            provider,
            status,
            message: message.into(),
        }
    }

    /// Stable identifier clients can match on without parsing the message.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::MissingField(_) => "missing_field",
            AppError::InvalidProvider(_) => "invalid_provider",
            AppError::InvalidScanId(_) => "invalid_scan_id",
            AppError::InvalidExportFormat(_) => "invalid_export_format",
            AppError::ProviderNotConfigured(_) => "provider_not_configured",
            AppError::Provider { .. } => "provider_error",
            AppError::MalformedPayload(_) => "malformed_payload",
            AppError::InvalidCallback(_) => "invalid_callback",
            AppError::ConfigError(_) => "config_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingField(_)
            | AppError::InvalidProvider(_)
            | AppError::InvalidScanId(_)
            | AppError::InvalidExportFormat(_)
            | AppError::MalformedPayload(_)
            | AppError::InvalidCallback(_) => StatusCode::BAD_REQUEST,
            AppError::ProviderNotConfigured(_) | AppError::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Provider { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), "{}", self);
        } else {
            tracing::warn!(code = self.code(), "{}", self);
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: self.code(),
        });

        (status, body).into_response()
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({})", s)).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, AppError>;
