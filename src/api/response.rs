use axum::Json;
use axum::http::StatusCode;
use chrono::Utc;
use serde::Serialize;

/// Success envelope: the payload's fields sit next to `success` and `timestamp`.
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub timestamp: String,
    #[serde(flatten)]
    pub data: T,
}

pub type Success<T> = (StatusCode, Json<ApiResponse<T>>);

pub fn success<T: Serialize>(data: T) -> Success<T> {
    (
        StatusCode::OK,
        Json(ApiResponse {
            success: true,
            timestamp: Utc::now().to_rfc3339(),
            data,
        }),
    )
}
