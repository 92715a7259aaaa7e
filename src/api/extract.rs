use axum::async_trait;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;

use crate::error::{AppError, Result};

/// `Json` whose rejections use the crate's error body.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::MalformedPayload(rejection.body_text()))?;
        Ok(JsonBody(value))
    }
}

/// Returns the text when it has non-whitespace content.
pub fn require_text<'a>(field: &'static str, value: Option<&'a str>) -> Result<&'a str> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(AppError::MissingField(field)),
    }
}
