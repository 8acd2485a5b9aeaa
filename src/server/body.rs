use axum::{
    Form,
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use serde_json::Value;
use tracing::debug;

use crate::{
    event::{EVENT_LOG_FIELD, RawNotification},
    server::app_error::AppError,
};

/// Reads a notification from multipart, urlencoded or JSON bodies.
impl<S> FromRequest<S> for RawNotification
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(request, state)
                .await
                .map_err(|rejection| AppError::InvalidBody(rejection.body_text()))?;
            from_multipart(multipart).await
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(fields) = Form::<Vec<(String, String)>>::from_request(request, state)
                .await
                .map_err(|rejection| AppError::InvalidBody(rejection.body_text()))?;
            Ok(fields
                .into_iter()
                .map(|(name, value)| (name, Value::String(value)))
                .collect())
        } else {
            let body = Bytes::from_request(request, state)
                .await
                .map_err(|rejection| AppError::InvalidBody(rejection.body_text()))?;
            let fields: serde_json::Map<String, Value> = serde_json::from_slice(&body)
                .map_err(|error| AppError::InvalidBody(error.to_string()))?;
            Ok(fields.into_iter().collect())
        }
    }
}

/// Collects the text parts. Attached pictures are skipped.
async fn from_multipart(mut multipart: Multipart) -> Result<RawNotification, AppError> {
    let mut notification = RawNotification::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| AppError::InvalidBody(error.body_text()))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        if field.file_name().is_some() && name != EVENT_LOG_FIELD {
            debug!(%name, "Skipping file part");
            continue;
        }
        let value = field
            .text()
            .await
            .map_err(|error| AppError::InvalidBody(error.body_text()))?;
        notification.insert(name, value);
    }
    Ok(notification)
}
