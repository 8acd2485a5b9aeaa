use std::any::Any;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use crate::event::DecodeError;

/// Value of the `error` field of every failure response.
pub const PROCESSING_ERROR: &str = "processing error";

/// Error type for the webhook API.
///
/// Every error is reported to the device as a 400 with a short detail message:
///
/// ```json
/// {
///     "success": false,
///     "error": "processing error",
///     "details": "Falha ao parsear event_log: ..."
/// }
/// ```
#[derive(Debug, thiserror::Error, strum::AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AppError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Corpo da requisição inválido: {0}")]
    InvalidBody(String),

    #[error("Erro interno no processamento")]
    Unexpected,
}

/// Converts errors into HTTP responses.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Error code is the enum variant name in SCREAMING_SNAKE_CASE.
        let error_code = self.as_ref();
        let details = self.to_string();
        let json = serde_json::json!({
            "success": false,
            "error": PROCESSING_ERROR,
            "details": details,
        });

        warn!("Returning error {error_code}: {details}");
        (StatusCode::BAD_REQUEST, Json(json)).into_response()
    }
}

/// Turns a handler panic into the regular failure response.
///
/// The panic message is logged but not sent to the client.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    error!(%message, "Handler panicked");
    AppError::Unexpected.into_response()
}
