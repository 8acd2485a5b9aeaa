use axum::{Json, extract::State, response::IntoResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::{
    enrichment::Enrichment,
    event::{RawNotification, decode},
    record::{NormalizedRecord, map_event},
    server::{AppState, app_error::AppError},
};

/// Body of every successful webhook response.
#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct SuccessEnvelope<T> {
    pub success: bool,
    pub data: T,
}

impl<T> SuccessEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Describes the service and its endpoints.
pub async fn welcome() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "online",
        "message": "Servidor Hikvision - Webhook",
        "endpoints": {
            "webhook": {
                "method": "POST",
                "path": "/webhook",
                "contentType": "multipart/form-data"
            }
        }
    }))
}

/// Normalizes an event pushed by the door camera.
///
/// Only decode failures are reported to the device. Face recognition is
/// attempted on every valid event but its failures never change the response.
#[axum::debug_handler]
#[instrument(skip_all)]
pub async fn post_webhook(
    State(state): State<Arc<AppState>>,
    notification: RawNotification,
) -> Result<Json<SuccessEnvelope<NormalizedRecord>>, AppError> {
    debug!(fields = ?notification.field_names(), "Received notification");

    let event = decode(&notification)
        .inspect_err(|error| debug!(reason = error.reason(), "Rejecting notification"))?;
    let device_ip = event.ip_address.clone();
    let mut record = map_event(event);

    match state.enrichment.enrich(&mut record, device_ip.as_deref()).await {
        Ok(Enrichment::Recognized(name)) => debug!(%name, "Replaced default name"),
        Ok(Enrichment::Unrecognized) => debug!("Keeping default name"),
        // Already logged by the coordinator.
        Err(_) => {}
    }

    info!(
        device = %record.device_name,
        event_type = %record.event_type,
        name = %record.name,
        "Notification processed"
    );
    Ok(Json(SuccessEnvelope::new(record)))
}
