use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::{AccessEvent, is_set};

/// Name reported when nobody was recognized.
pub const UNKNOWN_NAME: &str = "Desconhecido";
pub const DEFAULT_DEVICE_NAME: &str = "subdoorOne";
pub const IP_NOT_PROVIDED: &str = "Não informado";
pub const NOT_AVAILABLE: &str = "N/A";

/// Major event types with a human readable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::FromRepr)]
#[repr(i64)]
pub enum MajorEventType {
    #[strum(serialize = "Alarm")]
    Alarm = 1,
    #[strum(serialize = "Access Control")]
    AccessControl = 2,
    #[strum(serialize = "Network Event")]
    NetworkEvent = 3,
}

impl MajorEventType {
    /// Looks up a code as sent by the device, either a number or a numeric string.
    pub fn from_code(code: &Value) -> Option<Self> {
        let code = match code {
            Value::Number(number) => number.as_i64()?,
            Value::String(text) => text.trim().parse().ok()?,
            _ => return None,
        };
        Self::from_repr(code)
    }
}

/// Human readable event type, `Unknown (<code>)` for unmapped codes.
pub fn event_type_label(code: Option<&Value>) -> String {
    match code {
        Some(code) => match MajorEventType::from_code(code) {
            Some(event_type) => event_type.to_string(),
            None => match code {
                Value::String(text) => format!("Unknown ({text})"),
                other => format!("Unknown ({other})"),
            },
        },
        None => "Unknown (undefined)".to_string(),
    }
}

/// The event in the stable schema returned to callers.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRecord {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "dispositivo")]
    pub device_name: String,
    #[serde(rename = "ip")]
    pub ip_address: String,
    pub mac_address: String,
    pub timestamp: String,
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_event_type: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_mode: Option<Value>,
    pub serial_number: String,
    pub employee_id: String,
    pub raw_data: Value,
}

/// Projects a decoded event into the output schema. Missing fields get defaults.
pub fn map_event(event: AccessEvent) -> NormalizedRecord {
    let AccessEvent {
        controller,
        ip_address,
        mac_address,
        date_time,
        raw,
    } = event;

    NormalizedRecord {
        name: UNKNOWN_NAME.to_string(),
        device_name: controller
            .device_name
            .as_ref()
            .and_then(set_text)
            .unwrap_or_else(|| DEFAULT_DEVICE_NAME.to_string()),
        ip_address: ip_address.unwrap_or_else(|| IP_NOT_PROVIDED.to_string()),
        mac_address: mac_address.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        timestamp: date_time
            .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        event_type: event_type_label(controller.major_event_type.as_ref()),
        sub_event_type: controller.sub_event_type.filter(|value| !value.is_null()),
        verify_mode: controller.current_verify_mode.filter(|value| !value.is_null()),
        serial_number: controller
            .serial_no
            .as_ref()
            .and_then(serial_text)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        employee_id: controller
            .employee_no_string
            .as_ref()
            .and_then(set_text)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        raw_data: raw,
    }
}

/// Text of a field that falls back to its default when unset, see [`is_set`].
fn set_text(value: &Value) -> Option<String> {
    match value {
        _ if !is_set(value) => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Serial numbers keep `0` and `false`, only null and empty mean unset.
fn serial_text(serial: &Value) -> Option<String> {
    match serial {
        Value::Null => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
