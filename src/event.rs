use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body field carrying the device's event payload.
pub const EVENT_LOG_FIELD: &str = "event_log";

/// Marker object that identifies an access-control event.
pub const ACCESS_CONTROLLER_EVENT_FIELD: &str = "AccessControllerEvent";

/// The notification body as the device sent it.
///
/// Multipart and urlencoded bodies produce string values, JSON bodies may carry
/// already structured values.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RawNotification {
    fields: AHashMap<String, Value>,
}

impl RawNotification {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.fields.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl FromIterator<(String, Value)> for RawNotification {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Error raised when a notification can't be turned into an [`AccessEvent`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Falha ao parsear event_log: {0}")]
    MalformedPayload(#[source] serde_json::Error),

    #[error("Formato de dados inválido da câmera. Estrutura AccessControllerEvent ausente.")]
    MissingAccessControllerEvent,
}

impl DecodeError {
    /// Short machine-friendly reason, used in logs.
    pub fn reason(&self) -> &'static str {
        match self {
            DecodeError::MalformedPayload(_) => "malformed payload",
            DecodeError::MissingAccessControllerEvent => "missing AccessControllerEvent",
        }
    }
}

/// Vendor fields of the `AccessControllerEvent` object.
///
/// Every field is kept as a raw JSON value: firmwares differ on whether they
/// send numbers or strings, and a field of an unexpected type must not make the
/// whole event unreadable.
#[derive(Debug, Default, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccessControllerEvent {
    pub device_name: Option<Value>,
    pub major_event_type: Option<Value>,
    pub sub_event_type: Option<Value>,
    pub current_verify_mode: Option<Value>,
    pub serial_no: Option<Value>,
    pub employee_no_string: Option<Value>,
}

/// False for the values devices use to mean "not set": `null`, `false`, `0` and `""`.
pub fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64() != Some(0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// A validated access-control notification.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessEvent {
    pub controller: AccessControllerEvent,
    pub ip_address: Option<String>,
    pub mac_address: Option<String>,
    pub date_time: Option<String>,
    /// The decoded `event_log` object, kept for auditing.
    pub raw: Value,
}

impl AccessEvent {
    fn from_event_log(event_log: Value) -> Result<Self, DecodeError> {
        let controller = match event_log.get(ACCESS_CONTROLLER_EVENT_FIELD) {
            Some(controller) if is_set(controller) => controller,
            _ => return Err(DecodeError::MissingAccessControllerEvent),
        };
        // Any other marker is accepted, it just has no fields to read.
        let controller = match controller {
            Value::Object(_) => AccessControllerEvent::deserialize(controller).unwrap_or_default(),
            _ => AccessControllerEvent::default(),
        };
        let text = |name: &str| {
            event_log
                .get(name)
                .and_then(Value::as_str)
                .filter(|value| !value.is_empty())
                .map(str::to_owned)
        };

        Ok(Self {
            ip_address: text("ipAddress"),
            mac_address: text("macAddress"),
            date_time: text("dateTime"),
            controller,
            raw: event_log,
        })
    }
}

/// Extracts and validates the access event carried by a notification.
///
/// The `event_log` field may hold serialized JSON or an already structured
/// object.
pub fn decode(notification: &RawNotification) -> Result<AccessEvent, DecodeError> {
    let event_log = match notification.get(EVENT_LOG_FIELD) {
        Some(Value::String(text)) => {
            serde_json::from_str(text).map_err(DecodeError::MalformedPayload)?
        }
        Some(structured) => structured.clone(),
        None => Value::Null,
    };
    AccessEvent::from_event_log(event_log)
}
