//! Message model shared by every layer of the broker.
//!
//! A [`Message`] is an open JSON header plus an optional opaque text payload.
//! The core interprets a handful of reserved header fields (`type`, `id`,
//! `to`, `from`, `service`, `error`); everything else passes through verbatim.

use crate::CorrelationId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Open header mapping. Key order is preserved but carries no meaning.
pub type Header = Map<String, Value>;

pub(crate) const TYPE: &str = "type";
pub(crate) const ID: &str = "id";
pub(crate) const TO: &str = "to";
pub(crate) const FROM: &str = "from";
pub(crate) const SERVICE: &str = "service";
pub(crate) const SERVICES: &str = "services";
pub(crate) const ERROR: &str = "error";

/// Header discriminants understood by this endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Call or publish, outbound and inbound.
    ServiceRequest,
    /// Reply to a `ServiceRequest`, possibly carrying `error`.
    ServiceResponse,
    /// Broker-originated reply, routed like a `ServiceResponse`.
    SbStatusResponse,
    /// Full resync of this endpoint's advertised services.
    SbAdvertiseRequest,
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::ServiceRequest => "ServiceRequest",
            MessageType::ServiceResponse => "ServiceResponse",
            MessageType::SbStatusResponse => "SbStatusResponse",
            MessageType::SbAdvertiseRequest => "SbAdvertiseRequest",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ServiceRequest" => Some(MessageType::ServiceRequest),
            "ServiceResponse" => Some(MessageType::ServiceResponse),
            "SbStatusResponse" => Some(MessageType::SbStatusResponse),
            "SbAdvertiseRequest" => Some(MessageType::SbAdvertiseRequest),
            _ => None,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<MessageType> for Value {
    fn from(value: MessageType) -> Self {
        Value::String(value.as_str().to_string())
    }
}

/// Identifies what a request targets or what a provider offers.
///
/// # Example
///
/// ```
/// use service_broker::ServiceSelector;
///
/// let selector = ServiceSelector::new("tts").with_capabilities(["v2", "fast"]);
/// assert_eq!(selector.name, "tts");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSelector {
    /// Service name, the registry key.
    pub name: String,

    /// Ordered capability tags, a filter hint for the broker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Vec<String>>,

    /// Advertisement priority, passed through to the broker when advertising.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
}

impl ServiceSelector {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capabilities: None,
            priority: None,
        }
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = Some(capabilities.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub(crate) fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("name".into(), Value::String(self.name.clone()));
        if let Some(capabilities) = &self.capabilities {
            map.insert(
                "capabilities".into(),
                Value::Array(capabilities.iter().cloned().map(Value::String).collect()),
            );
        }
        if let Some(priority) = self.priority {
            map.insert("priority".into(), Value::from(priority));
        }
        Value::Object(map)
    }
}

impl From<&str> for ServiceSelector {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ServiceSelector {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Unit of exchange: JSON header plus optional text payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    pub header: Header,
    pub payload: Option<String>,
}

impl Message {
    /// Empty header, no payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty header carrying `payload`.
    pub fn text(payload: impl Into<String>) -> Self {
        Self {
            header: Header::new(),
            payload: Some(payload.into()),
        }
    }

    pub fn from_parts(header: Header, payload: Option<String>) -> Self {
        Self { header, payload }
    }

    /// Set a header field (builder style).
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.header.insert(key.into(), value.into());
        self
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn payload_str(&self) -> Option<&str> {
        self.payload.as_deref()
    }

    /// The `type` discriminant, if it is one this endpoint knows.
    pub fn message_type(&self) -> Option<MessageType> {
        self.header
            .get(TYPE)
            .and_then(Value::as_str)
            .and_then(MessageType::parse)
    }

    /// Correlation id, when `id` is a non-negative integer.
    pub fn id(&self) -> Option<CorrelationId> {
        self.header
            .get(ID)
            .and_then(Value::as_u64)
            .map(CorrelationId::from)
    }

    /// The `service` selector, if present and well formed.
    pub fn service(&self) -> Option<ServiceSelector> {
        self.header
            .get(SERVICE)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// `service.name`, whatever else the selector carries.
    pub fn service_name(&self) -> Option<&str> {
        self.header.get(SERVICE)?.get("name")?.as_str()
    }

    /// Sender endpoint id as set by the broker on delivery.
    pub fn from_endpoint(&self) -> Option<&Value> {
        self.header.get(FROM).filter(|value| !value.is_null())
    }

    /// Error text of a failed response.
    ///
    /// Absent, `null`, `false` and empty values do not count as an error.
    pub fn error(&self) -> Option<String> {
        let value = self.header.get(ERROR)?;
        if !is_truthy(value) {
            return None;
        }
        Some(match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
    }

    /// Whether the sender expects a reply (`id` present and truthy).
    pub(crate) fn expects_reply(&self) -> bool {
        self.header.get(ID).is_some_and(is_truthy)
    }
}

/// JSON truthiness as the broker protocol treats optional fields.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
