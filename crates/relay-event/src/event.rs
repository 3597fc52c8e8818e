use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata describing where and when an event originated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventContext {
  /// Unique event ID.
  pub id: String,
  /// Identity of the producer (event source name).
  pub source: String,
  /// Subject within the source, e.g. the webhook endpoint.
  #[serde(default)]
  pub subject: String,
  /// Type of the event, e.g. `webhook` or `calendar`.
  #[serde(rename = "type", default)]
  pub event_type: String,
  #[serde(default = "default_spec_version")]
  pub spec_version: String,
  #[serde(default = "default_content_type")]
  pub data_content_type: String,
  /// Receipt time.
  pub time: DateTime<Utc>,
}

fn default_spec_version() -> String {
  "1.0".to_string()
}

fn default_content_type() -> String {
  "application/json".to_string()
}

impl EventContext {
  /// Context for an event received now from `source`.
  pub fn new(source: impl Into<String>) -> Self {
    Self {
      id: uuid::Uuid::new_v4().to_string(),
      source: source.into(),
      subject: String::new(),
      event_type: String::new(),
      spec_version: default_spec_version(),
      data_content_type: default_content_type(),
      time: Utc::now(),
    }
  }
}

/// A single event: context plus opaque payload bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
  pub context: EventContext,
  #[serde(with = "data_bytes")]
  pub data: Vec<u8>,
}

impl Event {
  pub fn new(context: EventContext, data: impl Into<Vec<u8>>) -> Self {
    Self {
      context,
      data: data.into(),
    }
  }

  /// Event whose payload is the given JSON document.
  pub fn json(source: impl Into<String>, data: &serde_json::Value) -> Self {
    Self::new(EventContext::new(source), data.to_string())
  }

  /// The payload parsed as a JSON document, if it is one.
  pub fn document(&self) -> Option<serde_json::Value> {
    serde_json::from_slice(&self.data).ok()
  }

  /// The payload as a value: the JSON document when it parses, the text
  /// otherwise.
  pub fn data_value(&self) -> serde_json::Value {
    self
      .document()
      .unwrap_or_else(|| serde_json::Value::String(String::from_utf8_lossy(&self.data).into_owned()))
  }

  /// The context as a JSON document.
  pub fn context_document(&self) -> serde_json::Value {
    serde_json::to_value(&self.context).unwrap_or(serde_json::Value::Null)
  }
}

/// Event data is carried inline as JSON when it parses, as a string
/// otherwise. Read back, every value keeps its JSON encoding, so string data
/// stays a string.
mod data_bytes {
  use serde::{Deserialize, Deserializer, Serialize, Serializer};

  pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    match serde_json::from_slice::<serde_json::Value>(data) {
      Ok(value) => value.serialize(serializer),
      Err(_) => String::from_utf8_lossy(data).serialize(serializer),
    }
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    serde_json::to_vec(&value).map_err(serde::de::Error::custom)
  }
}
