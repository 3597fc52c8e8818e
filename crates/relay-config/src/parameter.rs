//! Parameter bindings.
//!
//! A binding pulls one value out of an event and writes it into a document
//! at a destination path:
//!
//! ```json
//! {
//!   "src": { "dependency_name": "order-event", "data_key": "$.amount", "value": 0 },
//!   "dest": "$.amount",
//!   "operation": "overwrite"
//! }
//! ```

use serde::{Deserialize, Serialize};

/// How a resolved value is merged into the destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
  /// Replace whatever is at the destination.
  #[default]
  Overwrite,
  /// Insert at the front of an array, or before a string.
  Prepend,
  /// Insert at the back of an array, or after a string.
  Append,
}

/// A single parameter binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
  pub src: ParameterSource,
  pub dest: String,
  #[serde(default)]
  pub operation: Operation,
}

impl ParameterDef {
  pub fn new(src: ParameterSource, dest: impl Into<String>) -> Self {
    Self {
      src,
      dest: dest.into(),
      operation: Operation::Overwrite,
    }
  }

  pub fn with_operation(mut self, operation: Operation) -> Self {
    self.operation = operation;
    self
  }
}

/// Where the value of a binding comes from.
///
/// When several selectors are set the most specific wins, in this order:
/// `context_template`, `context_key`, `data_template`, `data_key`. With none
/// of them set the whole event data is used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSource {
  /// Name of the event in the event set.
  pub dependency_name: String,
  /// Path into the event data document.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data_key: Option<String>,
  /// minijinja template rendered against `Input` (data) and `Context`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data_template: Option<String>,
  /// Path into the event context.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub context_key: Option<String>,
  /// minijinja template rendered against `Context`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub context_template: Option<String>,
  /// Default used when the event is absent or the selector does not resolve.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub value: Option<serde_json::Value>,
}

impl ParameterSource {
  /// Source reading the whole data of an event.
  pub fn event(dependency_name: impl Into<String>) -> Self {
    Self {
      dependency_name: dependency_name.into(),
      ..Default::default()
    }
  }

  /// Source reading a path of an event's data.
  pub fn data_key(dependency_name: impl Into<String>, key: impl Into<String>) -> Self {
    Self {
      data_key: Some(key.into()),
      ..Self::event(dependency_name)
    }
  }

  pub fn with_default(mut self, value: serde_json::Value) -> Self {
    self.value = Some(value);
    self
  }
}
