use std::fmt;

use relay_config::TriggerKind;
use serde::{Deserialize, Serialize};

/// Raw result of performing an action.
///
/// Only the policy evaluator looks inside; the dispatcher passes it along.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
  pub kind: TriggerKind,
  pub status: ResponseStatus,
  #[serde(default)]
  pub body: serde_json::Value,
}

impl Response {
  pub fn new(kind: TriggerKind, status: ResponseStatus, body: serde_json::Value) -> Self {
    Self { kind, status, body }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
  /// HTTP status code.
  Http(u16),
  /// Textual result code, e.g. `OK`.
  Code(String),
  /// The action has no notion of status.
  None,
}

impl fmt::Display for ResponseStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ResponseStatus::Http(code) => write!(f, "{}", code),
      ResponseStatus::Code(code) => f.write_str(code),
      ResponseStatus::None => f.write_str("-"),
    }
  }
}
