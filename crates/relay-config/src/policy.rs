use serde::{Deserialize, Serialize};

/// Rules for classifying an execution outcome.
///
/// A trigger without a policy treats every returned response as a success
/// and every execution error as a failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyDef {
  /// Acceptable response status codes.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status: Option<StatusPolicy>,
  /// A field of the response body that must hold a given value.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub result: Option<FieldMatch>,
  /// Retry schedule used when an outcome is retryable.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub backoff: Option<BackoffDef>,
  /// Whether a deadline expiry may be retried.
  #[serde(default)]
  pub retry_on_timeout: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusPolicy {
  pub allow: Vec<StatusMatch>,
}

/// One acceptable status: numeric (`200`) or textual (`"OK"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusMatch {
  Code(u16),
  Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMatch {
  /// Path into the response body.
  pub path: String,
  /// Required value at that path.
  pub value: serde_json::Value,
}

/// Exponential backoff parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffDef {
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
  #[serde(default = "default_initial_interval_ms")]
  pub initial_interval_ms: u64,
  #[serde(default = "default_multiplier")]
  pub multiplier: f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_interval_ms: Option<u64>,
}

impl Default for BackoffDef {
  fn default() -> Self {
    Self {
      max_retries: default_max_retries(),
      initial_interval_ms: default_initial_interval_ms(),
      multiplier: default_multiplier(),
      max_interval_ms: None,
    }
  }
}

fn default_max_retries() -> u32 {
  3
}

fn default_initial_interval_ms() -> u64 {
  1_000
}

fn default_multiplier() -> f64 {
  2.0
}
