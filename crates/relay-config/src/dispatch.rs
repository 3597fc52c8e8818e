use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Process-level settings for the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
  /// Directory where secret volumes are mounted.
  pub secrets_root: PathBuf,
  /// Deadline applied to `execute` when a trigger declares none.
  pub default_timeout_ms: u64,
  /// Base URL of the cloud functions API.
  pub function_endpoint: String,
}

impl DispatchConfig {
  pub fn default_timeout(&self) -> Duration {
    Duration::from_millis(self.default_timeout_ms)
  }
}

impl Default for DispatchConfig {
  fn default() -> Self {
    Self {
      secrets_root: PathBuf::from("/var/run/relay/secrets"),
      default_timeout_ms: 30_000,
      function_endpoint: "https://cloudfunctions.googleapis.com".to_string(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_partial_config_uses_defaults() {
    let config: DispatchConfig = serde_json::from_str(r#"{ "default_timeout_ms": 500 }"#).unwrap();
    assert_eq!(config.default_timeout(), Duration::from_millis(500));
    assert_eq!(config.secrets_root, PathBuf::from("/var/run/relay/secrets"));
  }
}
