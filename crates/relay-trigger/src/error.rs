use std::path::PathBuf;

use relay_config::TriggerKind;
use relay_params::ParamError;
use relay_policy::{Classify, ErrorClass};
use thiserror::Error;

/// Errors raised while running a trigger's stages.
#[derive(Debug, Error)]
pub enum TriggerError {
  /// A parameter or payload binding failed.
  #[error(transparent)]
  Parameters(#[from] ParamError),

  /// The action needs a payload but the definition declares none.
  #[error("payload parameters are not specified for trigger '{trigger}'")]
  PayloadNotSpecified { trigger: String },

  /// The client for the trigger could not be constructed.
  #[error("failed to create client for trigger '{trigger}': {source}")]
  Authentication {
    trigger: String,
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  /// The action was attempted and failed.
  #[error("trigger '{trigger}' failed: {message}")]
  Execution { trigger: String, message: String },

  /// The resolved resource does not fit the trigger's kind.
  #[error("invalid {expected} resource: {message}")]
  InvalidResourceType {
    expected: TriggerKind,
    message: String,
  },

  /// The definition cannot be run in this process.
  #[error("trigger '{trigger}' is misconfigured: {message}")]
  Configuration { trigger: String, message: String },

  /// The dispatch was cancelled before the action completed.
  #[error("dispatch cancelled")]
  Cancelled,

  /// The action did not complete within its deadline.
  #[error("trigger timed out after {timeout_ms}ms")]
  Timeout { timeout_ms: u64 },
}

impl TriggerError {
  pub(crate) fn execution(trigger: &str, message: impl ToString) -> Self {
    TriggerError::Execution {
      trigger: trigger.to_string(),
      message: message.to_string(),
    }
  }

  pub(crate) fn authentication(
    trigger: &str,
    source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
  ) -> Self {
    TriggerError::Authentication {
      trigger: trigger.to_string(),
      source: source.into(),
    }
  }
}

impl Classify for TriggerError {
  fn class(&self) -> ErrorClass {
    match self {
      TriggerError::Timeout { .. } => ErrorClass::Timeout,
      TriggerError::Execution { .. } => ErrorClass::Transient,
      _ => ErrorClass::Permanent,
    }
  }
}

/// Errors loading credential material.
#[derive(Debug, Error)]
pub enum CredentialError {
  #[error("credentials file '{}' does not exist", path.display())]
  NotFound { path: PathBuf },

  #[error("failed to read credentials file '{}': {source}", path.display())]
  Io {
    path: PathBuf,
    source: std::io::Error,
  },

  #[error("invalid credentials in '{}': {message}", path.display())]
  Invalid { path: PathBuf, message: String },
}
