use thiserror::Error;

use crate::path::PathError;

/// Errors that can occur while resolving parameter bindings.
#[derive(Debug, Error)]
pub enum ParamError {
  /// The binding's event is not in the event set and there is no default.
  #[error("event '{name}' not found in event set and no default value is set")]
  MissingEvent { name: String },

  /// The selector did not resolve against the event and there is no default.
  #[error("'{selector}' did not resolve against event '{event}' and no default value is set")]
  PathResolution { event: String, selector: String },

  /// A path expression is malformed or cannot be walked.
  #[error(transparent)]
  Path(#[from] PathError),

  /// Prepend/append applied to something that is not an array or string.
  #[error("cannot {operation} at '{dest}': destination holds {found}")]
  InvalidDestination {
    dest: String,
    operation: &'static str,
    found: &'static str,
  },

  /// A data or context template failed to render.
  #[error("failed to render template for event '{event}': {message}")]
  Template { event: String, message: String },

  /// The template or payload is not a valid JSON document.
  #[error("invalid document: {0}")]
  Serialization(#[from] serde_json::Error),
}
