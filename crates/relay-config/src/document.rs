//! Parsing definition documents from JSON or YAML text.

use std::path::Path;

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors that can occur while parsing a definition document.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("invalid json document: {0}")]
  Json(#[from] serde_json::Error),

  #[error("invalid yaml document: {0}")]
  Yaml(#[from] serde_yaml::Error),
}

/// Serialization format of a definition document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
  Json,
  Yaml,
}

impl Format {
  /// Pick the format from a file extension. Anything that is not
  /// `.yaml`/`.yml` is read as JSON.
  pub fn from_path(path: &Path) -> Self {
    match path.extension().and_then(|e| e.to_str()) {
      Some("yaml") | Some("yml") => Format::Yaml,
      _ => Format::Json,
    }
  }
}

/// Parse a document in the given format.
pub fn parse_document<T: DeserializeOwned>(content: &str, format: Format) -> Result<T, ConfigError> {
  match format {
    Format::Json => Ok(serde_json::from_str(content)?),
    Format::Yaml => Ok(serde_yaml::from_str(content)?),
  }
}
