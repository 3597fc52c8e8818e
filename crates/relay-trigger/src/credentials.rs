use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use relay_config::CredentialSource;
use serde::Deserialize;
use tracing::debug;

use crate::error::CredentialError;

/// Resolve a credential source to an existing file.
///
/// Fails with [`CredentialError::NotFound`] before any client is built, so a
/// missing secret mount surfaces as an authentication error rather than as
/// a failed call.
pub async fn credential_path(
  source: &CredentialSource,
  secrets_root: &Path,
) -> Result<PathBuf, CredentialError> {
  let path = source.resolve(secrets_root);
  match tokio::fs::metadata(&path).await {
    Ok(_) => Ok(path),
    Err(e) if e.kind() == ErrorKind::NotFound => Err(CredentialError::NotFound { path }),
    Err(source) => Err(CredentialError::Io { path, source }),
  }
}

#[derive(Deserialize)]
struct TokenFile {
  #[serde(default, alias = "token")]
  access_token: Option<String>,
  #[serde(default, rename = "type")]
  kind: Option<String>,
}

/// Load a bearer token.
///
/// The file holds either the raw token or a JSON object with an
/// `access_token` (or `token`) field.
pub async fn load_token(
  source: &CredentialSource,
  secrets_root: &Path,
) -> Result<String, CredentialError> {
  let path = credential_path(source, secrets_root).await?;
  let content = tokio::fs::read_to_string(&path)
    .await
    .map_err(|source| CredentialError::Io {
      path: path.clone(),
      source,
    })?;

  let content = content.trim();
  if content.is_empty() {
    return Err(CredentialError::Invalid {
      path,
      message: "file is empty".to_string(),
    });
  }

  if !content.starts_with('{') {
    debug!(path = %path.display(), "loaded raw bearer token");
    return Ok(content.to_string());
  }

  let file: TokenFile = serde_json::from_str(content).map_err(|e| CredentialError::Invalid {
    path: path.clone(),
    message: e.to_string(),
  })?;
  match (file.access_token, file.kind.as_deref()) {
    (Some(token), _) if !token.trim().is_empty() => Ok(token.trim().to_string()),
    (_, Some("service_account")) => Err(CredentialError::Invalid {
      path,
      message: "service account keys are not supported; mount an access token instead".to_string(),
    }),
    _ => Err(CredentialError::Invalid {
      path,
      message: "no access_token field".to_string(),
    }),
  }
}
