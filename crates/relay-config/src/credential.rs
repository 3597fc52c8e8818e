use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Where credential material for an action target comes from.
///
/// ```json
/// { "path": "/etc/relay/sa.json" }
/// { "secret": { "name": "gcp-creds", "key": "token" } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CredentialSource {
  /// A file on the local filesystem.
  Path { path: PathBuf },
  /// A key of a secret mounted as a volume under the secrets root.
  Secret { secret: SecretSelector },
}

/// Selects one key of a mounted secret volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretSelector {
  pub name: String,
  pub key: String,
}

impl CredentialSource {
  /// Resolve the file path holding the credential.
  ///
  /// Secret selectors map to `{secrets_root}/{name}/{key}`.
  pub fn resolve(&self, secrets_root: &Path) -> PathBuf {
    match self {
      CredentialSource::Path { path } => path.clone(),
      CredentialSource::Secret { secret } => secrets_root.join(&secret.name).join(&secret.key),
    }
  }
}
