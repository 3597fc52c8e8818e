use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::credential::CredentialSource;
use crate::parameter::ParameterDef;
use crate::policy::PolicyDef;

/// A named trigger: one action, its bindings, and its outcome policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerDef {
  pub name: String,
  pub template: TriggerTemplate,
  /// Bindings applied to the action template, in order.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub parameters: Vec<ParameterDef>,
  /// Bindings that build the request payload from scratch.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub payload: Option<Vec<ParameterDef>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub policy: Option<PolicyDef>,
  /// Deadline for a single execution.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<u64>,
}

impl TriggerDef {
  pub fn new(name: impl Into<String>, template: TriggerTemplate) -> Self {
    Self {
      name: name.into(),
      template,
      parameters: Vec::new(),
      payload: None,
      policy: None,
      timeout_ms: None,
    }
  }

  pub fn kind(&self) -> TriggerKind {
    self.template.kind()
  }
}

/// The action kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
  Function,
  Http,
  Publish,
  Resource,
  Log,
}

impl TriggerKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      TriggerKind::Function => "function",
      TriggerKind::Http => "http",
      TriggerKind::Publish => "publish",
      TriggerKind::Resource => "resource",
      TriggerKind::Log => "log",
    }
  }
}

impl fmt::Display for TriggerKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Action-specific static template, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerTemplate {
  /// Invoke a remote cloud function.
  Function(FunctionTemplate),
  /// Call an HTTP endpoint.
  Http(HttpTemplate),
  /// Publish a message to a topic.
  Publish(PublishTemplate),
  /// Mutate a cluster resource.
  Resource(ResourceTemplate),
  /// Log the events.
  Log(LogTemplate),
}

impl TriggerTemplate {
  pub fn kind(&self) -> TriggerKind {
    match self {
      TriggerTemplate::Function(_) => TriggerKind::Function,
      TriggerTemplate::Http(_) => TriggerKind::Http,
      TriggerTemplate::Publish(_) => TriggerKind::Publish,
      TriggerTemplate::Resource(_) => TriggerKind::Resource,
      TriggerTemplate::Log(_) => TriggerKind::Log,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionTemplate {
  /// Fully qualified name, e.g. `projects/p/locations/l/functions/f`.
  pub function_name: String,
  pub credentials: CredentialSource,
  /// Overrides the API base URL from the dispatch config.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub endpoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpTemplate {
  pub url: String,
  #[serde(default = "default_http_method")]
  pub method: String,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub headers: BTreeMap<String, String>,
  /// Bearer token file.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub token: Option<CredentialSource>,
}

fn default_http_method() -> String {
  "POST".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishTemplate {
  pub topic: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub key: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceOperation {
  #[default]
  Create,
  Update,
  Patch,
  Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceTemplate {
  #[serde(default)]
  pub operation: ResourceOperation,
  /// The object manifest (`apiVersion`, `kind`, `metadata`, ...).
  pub source: serde_json::Value,
  /// Kubeconfig file; the in-cluster/default config is used when unset.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub kubeconfig: Option<CredentialSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogTemplate {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
}
