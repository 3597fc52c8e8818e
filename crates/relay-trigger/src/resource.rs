use std::sync::Arc;

use async_trait::async_trait;
use kube::api::{
  Api, DeleteParams, DynamicObject, GroupVersionKind, Patch, PatchParams, PostParams,
};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::discovery::{self, Scope};
use kube::{Client, Config};
use relay_config::{
  DispatchConfig, ResourceOperation, ResourceTemplate, TriggerDef, TriggerKind, TriggerTemplate,
};
use relay_event::EventSet;
use relay_policy::{Response, ResponseStatus};
use serde_json::Value;
use tracing::{info, instrument};

use crate::cache::ClientCache;
use crate::context::DispatchContext;
use crate::credentials::credential_path;
use crate::error::TriggerError;
use crate::trigger::{Trigger, decode_template};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Creates, updates, patches or deletes a cluster object described by the
/// resolved manifest.
pub struct ResourceTrigger {
  def: TriggerDef,
  config: Arc<DispatchConfig>,
  clients: ClientCache<Client>,
}

impl ResourceTrigger {
  pub fn new(def: TriggerDef, config: Arc<DispatchConfig>, clients: ClientCache<Client>) -> Self {
    Self {
      def,
      config,
      clients,
    }
  }

  async fn apply(
    &self,
    client: Client,
    operation: ResourceOperation,
    mut object: DynamicObject,
  ) -> Result<Value, TriggerError> {
    let trigger = self.def.name.as_str();
    let types = object
      .types
      .as_ref()
      .ok_or_else(|| invalid("manifest has no apiVersion/kind"))?;
    let gvk = GroupVersionKind::try_from(types).map_err(invalid)?;

    let (resource, caps) = discovery::pinned_kind(&client, &gvk)
      .await
      .map_err(|e| TriggerError::execution(trigger, e))?;
    let api: Api<DynamicObject> = match (&caps.scope, object.metadata.namespace.as_deref()) {
      (Scope::Cluster, _) => Api::all_with(client, &resource),
      (Scope::Namespaced, Some(ns)) => Api::namespaced_with(client, ns, &resource),
      (Scope::Namespaced, None) => Api::default_namespaced_with(client, &resource),
    };

    let name = object.metadata.name.clone();
    let require_name = || name.clone().ok_or_else(|| invalid("manifest has no metadata.name"));
    let to_value = |obj: &DynamicObject| {
      serde_json::to_value(obj).map_err(|e| TriggerError::execution(trigger, e))
    };

    match operation {
      ResourceOperation::Create => {
        let created = api
          .create(&PostParams::default(), &object)
          .await
          .map_err(|e| TriggerError::execution(trigger, e))?;
        info!(trigger, kind = %gvk.kind, name = ?created.metadata.name, "created resource");
        to_value(&created)
      }
      ResourceOperation::Update => {
        let name = require_name()?;
        let current = api
          .get(&name)
          .await
          .map_err(|e| TriggerError::execution(trigger, e))?;
        object.metadata.resource_version = current.metadata.resource_version;
        let updated = api
          .replace(&name, &PostParams::default(), &object)
          .await
          .map_err(|e| TriggerError::execution(trigger, e))?;
        info!(trigger, kind = %gvk.kind, %name, "updated resource");
        to_value(&updated)
      }
      ResourceOperation::Patch => {
        let name = require_name()?;
        let patched = api
          .patch(&name, &PatchParams::default(), &Patch::Merge(&object))
          .await
          .map_err(|e| TriggerError::execution(trigger, e))?;
        info!(trigger, kind = %gvk.kind, %name, "patched resource");
        to_value(&patched)
      }
      ResourceOperation::Delete => {
        let name = require_name()?;
        let deleted = api
          .delete(&name, &DeleteParams::default())
          .await
          .map_err(|e| TriggerError::execution(trigger, e))?;
        info!(trigger, kind = %gvk.kind, %name, "deleted resource");
        deleted
          .either(serde_json::to_value, serde_json::to_value)
          .map_err(|e| TriggerError::execution(trigger, e))
      }
    }
  }
}

/// Build a client from the template's kubeconfig, or from the default
/// (in-cluster or `KUBECONFIG`) configuration.
async fn connect(template: &ResourceTemplate, config: &DispatchConfig) -> Result<Client, BoxError> {
  let Some(source) = &template.kubeconfig else {
    return Ok(Client::try_default().await?);
  };
  let path = credential_path(source, &config.secrets_root).await?;
  let kubeconfig = Kubeconfig::read_from(&path)?;
  let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
  Ok(Client::try_from(config)?)
}

fn invalid(message: impl ToString) -> TriggerError {
  TriggerError::InvalidResourceType {
    expected: TriggerKind::Resource,
    message: message.to_string(),
  }
}

#[async_trait]
impl Trigger for ResourceTrigger {
  fn definition(&self) -> &TriggerDef {
    &self.def
  }

  #[instrument(name = "resource_execute", skip_all, fields(trigger = %self.def.name))]
  async fn execute(
    &self,
    ctx: &DispatchContext,
    _events: &EventSet,
    resource: &Value,
  ) -> Result<Response, TriggerError> {
    let template = decode_template(TriggerKind::Resource, resource, |t| match t {
      TriggerTemplate::Resource(template) => Some(template),
      _ => None,
    })?;
    let object: DynamicObject = serde_json::from_value(template.source.clone()).map_err(invalid)?;

    let body = ctx
      .run(async {
        let client = self
          .clients
          .get_or_create(&self.def.name, || connect(&template, &self.config))
          .await
          .map_err(|e| TriggerError::authentication(&self.def.name, e))?;
        self
          .apply(Client::clone(&client), template.operation, object)
          .await
      })
      .await?;
    Ok(Response::new(TriggerKind::Resource, ResponseStatus::None, body))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_manifest_decodes_as_dynamic_object() {
    let object: DynamicObject = serde_json::from_value(json!({
      "apiVersion": "argoproj.io/v1alpha1",
      "kind": "Workflow",
      "metadata": { "generateName": "hello-", "namespace": "argo" },
      "spec": { "entrypoint": "main" }
    }))
    .unwrap();

    let types = object.types.as_ref().unwrap();
    let gvk = GroupVersionKind::try_from(types).unwrap();
    assert_eq!(gvk.group, "argoproj.io");
    assert_eq!(gvk.version, "v1alpha1");
    assert_eq!(gvk.kind, "Workflow");
    assert_eq!(object.metadata.namespace.as_deref(), Some("argo"));
    assert_eq!(object.data["spec"]["entrypoint"], "main");
  }

  #[tokio::test]
  async fn test_missing_kubeconfig_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let template = ResourceTemplate {
      operation: ResourceOperation::Create,
      source: json!({}),
      kubeconfig: Some(relay_config::CredentialSource::Path {
        path: dir.path().join("missing-kubeconfig"),
      }),
    };
    let config = DispatchConfig::default();
    let err = connect(&template, &config).await.err().unwrap();
    assert!(err.to_string().contains("does not exist"));
  }
}
