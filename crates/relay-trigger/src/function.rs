use std::sync::Arc;

use async_trait::async_trait;
use relay_config::{DispatchConfig, FunctionTemplate, TriggerDef, TriggerKind, TriggerTemplate};
use relay_event::EventSet;
use relay_policy::{Response, ResponseStatus};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::cache::ClientCache;
use crate::context::DispatchContext;
use crate::credentials::load_token;
use crate::error::{CredentialError, TriggerError};
use crate::trigger::{Trigger, decode_template, required_payload};

/// Authenticated client for the cloud functions API.
#[derive(Debug)]
pub struct FunctionClient {
  http: reqwest::Client,
  endpoint: String,
  token: String,
}

impl FunctionClient {
  pub fn new(http: reqwest::Client, endpoint: impl Into<String>, token: impl Into<String>) -> Self {
    Self {
      http,
      endpoint: endpoint.into(),
      token: token.into(),
    }
  }

  /// Load credentials for `template` and build a client.
  pub async fn connect(
    http: reqwest::Client,
    template: &FunctionTemplate,
    config: &DispatchConfig,
  ) -> Result<Self, CredentialError> {
    let token = load_token(&template.credentials, &config.secrets_root).await?;
    let endpoint = template
      .endpoint
      .clone()
      .unwrap_or_else(|| config.function_endpoint.clone());
    Ok(Self::new(http, endpoint, token))
  }

  /// Synchronously call `function_name` with `payload` as its data.
  pub async fn call(
    &self,
    trigger: &str,
    function_name: &str,
    payload: &[u8],
  ) -> Result<Response, TriggerError> {
    let url = format!(
      "{}/v1/{}:call",
      self.endpoint.trim_end_matches('/'),
      function_name
    );
    let data = String::from_utf8_lossy(payload).into_owned();

    let response = self
      .http
      .post(&url)
      .bearer_auth(&self.token)
      .json(&json!({ "data": data }))
      .send()
      .await
      .map_err(|e| TriggerError::execution(trigger, e))?;

    let status = response.status();
    let text = response
      .text()
      .await
      .map_err(|e| TriggerError::execution(trigger, e))?;
    if !status.is_success() {
      return Err(TriggerError::execution(
        trigger,
        format!("function call returned {}: {}", status, text),
      ));
    }

    let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
    let code = match body.get("error") {
      Some(err) if !err.is_null() => "ERROR",
      _ => "OK",
    };
    Ok(Response::new(
      TriggerKind::Function,
      ResponseStatus::Code(code.to_string()),
      body,
    ))
  }
}

/// Invokes a remote cloud function with the constructed payload.
pub struct FunctionTrigger {
  def: TriggerDef,
  config: Arc<DispatchConfig>,
  http: reqwest::Client,
  clients: ClientCache<FunctionClient>,
}

impl FunctionTrigger {
  pub fn new(
    def: TriggerDef,
    config: Arc<DispatchConfig>,
    http: reqwest::Client,
    clients: ClientCache<FunctionClient>,
  ) -> Self {
    Self {
      def,
      config,
      http,
      clients,
    }
  }
}

#[async_trait]
impl Trigger for FunctionTrigger {
  fn definition(&self) -> &TriggerDef {
    &self.def
  }

  #[instrument(name = "function_execute", skip_all, fields(trigger = %self.def.name))]
  async fn execute(
    &self,
    ctx: &DispatchContext,
    events: &EventSet,
    resource: &Value,
  ) -> Result<Response, TriggerError> {
    let template = decode_template(TriggerKind::Function, resource, |t| match t {
      TriggerTemplate::Function(template) => Some(template),
      _ => None,
    })?;
    let payload = required_payload(&self.def, events)?;

    // Credential loading and the call both run under the deadline.
    ctx
      .run(async {
        let client = self
          .clients
          .get_or_create(&self.def.name, || {
            FunctionClient::connect(self.http.clone(), &template, &self.config)
          })
          .await
          .map_err(|e| TriggerError::authentication(&self.def.name, e))?;

        debug!(function = %template.function_name, bytes = payload.len(), "calling function");
        client
          .call(&self.def.name, &template.function_name, &payload)
          .await
      })
      .await
  }
}
