use std::sync::Arc;

use async_trait::async_trait;
use relay_config::{DispatchConfig, HttpTemplate, TriggerDef, TriggerKind, TriggerTemplate};
use relay_event::EventSet;
use relay_policy::{Response, ResponseStatus};
use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::cache::ClientCache;
use crate::context::DispatchContext;
use crate::credentials::load_token;
use crate::error::{CredentialError, TriggerError};
use crate::trigger::{Trigger, decode_template, payload};

/// HTTP client with the trigger's bearer token, if any.
#[derive(Debug)]
pub struct HttpClient {
  http: reqwest::Client,
  token: Option<String>,
}

impl HttpClient {
  pub async fn connect(
    http: reqwest::Client,
    template: &HttpTemplate,
    config: &DispatchConfig,
  ) -> Result<Self, CredentialError> {
    let token = match &template.token {
      Some(source) => Some(load_token(source, &config.secrets_root).await?),
      None => None,
    };
    Ok(Self { http, token })
  }

  pub async fn send(
    &self,
    trigger: &str,
    template: &HttpTemplate,
    method: Method,
    body: Option<Vec<u8>>,
  ) -> Result<Response, TriggerError> {
    let mut request = self.http.request(method, &template.url);
    if let Some(token) = &self.token {
      request = request.bearer_auth(token);
    }
    for (key, value) in &template.headers {
      request = request.header(key, value);
    }
    if let Some(body) = body {
      let declared = template
        .headers
        .keys()
        .any(|k| k.eq_ignore_ascii_case(CONTENT_TYPE.as_str()));
      if !declared {
        request = request.header(CONTENT_TYPE, "application/json");
      }
      request = request.body(body);
    }

    let response = request
      .send()
      .await
      .map_err(|e| TriggerError::execution(trigger, e))?;
    let status = response.status().as_u16();
    let text = response
      .text()
      .await
      .map_err(|e| TriggerError::execution(trigger, e))?;

    // Try to parse body as JSON, fall back to string
    let body = if text.is_empty() {
      Value::Null
    } else {
      serde_json::from_str(&text).unwrap_or(Value::String(text))
    };
    Ok(Response::new(TriggerKind::Http, ResponseStatus::Http(status), body))
  }
}

/// Calls an HTTP endpoint with the constructed payload as the body.
///
/// Non-2xx statuses are returned as responses; the policy decides whether
/// they count as failures.
pub struct HttpTrigger {
  def: TriggerDef,
  config: Arc<DispatchConfig>,
  http: reqwest::Client,
  clients: ClientCache<HttpClient>,
}

impl HttpTrigger {
  pub fn new(
    def: TriggerDef,
    config: Arc<DispatchConfig>,
    http: reqwest::Client,
    clients: ClientCache<HttpClient>,
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
impl Trigger for HttpTrigger {
  fn definition(&self) -> &TriggerDef {
    &self.def
  }

  #[instrument(name = "http_execute", skip_all, fields(trigger = %self.def.name))]
  async fn execute(
    &self,
    ctx: &DispatchContext,
    events: &EventSet,
    resource: &Value,
  ) -> Result<Response, TriggerError> {
    let template = decode_template(TriggerKind::Http, resource, |t| match t {
      TriggerTemplate::Http(template) => Some(template),
      _ => None,
    })?;
    let method = parse_method(&self.def.name, &template.method)?;
    let body = payload(&self.def, events)?;

    ctx
      .run(async {
        let client = self
          .clients
          .get_or_create(&self.def.name, || {
            HttpClient::connect(self.http.clone(), &template, &self.config)
          })
          .await
          .map_err(|e| TriggerError::authentication(&self.def.name, e))?;

        debug!(%method, url = %template.url, "sending request");
        client.send(&self.def.name, &template, method, body).await
      })
      .await
  }
}

fn parse_method(trigger: &str, method: &str) -> Result<Method, TriggerError> {
  match method.to_uppercase().as_str() {
    "GET" => Ok(Method::GET),
    "POST" => Ok(Method::POST),
    "PUT" => Ok(Method::PUT),
    "DELETE" => Ok(Method::DELETE),
    "PATCH" => Ok(Method::PATCH),
    "HEAD" => Ok(Method::HEAD),
    "OPTIONS" => Ok(Method::OPTIONS),
    _ => Err(TriggerError::Configuration {
      trigger: trigger.to_string(),
      message: format!("unsupported HTTP method: {}", method),
    }),
  }
}
