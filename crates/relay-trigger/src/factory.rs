use std::sync::Arc;

use relay_config::{DispatchConfig, TriggerDef, TriggerKind};

use crate::cache::ClientCache;
use crate::error::TriggerError;
use crate::function::{FunctionClient, FunctionTrigger};
use crate::http::{HttpClient, HttpTrigger};
use crate::log::LogTrigger;
use crate::publish::{MessagePublisher, PublishTrigger};
use crate::resource::ResourceTrigger;
use crate::trigger::Trigger;

/// Builds triggers from definitions.
///
/// Holds the process-wide client caches, so every trigger built by the same
/// factory shares clients by trigger name.
#[derive(Clone)]
pub struct TriggerFactory {
  config: Arc<DispatchConfig>,
  http: reqwest::Client,
  functions: ClientCache<FunctionClient>,
  endpoints: ClientCache<HttpClient>,
  clusters: ClientCache<kube::Client>,
  publisher: Option<Arc<dyn MessagePublisher>>,
}

impl TriggerFactory {
  pub fn new(config: DispatchConfig) -> Self {
    Self {
      config: Arc::new(config),
      http: reqwest::Client::new(),
      functions: ClientCache::new(),
      endpoints: ClientCache::new(),
      clusters: ClientCache::new(),
      publisher: None,
    }
  }

  /// Set the publisher used by `publish` triggers.
  pub fn with_publisher(mut self, publisher: Arc<dyn MessagePublisher>) -> Self {
    self.publisher = Some(publisher);
    self
  }

  pub fn config(&self) -> &DispatchConfig {
    &self.config
  }

  /// Build the variant for the definition's action kind.
  pub fn build(&self, def: TriggerDef) -> Result<Arc<dyn Trigger>, TriggerError> {
    let trigger: Arc<dyn Trigger> = match def.kind() {
      TriggerKind::Function => Arc::new(FunctionTrigger::new(
        def,
        self.config.clone(),
        self.http.clone(),
        self.functions.clone(),
      )),
      TriggerKind::Http => Arc::new(HttpTrigger::new(
        def,
        self.config.clone(),
        self.http.clone(),
        self.endpoints.clone(),
      )),
      TriggerKind::Publish => {
        let publisher = self
          .publisher
          .clone()
          .ok_or_else(|| TriggerError::Configuration {
            trigger: def.name.clone(),
            message: "no message publisher is configured".to_string(),
          })?;
        Arc::new(PublishTrigger::new(def, publisher))
      }
      TriggerKind::Resource => Arc::new(ResourceTrigger::new(
        def,
        self.config.clone(),
        self.clusters.clone(),
      )),
      TriggerKind::Log => Arc::new(LogTrigger::new(def)),
    };
    Ok(trigger)
  }
}

/// Build the trigger variant for `def`.
pub fn build_trigger(def: TriggerDef, factory: &TriggerFactory) -> Result<Arc<dyn Trigger>, TriggerError> {
  factory.build(def)
}
