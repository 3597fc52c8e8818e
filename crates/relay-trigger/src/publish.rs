use std::sync::Arc;

use async_trait::async_trait;
use relay_config::{TriggerDef, TriggerKind, TriggerTemplate};
use relay_event::EventSet;
use relay_policy::{Response, ResponseStatus};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, instrument};

use crate::context::DispatchContext;
use crate::error::TriggerError;
use crate::trigger::{Trigger, decode_template, required_payload};

/// A message bound for a topic on the messaging backbone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
  pub topic: String,
  pub key: Option<String>,
  pub payload: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum PublishError {
  #[error("publisher is closed")]
  Closed,

  #[error("publish rejected: {message}")]
  Rejected { message: String },
}

/// Delivers messages to the messaging backbone.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
  async fn publish(&self, message: Message) -> Result<(), PublishError>;
}

/// A publisher that sends messages to an unbounded channel.
///
/// Use this to hand messages to an in-process consumer.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
  sender: mpsc::UnboundedSender<Message>,
}

impl ChannelPublisher {
  pub fn new() -> (Self, mpsc::UnboundedReceiver<Message>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self { sender }, receiver)
  }
}

#[async_trait]
impl MessagePublisher for ChannelPublisher {
  async fn publish(&self, message: Message) -> Result<(), PublishError> {
    self.sender.send(message).map_err(|_| PublishError::Closed)
  }
}

/// Publishes the constructed payload to a topic.
pub struct PublishTrigger {
  def: TriggerDef,
  publisher: Arc<dyn MessagePublisher>,
}

impl PublishTrigger {
  pub fn new(def: TriggerDef, publisher: Arc<dyn MessagePublisher>) -> Self {
    Self { def, publisher }
  }
}

#[async_trait]
impl Trigger for PublishTrigger {
  fn definition(&self) -> &TriggerDef {
    &self.def
  }

  #[instrument(name = "publish_execute", skip_all, fields(trigger = %self.def.name))]
  async fn execute(
    &self,
    ctx: &DispatchContext,
    events: &EventSet,
    resource: &Value,
  ) -> Result<Response, TriggerError> {
    let template = decode_template(TriggerKind::Publish, resource, |t| match t {
      TriggerTemplate::Publish(template) => Some(template),
      _ => None,
    })?;
    let payload = required_payload(&self.def, events)?;
    let size = payload.len();

    debug!(topic = %template.topic, bytes = size, "publishing message");
    let message = Message {
      topic: template.topic.clone(),
      key: template.key.clone(),
      payload,
    };
    ctx
      .run(async {
        self
          .publisher
          .publish(message)
          .await
          .map_err(|e| TriggerError::execution(&self.def.name, e))
      })
      .await?;

    Ok(Response::new(
      TriggerKind::Publish,
      ResponseStatus::None,
      json!({ "topic": template.topic, "bytes": size }),
    ))
  }
}
