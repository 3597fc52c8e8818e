use async_trait::async_trait;
use relay_config::{TriggerDef, TriggerKind, TriggerTemplate};
use relay_event::EventSet;
use relay_policy::{Response, ResponseStatus};
use serde_json::{Value, json};
use tracing::info;

use crate::context::DispatchContext;
use crate::error::TriggerError;
use crate::trigger::{Trigger, decode_template};

/// Writes the event set to the log. Has no external side effects.
pub struct LogTrigger {
  def: TriggerDef,
}

impl LogTrigger {
  pub fn new(def: TriggerDef) -> Self {
    Self { def }
  }
}

#[async_trait]
impl Trigger for LogTrigger {
  fn definition(&self) -> &TriggerDef {
    &self.def
  }

  async fn execute(
    &self,
    ctx: &DispatchContext,
    events: &EventSet,
    resource: &Value,
  ) -> Result<Response, TriggerError> {
    if ctx.is_cancelled() {
      return Err(TriggerError::Cancelled);
    }
    let template = decode_template(TriggerKind::Log, resource, |t| match t {
      TriggerTemplate::Log(template) => Some(template),
      _ => None,
    })?;
    let message = template.message.as_deref().unwrap_or("trigger fired");

    for (name, event) in events.iter() {
      info!(
        trigger = %self.def.name,
        dependency = name,
        event_id = %event.context.id,
        source = %event.context.source,
        data = %event.data_value(),
        "{}",
        message
      );
    }

    let names: Vec<&str> = events.names().collect();
    Ok(Response::new(
      TriggerKind::Log,
      ResponseStatus::None,
      json!({ "message": message, "events": names }),
    ))
  }
}
