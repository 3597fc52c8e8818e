use async_trait::async_trait;
use relay_config::{TriggerDef, TriggerKind, TriggerTemplate};
use relay_event::EventSet;
use relay_params::{ParamError, apply_params, construct_payload};
use relay_policy::{Outcome, PolicyEvaluator, Response};
use serde_json::Value;

use crate::context::DispatchContext;
use crate::error::TriggerError;

/// One action kind's implementation of the four dispatch stages.
///
/// The stages run strictly in order: [`fetch_resource`](Trigger::fetch_resource),
/// [`apply_resource_parameters`](Trigger::apply_resource_parameters),
/// [`execute`](Trigger::execute), [`apply_policy`](Trigger::apply_policy).
/// Only `execute` performs I/O.
#[async_trait]
pub trait Trigger: Send + Sync {
  /// The definition this trigger was built from.
  fn definition(&self) -> &TriggerDef;

  fn name(&self) -> &str {
    &self.definition().name
  }

  fn kind(&self) -> TriggerKind {
    self.definition().kind()
  }

  /// The static resource template, as a JSON document tagged with `kind`.
  fn fetch_resource(&self) -> Result<Value, TriggerError> {
    serde_json::to_value(&self.definition().template)
      .map_err(|e| TriggerError::Parameters(ParamError::from(e)))
  }

  /// Apply the definition's parameter bindings to the resource.
  ///
  /// Returns the resource unchanged when there are no bindings.
  fn apply_resource_parameters(
    &self,
    events: &EventSet,
    resource: Value,
  ) -> Result<Value, TriggerError> {
    let params = &self.definition().parameters;
    if params.is_empty() {
      return Ok(resource);
    }
    let template = serde_json::to_vec(&resource).map_err(ParamError::from)?;
    let resolved = apply_params(&template, params, events)?;
    Ok(serde_json::from_slice(&resolved).map_err(ParamError::from)?)
  }

  /// Perform the action.
  async fn execute(
    &self,
    ctx: &DispatchContext,
    events: &EventSet,
    resource: &Value,
  ) -> Result<Response, TriggerError>;

  /// Classify the execution result with the definition's policy.
  fn apply_policy(&self, result: Result<&Response, &TriggerError>) -> Outcome {
    PolicyEvaluator::new(self.definition().policy.as_ref()).evaluate(result)
  }
}

/// Decode a resolved resource back into the variant's typed template.
///
/// `extract` picks the variant out of the decoded template; any other
/// variant is an [`TriggerError::InvalidResourceType`].
pub(crate) fn decode_template<T>(
  expected: TriggerKind,
  resource: &Value,
  extract: impl FnOnce(TriggerTemplate) -> Option<T>,
) -> Result<T, TriggerError> {
  let template: TriggerTemplate =
    serde_json::from_value(resource.clone()).map_err(|e| TriggerError::InvalidResourceType {
      expected,
      message: e.to_string(),
    })?;
  let found = template.kind();
  extract(template).ok_or_else(|| TriggerError::InvalidResourceType {
    expected,
    message: format!("found a {} template", found),
  })
}

/// Build the payload, if the definition declares one.
pub(crate) fn payload(def: &TriggerDef, events: &EventSet) -> Result<Option<Vec<u8>>, TriggerError> {
  match &def.payload {
    Some(params) => Ok(Some(construct_payload(params, events)?)),
    None => Ok(None),
  }
}

/// Build the payload for kinds that cannot act without one.
pub(crate) fn required_payload(def: &TriggerDef, events: &EventSet) -> Result<Vec<u8>, TriggerError> {
  payload(def, events)?.ok_or_else(|| TriggerError::PayloadNotSpecified {
    trigger: def.name.clone(),
  })
}
