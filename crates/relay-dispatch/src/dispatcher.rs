use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use relay_config::{TriggerDef, TriggerKind};
use relay_event::EventSet;
use relay_policy::{Outcome, PolicyEvaluator, Response};
use relay_trigger::{DispatchContext, Trigger, TriggerError, TriggerFactory};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::events::{DispatchEvent, DispatchNotifier, NoopNotifier};

/// The result of dispatching one trigger.
#[derive(Debug, Clone, Serialize)]
pub struct Dispatched {
  pub dispatch_id: String,
  pub trigger: String,
  pub kind: TriggerKind,
  pub outcome: Outcome,
  /// Number of executions attempted.
  pub attempts: u32,
  /// The last response, if the last attempt produced one.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub response: Option<Response>,
  /// The last error, if the last attempt failed.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

/// Runs triggers through their stages and retries them per policy.
pub struct Dispatcher {
  factory: TriggerFactory,
  notifier: Arc<dyn DispatchNotifier>,
}

impl Dispatcher {
  pub fn new(factory: TriggerFactory) -> Self {
    Self {
      factory,
      notifier: Arc::new(NoopNotifier),
    }
  }

  pub fn with_notifier(mut self, notifier: Arc<dyn DispatchNotifier>) -> Self {
    self.notifier = notifier;
    self
  }

  pub fn factory(&self) -> &TriggerFactory {
    &self.factory
  }

  /// Build the trigger for `def` and dispatch it.
  ///
  /// A definition that cannot be built yields a failed dispatch with zero
  /// attempts.
  pub async fn dispatch(
    &self,
    def: TriggerDef,
    events: Arc<EventSet>,
    cancel: CancellationToken,
  ) -> Dispatched {
    let name = def.name.clone();
    let kind = def.kind();
    match self.factory.build(def) {
      Ok(trigger) => self.dispatch_trigger(trigger, events, cancel).await,
      Err(e) => {
        let dispatch_id = uuid::Uuid::new_v4().to_string();
        error!(dispatch_id = %dispatch_id, trigger = %name, error = %e, "trigger_build_failed");
        self.notifier.notify(DispatchEvent::Failed {
          dispatch_id: dispatch_id.clone(),
          trigger: name.clone(),
          error: e.to_string(),
        });
        Dispatched {
          dispatch_id,
          trigger: name,
          kind,
          outcome: Outcome::Failure,
          attempts: 0,
          response: None,
          error: Some(e.to_string()),
        }
      }
    }
  }

  /// Dispatch every definition concurrently against the same event set.
  ///
  /// Each dispatch gets a child of `cancel`, and one trigger failing does
  /// not affect its siblings. Results are in definition order.
  pub async fn dispatch_all(
    &self,
    defs: Vec<TriggerDef>,
    events: Arc<EventSet>,
    cancel: &CancellationToken,
  ) -> Vec<Dispatched> {
    let dispatches = defs
      .into_iter()
      .map(|def| self.dispatch(def, events.clone(), cancel.child_token()));
    join_all(dispatches).await
  }

  /// Dispatch an already built trigger.
  #[instrument(
    name = "dispatch",
    skip(self, trigger, events, cancel),
    fields(
      trigger = %trigger.name(),
      kind = %trigger.kind(),
    )
  )]
  pub async fn dispatch_trigger(
    &self,
    trigger: Arc<dyn Trigger>,
    events: Arc<EventSet>,
    cancel: CancellationToken,
  ) -> Dispatched {
    let dispatch_id = uuid::Uuid::new_v4().to_string();
    let name = trigger.name().to_string();
    let def = trigger.definition();
    let backoff = PolicyEvaluator::new(def.policy.as_ref()).backoff();
    let timeout = def
      .timeout_ms
      .map(Duration::from_millis)
      .unwrap_or_else(|| self.factory.config().default_timeout());
    let ctx = DispatchContext::new(cancel.clone(), timeout);

    info!(
      dispatch_id = %dispatch_id,
      trigger = %name,
      events = events.len(),
      "dispatch_started"
    );

    let mut attempt: u32 = 0;
    loop {
      attempt += 1;
      self.notifier.notify(DispatchEvent::Started {
        dispatch_id: dispatch_id.clone(),
        trigger: name.clone(),
        attempt,
      });

      let result = run_stages(trigger.as_ref(), &ctx, &events).await;
      let outcome = trigger.apply_policy(result.as_ref());

      let delay = match (outcome, &backoff) {
        (Outcome::Retry, Some(backoff)) if attempt <= backoff.max_retries() => {
          Some(backoff.delay(attempt - 1))
        }
        _ => None,
      };

      let Some(delay) = delay else {
        if outcome == Outcome::Retry {
          warn!(dispatch_id = %dispatch_id, attempts = attempt, "retries exhausted");
        }
        return self.finish(dispatch_id, trigger.as_ref(), outcome, attempt, result);
      };

      warn!(
        dispatch_id = %dispatch_id,
        attempt,
        delay_ms = delay.as_millis() as u64,
        error = ?result.as_ref().err().map(ToString::to_string),
        "retry_scheduled"
      );
      self.notifier.notify(DispatchEvent::RetryScheduled {
        dispatch_id: dispatch_id.clone(),
        trigger: name.clone(),
        attempt,
        delay_ms: delay.as_millis() as u64,
      });

      tokio::select! {
        _ = cancel.cancelled() => {
          warn!(dispatch_id = %dispatch_id, "dispatch cancelled during backoff");
          return self.finish(
            dispatch_id,
            trigger.as_ref(),
            Outcome::Failure,
            attempt,
            Err(TriggerError::Cancelled),
          );
        }
        _ = tokio::time::sleep(delay) => {}
      }
    }
  }

  fn finish(
    &self,
    dispatch_id: String,
    trigger: &dyn Trigger,
    outcome: Outcome,
    attempts: u32,
    result: Result<Response, TriggerError>,
  ) -> Dispatched {
    // A retry that ran out of attempts is a failure.
    let outcome = match outcome {
      Outcome::Retry => Outcome::Failure,
      other => other,
    };
    let name = trigger.name().to_string();
    let (response, error) = match result {
      Ok(response) => (Some(response), None),
      Err(e) => (None, Some(e.to_string())),
    };

    match outcome {
      Outcome::Success => {
        info!(dispatch_id = %dispatch_id, trigger = %name, attempts, "dispatch_completed");
        self.notifier.notify(DispatchEvent::Completed {
          dispatch_id: dispatch_id.clone(),
          trigger: name.clone(),
          outcome,
          attempts,
        });
      }
      _ => {
        let reason = error
          .clone()
          .unwrap_or_else(|| "response rejected by policy".to_string());
        error!(dispatch_id = %dispatch_id, trigger = %name, attempts, error = %reason, "dispatch_failed");
        self.notifier.notify(DispatchEvent::Failed {
          dispatch_id: dispatch_id.clone(),
          trigger: name.clone(),
          error: reason,
        });
      }
    }

    Dispatched {
      dispatch_id,
      trigger: name,
      kind: trigger.kind(),
      outcome,
      attempts,
      response,
      error,
    }
  }
}

/// Fetch, bind and execute. Any stage error ends the attempt.
async fn run_stages(
  trigger: &dyn Trigger,
  ctx: &DispatchContext,
  events: &EventSet,
) -> Result<Response, TriggerError> {
  let resource = trigger.fetch_resource()?;
  let resource = trigger.apply_resource_parameters(events, resource)?;
  trigger.execute(ctx, events, &resource).await
}
