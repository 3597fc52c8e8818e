//! Integration tests for the dispatcher's retry loop and sibling dispatch.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use relay_config::{
  BackoffDef, DispatchConfig, HttpTemplate, LogTemplate, PolicyDef, PublishTemplate, TriggerDef,
  TriggerKind, TriggerTemplate,
};
use relay_dispatch::{ChannelNotifier, DispatchEvent, Dispatcher};
use relay_event::{Event, EventSet};
use relay_trigger::{
  DispatchContext, Outcome, Response, ResponseStatus, Trigger, TriggerError, TriggerFactory,
};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Fails with a transient error until `failures` attempts have been made.
struct ScriptedTrigger {
  def: TriggerDef,
  failures: u32,
  calls: AtomicU32,
  error: fn() -> TriggerError,
}

impl ScriptedTrigger {
  fn new(failures: u32, policy: Option<PolicyDef>) -> Self {
    let mut def = TriggerDef::new("scripted", TriggerTemplate::Log(LogTemplate::default()));
    def.policy = policy;
    Self {
      def,
      failures,
      calls: AtomicU32::new(0),
      error: || TriggerError::Execution {
        trigger: "scripted".to_string(),
        message: "unavailable".to_string(),
      },
    }
  }

  fn failing_with(mut self, error: fn() -> TriggerError) -> Self {
    self.error = error;
    self
  }
}

#[async_trait]
impl Trigger for ScriptedTrigger {
  fn definition(&self) -> &TriggerDef {
    &self.def
  }

  async fn execute(
    &self,
    _ctx: &DispatchContext,
    _events: &EventSet,
    _resource: &Value,
  ) -> Result<Response, TriggerError> {
    let call = self.calls.fetch_add(1, Ordering::SeqCst);
    if call < self.failures {
      return Err((self.error)());
    }
    Ok(Response::new(
      TriggerKind::Log,
      ResponseStatus::None,
      json!({ "call": call }),
    ))
  }
}

fn retry_policy(max_retries: u32, initial_interval_ms: u64) -> Option<PolicyDef> {
  Some(PolicyDef {
    backoff: Some(BackoffDef {
      max_retries,
      initial_interval_ms,
      multiplier: 2.0,
      max_interval_ms: None,
    }),
    ..Default::default()
  })
}

fn events() -> Arc<EventSet> {
  Arc::new(
    EventSet::builder()
      .event("sensor", Event::json("iot", &json!({ "temp": 20 })))
      .build(),
  )
}

fn dispatcher() -> Dispatcher {
  Dispatcher::new(TriggerFactory::new(DispatchConfig::default()))
}

#[tokio::test]
async fn test_retries_until_success() {
  let (tx, mut rx) = mpsc::unbounded_channel();
  let dispatcher = dispatcher().with_notifier(Arc::new(ChannelNotifier::new(tx)));
  let trigger = Arc::new(ScriptedTrigger::new(2, retry_policy(3, 1)));

  let result = dispatcher
    .dispatch_trigger(trigger.clone(), events(), CancellationToken::new())
    .await;

  assert_eq!(result.outcome, Outcome::Success);
  assert_eq!(result.attempts, 3);
  assert_eq!(result.response.unwrap().body, json!({ "call": 2 }));
  assert!(result.error.is_none());
  assert_eq!(trigger.calls.load(Ordering::SeqCst), 3);

  let mut retries = Vec::new();
  let mut completed = false;
  while let Ok(event) = rx.try_recv() {
    match event {
      DispatchEvent::RetryScheduled { attempt, delay_ms, .. } => retries.push((attempt, delay_ms)),
      DispatchEvent::Completed { attempts, .. } => {
        assert_eq!(attempts, 3);
        completed = true;
      }
      _ => {}
    }
  }
  assert_eq!(retries, vec![(1, 1), (2, 2)]);
  assert!(completed);
}

#[tokio::test]
async fn test_retries_exhausted() {
  let trigger = Arc::new(ScriptedTrigger::new(u32::MAX, retry_policy(2, 1)));

  let result = dispatcher()
    .dispatch_trigger(trigger.clone(), events(), CancellationToken::new())
    .await;

  assert_eq!(result.outcome, Outcome::Failure);
  assert_eq!(result.attempts, 3);
  assert!(result.error.unwrap().contains("unavailable"));
  assert_eq!(trigger.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_no_backoff_means_single_attempt() {
  let trigger = Arc::new(ScriptedTrigger::new(1, None));

  let result = dispatcher()
    .dispatch_trigger(trigger.clone(), events(), CancellationToken::new())
    .await;

  assert_eq!(result.outcome, Outcome::Failure);
  assert_eq!(result.attempts, 1);
}

#[tokio::test]
async fn test_permanent_errors_are_not_retried() {
  let trigger = Arc::new(ScriptedTrigger::new(1, retry_policy(5, 1)).failing_with(|| {
    TriggerError::PayloadNotSpecified {
      trigger: "scripted".to_string(),
    }
  }));

  let result = dispatcher()
    .dispatch_trigger(trigger.clone(), events(), CancellationToken::new())
    .await;

  assert_eq!(result.outcome, Outcome::Failure);
  assert_eq!(result.attempts, 1);
  assert_eq!(trigger.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancel_during_backoff() {
  let trigger = Arc::new(ScriptedTrigger::new(u32::MAX, retry_policy(5, 10_000)));
  let cancel = CancellationToken::new();

  let canceller = {
    let cancel = cancel.clone();
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(50)).await;
      cancel.cancel();
    })
  };

  let started = std::time::Instant::now();
  let result = dispatcher()
    .dispatch_trigger(trigger, events(), cancel)
    .await;
  canceller.await.unwrap();

  assert!(started.elapsed() < Duration::from_secs(5));
  assert_eq!(result.outcome, Outcome::Failure);
  assert_eq!(result.attempts, 1);
  assert_eq!(result.error.as_deref(), Some("dispatch cancelled"));
}

#[tokio::test]
async fn test_dispatch_all_isolates_siblings() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .respond_with(ResponseTemplate::new(500))
    .mount(&server)
    .await;

  let mut http = TriggerDef::new(
    "webhook",
    TriggerTemplate::Http(HttpTemplate {
      url: server.uri(),
      method: "POST".to_string(),
      headers: Default::default(),
      token: None,
    }),
  );
  http.policy = Some(PolicyDef {
    status: Some(relay_config::StatusPolicy {
      allow: vec![relay_config::StatusMatch::Code(200)],
    }),
    ..Default::default()
  });
  let publish = TriggerDef::new(
    "forward",
    TriggerTemplate::Publish(PublishTemplate {
      topic: "t".to_string(),
      key: None,
    }),
  );
  let log = TriggerDef::new("audit", TriggerTemplate::Log(LogTemplate::default()));

  let results = dispatcher()
    .dispatch_all(vec![http, publish, log], events(), &CancellationToken::new())
    .await;

  let summary: Vec<_> = results
    .iter()
    .map(|r| (r.trigger.as_str(), r.outcome, r.attempts))
    .collect();
  assert_eq!(
    summary,
    vec![
      ("webhook", Outcome::Failure, 1),
      ("forward", Outcome::Failure, 0),
      ("audit", Outcome::Success, 1),
    ]
  );
  assert_eq!(
    results[0].response.as_ref().map(|r| &r.status),
    Some(&ResponseStatus::Http(500))
  );
  assert!(results[1].error.as_ref().unwrap().contains("publisher"));
}

#[tokio::test]
async fn test_dispatch_all_cancelled() {
  let cancel = CancellationToken::new();
  cancel.cancel();

  let defs = vec![
    TriggerDef::new("a", TriggerTemplate::Log(LogTemplate::default())),
    TriggerDef::new(
      "b",
      TriggerTemplate::Http(HttpTemplate {
        url: "http://127.0.0.1:9".to_string(),
        method: "POST".to_string(),
        headers: Default::default(),
        token: None,
      }),
    ),
  ];
  let results = dispatcher().dispatch_all(defs, events(), &cancel).await;

  for result in &results {
    assert_eq!(result.outcome, Outcome::Failure);
    assert_eq!(result.error.as_deref(), Some("dispatch cancelled"));
  }
}
