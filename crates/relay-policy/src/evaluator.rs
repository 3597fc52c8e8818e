use std::fmt;

use relay_config::{FieldMatch, PolicyDef, StatusMatch};
use relay_params::Path;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{Backoff, Response, ResponseStatus};

/// Classification of one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
  Success,
  Failure,
  Retry,
}

impl fmt::Display for Outcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Outcome::Success => f.write_str("success"),
      Outcome::Failure => f.write_str("failure"),
      Outcome::Retry => f.write_str("retry"),
    }
  }
}

/// How an execution error may be treated by a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
  /// The deadline expired. The action may or may not have taken effect.
  Timeout,
  /// The call failed in a way that may succeed on a later attempt.
  Transient,
  /// Retrying cannot help (bad configuration, credentials, cancellation).
  Permanent,
}

/// Errors the evaluator can classify.
pub trait Classify {
  fn class(&self) -> ErrorClass;
}

/// Stateless outcome classifier over an optional policy.
#[derive(Debug, Clone, Copy)]
pub struct PolicyEvaluator<'a> {
  policy: Option<&'a PolicyDef>,
}

impl<'a> PolicyEvaluator<'a> {
  pub fn new(policy: Option<&'a PolicyDef>) -> Self {
    Self { policy }
  }

  /// Classify the result of an execution.
  pub fn evaluate<E: Classify>(&self, result: Result<&Response, &E>) -> Outcome {
    let Some(policy) = self.policy else {
      return match result {
        Ok(_) => Outcome::Success,
        Err(_) => Outcome::Failure,
      };
    };

    let retryable = policy.backoff.is_some();
    match result {
      Ok(response) if accepts(policy, response) => Outcome::Success,
      Ok(_) if retryable => Outcome::Retry,
      Ok(_) => Outcome::Failure,
      Err(err) => match err.class() {
        ErrorClass::Timeout if retryable && policy.retry_on_timeout => Outcome::Retry,
        ErrorClass::Transient if retryable => Outcome::Retry,
        _ => Outcome::Failure,
      },
    }
  }

  /// Whether the response satisfies the declared status and result rules.
  pub fn accepts(&self, response: &Response) -> bool {
    self.policy.is_none_or(|policy| accepts(policy, response))
  }

  /// Retry schedule, when the policy declares one.
  pub fn backoff(&self) -> Option<Backoff> {
    self.policy.and_then(|p| p.backoff.as_ref()).map(Backoff::from)
  }
}

fn accepts(policy: &PolicyDef, response: &Response) -> bool {
  let status_ok = policy
    .status
    .as_ref()
    .is_none_or(|status| status.allow.iter().any(|m| status_matches(m, &response.status)));
  status_ok
    && policy
      .result
      .as_ref()
      .is_none_or(|field| field_matches(field, &response.body))
}

fn status_matches(allowed: &StatusMatch, status: &ResponseStatus) -> bool {
  match (allowed, status) {
    (StatusMatch::Code(want), ResponseStatus::Http(got)) => want == got,
    (StatusMatch::Code(want), ResponseStatus::Code(got)) => got.trim() == want.to_string(),
    (StatusMatch::Text(want), ResponseStatus::Code(got)) => want.eq_ignore_ascii_case(got),
    (StatusMatch::Text(want), ResponseStatus::Http(got)) => want.trim() == got.to_string(),
    (_, ResponseStatus::None) => false,
  }
}

fn field_matches(field: &FieldMatch, body: &serde_json::Value) -> bool {
  match Path::parse(&field.path) {
    Ok(path) => path.get(body) == Some(&field.value),
    Err(err) => {
      warn!(path = %field.path, error = %err, "invalid result path in policy");
      false
    }
  }
}

#[cfg(test)]
mod tests {
  use relay_config::{BackoffDef, StatusPolicy, TriggerKind};
  use serde_json::json;

  use super::*;

  #[derive(Debug)]
  struct TestError(ErrorClass);

  impl Classify for TestError {
    fn class(&self) -> ErrorClass {
      self.0
    }
  }

  fn response(status: ResponseStatus, body: serde_json::Value) -> Response {
    Response::new(TriggerKind::Http, status, body)
  }

  fn ok_response() -> Response {
    response(ResponseStatus::Http(200), json!({}))
  }

  fn status_policy(allow: Vec<StatusMatch>) -> PolicyDef {
    PolicyDef {
      status: Some(StatusPolicy { allow }),
      ..Default::default()
    }
  }

  #[test]
  fn test_no_policy() {
    let evaluator = PolicyEvaluator::new(None);
    assert_eq!(
      evaluator.evaluate::<TestError>(Ok(&ok_response())),
      Outcome::Success
    );
    assert_eq!(
      evaluator.evaluate(Err::<&Response, _>(&TestError(ErrorClass::Transient))),
      Outcome::Failure
    );
    assert!(evaluator.backoff().is_none());
  }

  #[test]
  fn test_status_allow_list() {
    let policy = status_policy(vec![StatusMatch::Code(200), StatusMatch::Code(201)]);
    let evaluator = PolicyEvaluator::new(Some(&policy));

    assert_eq!(
      evaluator.evaluate::<TestError>(Ok(&ok_response())),
      Outcome::Success
    );
    let rejected = response(ResponseStatus::Http(503), json!({}));
    assert_eq!(evaluator.evaluate::<TestError>(Ok(&rejected)), Outcome::Failure);
  }

  #[test]
  fn test_rejected_response_retries_with_backoff() {
    let mut policy = status_policy(vec![StatusMatch::Code(200)]);
    policy.backoff = Some(BackoffDef::default());
    let evaluator = PolicyEvaluator::new(Some(&policy));

    let rejected = response(ResponseStatus::Http(503), json!({}));
    assert_eq!(evaluator.evaluate::<TestError>(Ok(&rejected)), Outcome::Retry);
    assert_eq!(evaluator.backoff().map(|b| b.max_retries()), Some(3));
  }

  #[test]
  fn test_textual_status() {
    let policy = status_policy(vec![StatusMatch::Text("ok".to_string())]);
    let evaluator = PolicyEvaluator::new(Some(&policy));

    let ok = response(ResponseStatus::Code("OK".to_string()), json!({}));
    let err = response(ResponseStatus::Code("ERROR".to_string()), json!({}));
    let none = response(ResponseStatus::None, json!({}));
    assert!(evaluator.accepts(&ok));
    assert!(!evaluator.accepts(&err));
    assert!(!evaluator.accepts(&none));
  }

  #[test]
  fn test_numeric_allow_matches_textual_code() {
    let policy = status_policy(vec![StatusMatch::Code(0)]);
    let evaluator = PolicyEvaluator::new(Some(&policy));
    assert!(evaluator.accepts(&response(ResponseStatus::Code("0".into()), json!(null))));
  }

  #[test]
  fn test_result_field() {
    let policy = PolicyDef {
      result: Some(FieldMatch {
        path: "status.phase".to_string(),
        value: json!("Done"),
      }),
      ..Default::default()
    };
    let evaluator = PolicyEvaluator::new(Some(&policy));

    let done = response(ResponseStatus::None, json!({"status": {"phase": "Done"}}));
    let pending = response(ResponseStatus::None, json!({"status": {"phase": "Pending"}}));
    let missing = response(ResponseStatus::None, json!({}));
    assert!(evaluator.accepts(&done));
    assert!(!evaluator.accepts(&pending));
    assert!(!evaluator.accepts(&missing));
  }

  #[test]
  fn test_invalid_result_path_rejects() {
    let policy = PolicyDef {
      result: Some(FieldMatch {
        path: "a..b".to_string(),
        value: json!(1),
      }),
      ..Default::default()
    };
    let evaluator = PolicyEvaluator::new(Some(&policy));
    assert!(!evaluator.accepts(&response(ResponseStatus::None, json!({"a": {"b": 1}}))));
  }

  #[test]
  fn test_error_classes() {
    let with_backoff = PolicyDef {
      backoff: Some(BackoffDef::default()),
      ..Default::default()
    };
    let evaluator = PolicyEvaluator::new(Some(&with_backoff));
    let eval = |class| evaluator.evaluate(Err::<&Response, _>(&TestError(class)));

    assert_eq!(eval(ErrorClass::Transient), Outcome::Retry);
    assert_eq!(eval(ErrorClass::Timeout), Outcome::Failure);
    assert_eq!(eval(ErrorClass::Permanent), Outcome::Failure);

    let retry_timeouts = PolicyDef {
      retry_on_timeout: true,
      ..with_backoff.clone()
    };
    let evaluator = PolicyEvaluator::new(Some(&retry_timeouts));
    assert_eq!(
      evaluator.evaluate(Err::<&Response, _>(&TestError(ErrorClass::Timeout))),
      Outcome::Retry
    );
  }

  #[test]
  fn test_errors_without_backoff_fail() {
    let policy = PolicyDef {
      retry_on_timeout: true,
      ..Default::default()
    };
    let evaluator = PolicyEvaluator::new(Some(&policy));
    assert_eq!(
      evaluator.evaluate(Err::<&Response, _>(&TestError(ErrorClass::Timeout))),
      Outcome::Failure
    );
    assert_eq!(
      evaluator.evaluate(Err::<&Response, _>(&TestError(ErrorClass::Transient))),
      Outcome::Failure
    );
  }
}
