use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::TriggerError;

/// Cancellation and deadline for one execution.
#[derive(Debug, Clone)]
pub struct DispatchContext {
  cancel: CancellationToken,
  timeout: Duration,
}

impl DispatchContext {
  pub fn new(cancel: CancellationToken, timeout: Duration) -> Self {
    Self { cancel, timeout }
  }

  pub fn cancel_token(&self) -> &CancellationToken {
    &self.cancel
  }

  pub fn timeout(&self) -> Duration {
    self.timeout
  }

  pub fn is_cancelled(&self) -> bool {
    self.cancel.is_cancelled()
  }

  /// Run `fut` until it completes, the token is cancelled, or the deadline
  /// passes. The future is dropped in the latter two cases.
  pub async fn run<T, F>(&self, fut: F) -> Result<T, TriggerError>
  where
    F: Future<Output = Result<T, TriggerError>>,
  {
    // Cancellation wins over a ready result; a ready result wins over the
    // deadline.
    tokio::select! {
      biased;
      _ = self.cancel.cancelled() => Err(TriggerError::Cancelled),
      result = fut => result,
      _ = tokio::time::sleep(self.timeout) => Err(TriggerError::Timeout {
        timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
      }),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_run_completes() {
    let ctx = DispatchContext::new(CancellationToken::new(), Duration::from_secs(5));
    let value = ctx.run(async { Ok::<_, TriggerError>(7) }).await.unwrap();
    assert_eq!(value, 7);
  }

  #[tokio::test]
  async fn test_run_times_out() {
    let ctx = DispatchContext::new(CancellationToken::new(), Duration::from_millis(20));
    let err = ctx
      .run(async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok::<_, TriggerError>(())
      })
      .await
      .unwrap_err();
    assert!(matches!(err, TriggerError::Timeout { timeout_ms: 20 }));
  }

  #[tokio::test(start_paused = true)]
  async fn test_run_result_ready_at_deadline_is_kept() {
    let ctx = DispatchContext::new(CancellationToken::new(), Duration::from_millis(50));
    let value = ctx
      .run(async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<_, TriggerError>("done")
      })
      .await
      .unwrap();
    assert_eq!(value, "done");
  }

  #[tokio::test]
  async fn test_run_zero_timeout_keeps_ready_result() {
    let ctx = DispatchContext::new(CancellationToken::new(), Duration::ZERO);
    let value = ctx.run(async { Ok::<_, TriggerError>(1) }).await.unwrap();
    assert_eq!(value, 1);
  }

  #[tokio::test]
  async fn test_run_cancelled() {
    let token = CancellationToken::new();
    let ctx = DispatchContext::new(token.clone(), Duration::from_secs(5));
    token.cancel();
    let err = ctx
      .run(async { Ok::<_, TriggerError>(()) })
      .await
      .unwrap_err();
    assert!(matches!(err, TriggerError::Cancelled));
  }
}
