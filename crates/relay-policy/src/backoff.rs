use std::time::Duration;

use relay_config::BackoffDef;

/// Exponential retry schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
  max_retries: u32,
  initial: Duration,
  multiplier: f64,
  max_interval: Option<Duration>,
}

impl Backoff {
  pub fn new(max_retries: u32, initial: Duration, multiplier: f64) -> Self {
    Self {
      max_retries,
      initial,
      multiplier,
      max_interval: None,
    }
  }

  pub fn with_max_interval(mut self, max_interval: Duration) -> Self {
    self.max_interval = Some(max_interval);
    self
  }

  pub fn max_retries(&self) -> u32 {
    self.max_retries
  }

  /// Delay before retry number `attempt` (0-based):
  /// `initial * multiplier^attempt`, capped at the max interval.
  pub fn delay(&self, attempt: u32) -> Duration {
    let factor = self.multiplier.max(1.0).powi(attempt.min(i32::MAX as u32) as i32);
    let millis = self.initial.as_millis() as f64 * factor;
    let delay = if millis.is_finite() {
      Duration::from_millis(millis as u64)
    } else {
      Duration::MAX
    };
    match self.max_interval {
      Some(cap) => delay.min(cap),
      None => delay,
    }
  }

  /// All delays of the schedule, in order.
  pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
    (0..self.max_retries).map(|attempt| self.delay(attempt))
  }
}

impl From<&BackoffDef> for Backoff {
  fn from(def: &BackoffDef) -> Self {
    let backoff = Backoff::new(
      def.max_retries,
      Duration::from_millis(def.initial_interval_ms),
      def.multiplier,
    );
    match def.max_interval_ms {
      Some(ms) => backoff.with_max_interval(Duration::from_millis(ms)),
      None => backoff,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_exponential_delays() {
    let backoff = Backoff::new(4, Duration::from_millis(100), 2.0);
    let delays: Vec<_> = backoff.delays().collect();
    assert_eq!(
      delays,
      vec![
        Duration::from_millis(100),
        Duration::from_millis(200),
        Duration::from_millis(400),
        Duration::from_millis(800),
      ]
    );
  }

  #[test]
  fn test_max_interval_caps_delay() {
    let backoff =
      Backoff::new(5, Duration::from_millis(100), 3.0).with_max_interval(Duration::from_millis(500));
    assert_eq!(backoff.delay(1), Duration::from_millis(300));
    assert_eq!(backoff.delay(2), Duration::from_millis(500));
    assert_eq!(backoff.delay(30), Duration::from_millis(500));
  }

  #[test]
  fn test_multiplier_below_one_is_constant() {
    let backoff = Backoff::new(3, Duration::from_millis(50), 0.5);
    assert_eq!(backoff.delay(0), Duration::from_millis(50));
    assert_eq!(backoff.delay(2), Duration::from_millis(50));
  }

  #[test]
  fn test_from_def() {
    let def = BackoffDef {
      max_retries: 2,
      initial_interval_ms: 10,
      multiplier: 2.0,
      max_interval_ms: Some(15),
    };
    let backoff = Backoff::from(&def);
    assert_eq!(backoff.max_retries(), 2);
    assert_eq!(backoff.delays().collect::<Vec<_>>(), vec![
      Duration::from_millis(10),
      Duration::from_millis(15),
    ]);
  }

  #[test]
  fn test_huge_attempt_does_not_overflow() {
    let backoff = Backoff::new(1, Duration::from_secs(1), 10.0);
    assert!(backoff.delay(u32::MAX) >= Duration::from_secs(1));
  }
}
