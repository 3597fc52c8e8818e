//! Dispatch events and notifiers for observability.
//!
//! Events are emitted while a trigger is dispatched so consumers can follow
//! attempts and retries as they happen.

use relay_policy::Outcome;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted during a dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DispatchEvent {
  /// An attempt has started.
  Started {
    dispatch_id: String,
    trigger: String,
    attempt: u32,
  },

  /// An attempt will be retried after `delay_ms`.
  RetryScheduled {
    dispatch_id: String,
    trigger: String,
    attempt: u32,
    delay_ms: u64,
  },

  /// The dispatch finished with a success outcome.
  Completed {
    dispatch_id: String,
    trigger: String,
    outcome: Outcome,
    attempts: u32,
  },

  /// The dispatch finished with a failure.
  Failed {
    dispatch_id: String,
    trigger: String,
    error: String,
  },
}

/// Trait for receiving dispatch events.
pub trait DispatchNotifier: Send + Sync {
  fn notify(&self, event: DispatchEvent);
}

/// A notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl DispatchNotifier for NoopNotifier {
  fn notify(&self, _event: DispatchEvent) {}
}

/// A notifier that sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded so a slow consumer never stalls a dispatch.
  sender: mpsc::UnboundedSender<DispatchEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<DispatchEvent>) -> Self {
    Self { sender }
  }
}

impl DispatchNotifier for ChannelNotifier {
  fn notify(&self, event: DispatchEvent) {
    // Ignore send errors - receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
