//! Relay Dispatch
//!
//! Runs triggers against an event set: the four trigger stages, the retry
//! loop driven by the trigger's policy, and concurrent dispatch of sibling
//! triggers that share one event set.

mod dispatcher;
mod events;

pub use dispatcher::{Dispatched, Dispatcher};
pub use events::{ChannelNotifier, DispatchEvent, DispatchNotifier, NoopNotifier};
