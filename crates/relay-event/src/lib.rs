//! Relay Event
//!
//! Events delivered by upstream sources, and the [`EventSet`] that groups
//! the events satisfying one trigger invocation.
//!
//! An event set is built once and never mutated. Dispatches share it
//! behind an `Arc` without any locking.

mod event;
mod set;

pub use event::{Event, EventContext};
pub use set::{EventSet, EventSetBuilder};
