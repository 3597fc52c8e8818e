//! Relay Policy
//!
//! Classifies the result of a trigger execution as [`Outcome::Success`],
//! [`Outcome::Failure`] or [`Outcome::Retry`], and computes the retry
//! delays a caller should wait between attempts.
//!
//! The evaluator is stateless and performs no I/O. Counting attempts and
//! sleeping between them is the dispatcher's job.

mod backoff;
mod evaluator;
mod response;

pub use backoff::Backoff;
pub use evaluator::{Classify, ErrorClass, Outcome, PolicyEvaluator};
pub use response::{Response, ResponseStatus};
