//! Relay Trigger
//!
//! A trigger turns an [`relay_event::EventSet`] into one external action in
//! four stages: fetch the resource template, apply parameter bindings,
//! execute the action, and classify the result with the trigger's policy.
//!
//! Variants exist per action kind (cloud function, HTTP, publish, cluster
//! resource, log). [`TriggerFactory::build`] maps a definition to its variant
//! and hands it the shared client caches.

mod cache;
mod context;
mod credentials;
mod error;
mod factory;
mod function;
mod http;
mod log;
mod publish;
mod resource;
mod trigger;

pub use cache::ClientCache;
pub use context::DispatchContext;
pub use credentials::{credential_path, load_token};
pub use error::{CredentialError, TriggerError};
pub use factory::{TriggerFactory, build_trigger};
pub use function::{FunctionClient, FunctionTrigger};
pub use http::{HttpClient, HttpTrigger};
pub use log::LogTrigger;
pub use publish::{ChannelPublisher, Message, MessagePublisher, PublishError, PublishTrigger};
pub use resource::ResourceTrigger;
pub use trigger::Trigger;

pub use relay_policy::{Outcome, Response, ResponseStatus};
