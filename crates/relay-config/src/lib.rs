//! Relay Config
//!
//! This crate contains the serializable definition types for relay triggers.
//! A [`TriggerDef`] describes what to do when a group of correlated events
//! arrives: which action to run ([`TriggerTemplate`]), how event values are
//! bound into the action ([`ParameterDef`]), and how the outcome is judged
//! ([`PolicyDef`]).
//!
//! Definitions can be loaded from:
//! - JSON files
//! - YAML files
//!
//! The dispatcher takes these definitions as-is; nothing here performs I/O
//! against the action targets.

mod credential;
mod dispatch;
mod document;
mod parameter;
mod policy;
mod trigger;

pub use credential::{CredentialSource, SecretSelector};
pub use dispatch::DispatchConfig;
pub use document::{ConfigError, Format, parse_document};
pub use parameter::{Operation, ParameterDef, ParameterSource};
pub use policy::{BackoffDef, FieldMatch, PolicyDef, StatusMatch, StatusPolicy};
pub use trigger::{
  FunctionTemplate, HttpTemplate, LogTemplate, PublishTemplate, ResourceOperation,
  ResourceTemplate, TriggerDef, TriggerKind, TriggerTemplate,
};
