//! Relay Params
//!
//! Binds values from an [`EventSet`](relay_event::EventSet) into JSON
//! documents.
//!
//! - [`apply_params`] mutates an existing resource template.
//! - [`construct_payload`] assembles a fresh document from nothing.
//!
//! Both resolve each binding's source the same way (see
//! [`resolve_param_value`]) and address destinations with [`Path`].
//! Resolution is pure: identical inputs give byte-identical output.

mod apply;
mod error;
mod path;
mod payload;
mod source;

pub use apply::{apply_params, apply_to_document};
pub use error::ParamError;
pub use path::{MAX_ARRAY_PADDING, Path, PathError, Segment};
pub use payload::construct_payload;
pub use source::resolve_param_value;
