//! Building a request payload from bindings alone.

use relay_config::ParameterDef;
use relay_event::EventSet;
use serde_json::{Map, Value};

use crate::apply::apply_to_document;
use crate::error::ParamError;

/// Build a payload document from an empty object.
///
/// Destinations describe the shape of the new document. Any binding that
/// fails aborts the whole payload.
pub fn construct_payload(params: &[ParameterDef], events: &EventSet) -> Result<Vec<u8>, ParamError> {
  let mut doc = Value::Object(Map::new());
  apply_to_document(&mut doc, params, events)?;
  Ok(serde_json::to_vec(&doc)?)
}
