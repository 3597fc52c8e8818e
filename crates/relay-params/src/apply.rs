//! Applying parameter bindings to a resource template.

use relay_config::{Operation, ParameterDef};
use relay_event::EventSet;
use serde_json::Value;

use crate::error::ParamError;
use crate::path::{Path, kind_name};
use crate::source::resolve_param_value;

/// Apply bindings to a serialized template and re-serialize it.
///
/// Bindings are applied in order, so later bindings see the structure
/// produced by earlier ones.
pub fn apply_params(
  template: &[u8],
  params: &[ParameterDef],
  events: &EventSet,
) -> Result<Vec<u8>, ParamError> {
  let mut doc: Value = serde_json::from_slice(template)?;
  apply_to_document(&mut doc, params, events)?;
  Ok(serde_json::to_vec(&doc)?)
}

/// Apply bindings to a document in place.
///
/// On error the document may hold the bindings applied so far; callers
/// discard it.
pub fn apply_to_document(
  doc: &mut Value,
  params: &[ParameterDef],
  events: &EventSet,
) -> Result<(), ParamError> {
  for param in params {
    let value = resolve_param_value(&param.src, events)?;
    apply_value(doc, param, value)?;
  }
  Ok(())
}

fn apply_value(doc: &mut Value, param: &ParameterDef, value: Value) -> Result<(), ParamError> {
  let path = Path::parse(&param.dest)?;
  let slot = path.slot(doc)?;

  let prepend = match param.operation {
    Operation::Overwrite => {
      *slot = value;
      return Ok(());
    }
    Operation::Prepend => true,
    Operation::Append => false,
  };

  match slot {
    // Nothing there yet: behaves like overwrite.
    Value::Null => *slot = value,
    Value::Array(items) => {
      if prepend {
        items.insert(0, value);
      } else {
        items.push(value);
      }
    }
    Value::String(current) => {
      let text = match value {
        Value::String(s) => s,
        other => other.to_string(),
      };
      if prepend {
        current.insert_str(0, &text);
      } else {
        current.push_str(&text);
      }
    }
    other => {
      return Err(ParamError::InvalidDestination {
        dest: param.dest.clone(),
        operation: if prepend { "prepend" } else { "append" },
        found: kind_name(other),
      });
    }
  }

  Ok(())
}
