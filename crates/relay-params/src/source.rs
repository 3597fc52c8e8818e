//! Resolving a binding's source value from the event set.

use minijinja::{Environment, context};
use relay_config::ParameterSource;
use relay_event::{Event, EventSet};
use serde_json::Value;
use tracing::debug;

use crate::error::ParamError;
use crate::path::Path;

/// Resolve the value a binding's source points at.
///
/// Falls back to the source's default value when the event is missing or
/// the selector does not resolve. Without a default, those cases fail with
/// [`ParamError::MissingEvent`] and [`ParamError::PathResolution`].
pub fn resolve_param_value(src: &ParameterSource, events: &EventSet) -> Result<Value, ParamError> {
  let Some(event) = events.get(&src.dependency_name) else {
    return match &src.value {
      Some(default) => {
        debug!(
          dependency = %src.dependency_name,
          "event not in event set, using default value"
        );
        Ok(default.clone())
      }
      None => Err(ParamError::MissingEvent {
        name: src.dependency_name.clone(),
      }),
    };
  };

  match resolve_from_event(src, event)? {
    Some(value) => Ok(value),
    None => match &src.value {
      Some(default) => {
        debug!(
          dependency = %src.dependency_name,
          selector = %selector(src),
          "selector did not resolve, using default value"
        );
        Ok(default.clone())
      }
      None => Err(ParamError::PathResolution {
        event: src.dependency_name.clone(),
        selector: selector(src),
      }),
    },
  }
}

/// `Ok(None)` means the selector did not resolve.
fn resolve_from_event(src: &ParameterSource, event: &Event) -> Result<Option<Value>, ParamError> {
  if let Some(template) = &src.context_template {
    let rendered = render(
      template,
      &src.dependency_name,
      context! { Context => minijinja::Value::from_serialize(&event.context) },
    );
    return rendered_value(src, rendered);
  }

  if let Some(key) = &src.context_key {
    let path = Path::parse(key)?;
    return Ok(path.get(&event.context_document()).cloned());
  }

  if let Some(template) = &src.data_template {
    let rendered = render(
      template,
      &src.dependency_name,
      context! {
        Input => minijinja::Value::from_serialize(event.data_value()),
        Context => minijinja::Value::from_serialize(&event.context),
      },
    );
    return rendered_value(src, rendered);
  }

  if let Some(key) = &src.data_key {
    let path = Path::parse(key)?;
    return Ok(event.document().and_then(|doc| path.get(&doc).cloned()));
  }

  Ok(Some(event.data_value()))
}

fn render(template: &str, event: &str, ctx: minijinja::Value) -> Result<String, ParamError> {
  let env = Environment::new();
  env
    .render_str(template, ctx)
    .map_err(|e| ParamError::Template {
      event: event.to_string(),
      message: e.to_string(),
    })
}

/// An empty rendering counts as unresolved. A render error is only fatal
/// when there is no default to fall back to.
fn rendered_value(
  src: &ParameterSource,
  rendered: Result<String, ParamError>,
) -> Result<Option<Value>, ParamError> {
  match rendered {
    Ok(text) if text.is_empty() => Ok(None),
    Ok(text) => Ok(Some(Value::String(text))),
    Err(_) if src.value.is_some() => Ok(None),
    Err(e) => Err(e),
  }
}

/// Describes the selector for error messages.
fn selector(src: &ParameterSource) -> String {
  if let Some(t) = &src.context_template {
    format!("context template {}", t)
  } else if let Some(k) = &src.context_key {
    format!("context key {}", k)
  } else if let Some(t) = &src.data_template {
    format!("data template {}", t)
  } else if let Some(k) = &src.data_key {
    format!("data key {}", k)
  } else {
    "event data".to_string()
  }
}
