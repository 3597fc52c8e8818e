//! Path expressions addressing a location inside a JSON document.
//!
//! Accepted forms:
//! - `$` or empty: the document root
//! - `$.order.items[0].sku`, `order.items.0.sku`: keys and indices
//! - `labels.app\.kubernetes\.io/name`: `\` escapes a literal `.`
//! - `headers["Content-Type"]`: bracketed, quoted key
//!
//! A numeric segment indexes arrays; on an object it is looked up as the
//! decimal key.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
  #[error("invalid path '{expr}': {reason}")]
  Invalid { expr: String, reason: String },

  #[error("cannot walk path '{path}': found {found}")]
  NotTraversable { path: String, found: &'static str },

  #[error("index {index} at '{path}' is too far past the end of the array")]
  IndexTooLarge { path: String, index: usize },
}

/// Most `null` elements [`Path::slot`] adds to reach a missing index.
pub const MAX_ARRAY_PADDING: usize = 65_536;

impl PathError {
  fn invalid(expr: &str, reason: impl Into<String>) -> Self {
    Self::Invalid {
      expr: expr.to_string(),
      reason: reason.into(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  Key(String),
  Index(usize),
}

impl Segment {
  fn from_key(key: String) -> Self {
    match key.parse::<usize>() {
      Ok(index) if key.bytes().all(|b| b.is_ascii_digit()) => Segment::Index(index),
      _ => Segment::Key(key),
    }
  }

  fn from_bracket(expr: &str, inner: &str) -> Result<Self, PathError> {
    let inner = inner.trim();
    for quote in ['"', '\''] {
      if let Some(key) = inner
        .strip_prefix(quote)
        .and_then(|rest| rest.strip_suffix(quote))
      {
        return Ok(Segment::Key(key.to_string()));
      }
    }
    inner
      .parse::<usize>()
      .map(Segment::Index)
      .map_err(|_| PathError::invalid(expr, format!("invalid index '{}'", inner)))
  }
}

/// A parsed path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
  segments: Vec<Segment>,
}

impl Path {
  pub fn parse(expr: &str) -> Result<Self, PathError> {
    let trimmed = expr.trim();
    let body = if trimmed == "$" {
      ""
    } else if let Some(rest) = trimmed.strip_prefix("$.") {
      rest
    } else if trimmed.starts_with("$[") {
      &trimmed[1..]
    } else {
      trimmed
    };

    let mut segments = Vec::new();
    if body.is_empty() {
      return Ok(Self { segments });
    }

    let mut chars = body.chars();
    let mut key = String::new();
    let mut after_bracket = false;

    while let Some(c) = chars.next() {
      match c {
        '\\' => {
          let escaped = chars
            .next()
            .ok_or_else(|| PathError::invalid(expr, "trailing escape"))?;
          key.push(escaped);
          after_bracket = false;
        }
        '.' => {
          if !key.is_empty() {
            segments.push(Segment::from_key(std::mem::take(&mut key)));
          } else if !after_bracket {
            return Err(PathError::invalid(expr, "empty key"));
          }
          after_bracket = false;
        }
        '[' => {
          if !key.is_empty() {
            segments.push(Segment::from_key(std::mem::take(&mut key)));
          }
          let mut inner = String::new();
          loop {
            match chars.next() {
              Some(']') => break,
              Some(ch) => inner.push(ch),
              None => return Err(PathError::invalid(expr, "unclosed '['")),
            }
          }
          segments.push(Segment::from_bracket(expr, &inner)?);
          after_bracket = true;
        }
        _ => {
          key.push(c);
          after_bracket = false;
        }
      }
    }

    if !key.is_empty() {
      segments.push(Segment::from_key(key));
    } else if !after_bracket {
      return Err(PathError::invalid(expr, "empty key"));
    }

    Ok(Self { segments })
  }

  pub fn is_root(&self) -> bool {
    self.segments.is_empty()
  }

  pub fn segments(&self) -> &[Segment] {
    &self.segments
  }

  /// Look up the value at this path.
  pub fn get<'a>(&self, doc: &'a Value) -> Option<&'a Value> {
    let mut current = doc;
    for segment in &self.segments {
      current = match (segment, current) {
        (Segment::Key(key), Value::Object(map)) => map.get(key)?,
        (Segment::Index(index), Value::Object(map)) => map.get(&index.to_string())?,
        (Segment::Index(index), Value::Array(items)) => items.get(*index)?,
        _ => return None,
      };
    }
    Some(current)
  }

  /// Walk to this path, creating missing objects and arrays on the way.
  ///
  /// A missing destination is created as `null`. Arrays are padded with
  /// `null` up to the requested index, adding at most [`MAX_ARRAY_PADDING`]
  /// elements.
  pub fn slot<'a>(&self, doc: &'a mut Value) -> Result<&'a mut Value, PathError> {
    let mut current = doc;
    for segment in &self.segments {
      if current.is_null() {
        *current = match segment {
          Segment::Key(_) => Value::Object(Map::new()),
          Segment::Index(_) => Value::Array(Vec::new()),
        };
      }
      current = match (segment, current) {
        (Segment::Key(key), Value::Object(map)) => map.entry(key.clone()).or_insert(Value::Null),
        (Segment::Index(index), Value::Object(map)) => {
          map.entry(index.to_string()).or_insert(Value::Null)
        }
        (Segment::Index(index), Value::Array(items)) => {
          if items.len() <= *index {
            let len = index
              .checked_add(1)
              .filter(|len| len - items.len() <= MAX_ARRAY_PADDING)
              .ok_or_else(|| PathError::IndexTooLarge {
                path: self.to_string(),
                index: *index,
              })?;
            items.resize(len, Value::Null);
          }
          &mut items[*index]
        }
        (_, other) => {
          return Err(PathError::NotTraversable {
            path: self.to_string(),
            found: kind_name(other),
          });
        }
      };
    }
    Ok(current)
  }

  /// Replace the value at this path.
  pub fn set(&self, doc: &mut Value, value: Value) -> Result<(), PathError> {
    *self.slot(doc)? = value;
    Ok(())
  }
}

impl FromStr for Path {
  type Err = PathError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}

impl fmt::Display for Path {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("$")?;
    for segment in &self.segments {
      match segment {
        Segment::Key(key) => {
          f.write_str(".")?;
          for c in key.chars() {
            if matches!(c, '.' | '[' | '\\') {
              f.write_str("\\")?;
            }
            write!(f, "{}", c)?;
          }
        }
        Segment::Index(index) => write!(f, "[{}]", index)?,
      }
    }
    Ok(())
  }
}

/// Human-readable name of a JSON value's type.
pub(crate) fn kind_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn key(k: &str) -> Segment {
    Segment::Key(k.to_string())
  }

  #[test]
  fn test_parse_forms() {
    assert!(Path::parse("$").unwrap().is_root());
    assert!(Path::parse("").unwrap().is_root());
    assert_eq!(Path::parse("$.amount").unwrap().segments(), &[key("amount")]);
    assert_eq!(
      Path::parse("order.items[1].sku").unwrap().segments(),
      &[key("order"), key("items"), Segment::Index(1), key("sku")]
    );
    assert_eq!(
      Path::parse("order.items.1").unwrap().segments(),
      &[key("order"), key("items"), Segment::Index(1)]
    );
    assert_eq!(Path::parse("$[2]").unwrap().segments(), &[Segment::Index(2)]);
  }

  #[test]
  fn test_parse_escapes_and_quotes() {
    assert_eq!(
      Path::parse(r"labels.app\.kubernetes\.io/name").unwrap().segments(),
      &[key("labels"), key("app.kubernetes.io/name")]
    );
    assert_eq!(
      Path::parse(r#"headers["Content-Type"]"#).unwrap().segments(),
      &[key("headers"), key("Content-Type")]
    );
    assert_eq!(
      Path::parse("a['0']").unwrap().segments(),
      &[key("a"), key("0")]
    );
  }

  #[test]
  fn test_parse_errors() {
    assert!(Path::parse("a..b").is_err());
    assert!(Path::parse("a.").is_err());
    assert!(Path::parse("a[x]").is_err());
    assert!(Path::parse("a[1").is_err());
    assert!(Path::parse(r"a\").is_err());
  }

  #[test]
  fn test_display_round_trips() {
    let path = Path::parse(r"a.b\.c[3]").unwrap();
    assert_eq!(path.to_string(), r"$.a.b\.c[3]");
    assert_eq!(Path::parse(&path.to_string()).unwrap(), path);
  }

  #[test]
  fn test_get() {
    let doc = json!({ "a": { "b": [10, 20, { "c": true }] }, "m": { "0": "zero" } });
    assert_eq!(Path::parse("a.b[1]").unwrap().get(&doc), Some(&json!(20)));
    assert_eq!(Path::parse("a.b.2.c").unwrap().get(&doc), Some(&json!(true)));
    assert_eq!(Path::parse("m.0").unwrap().get(&doc), Some(&json!("zero")));
    assert_eq!(Path::parse("$").unwrap().get(&doc), Some(&doc));
    assert_eq!(Path::parse("a.x").unwrap().get(&doc), None);
    assert_eq!(Path::parse("a.b[9]").unwrap().get(&doc), None);
    assert_eq!(Path::parse("a.b.c").unwrap().get(&doc), None);
  }

  #[test]
  fn test_set_creates_structure() {
    let mut doc = json!({});
    Path::parse("a.b[2].c").unwrap().set(&mut doc, json!(1)).unwrap();
    assert_eq!(doc, json!({ "a": { "b": [null, null, { "c": 1 }] } }));
  }

  #[test]
  fn test_set_root_replaces_document() {
    let mut doc = json!({ "old": true });
    Path::parse("$").unwrap().set(&mut doc, json!([1])).unwrap();
    assert_eq!(doc, json!([1]));
  }

  #[test]
  fn test_set_through_scalar_fails() {
    let mut doc = json!({ "a": 5 });
    let err = Path::parse("a.b").unwrap().set(&mut doc, json!(1)).unwrap_err();
    assert_eq!(
      err,
      PathError::NotTraversable {
        path: "$.a.b".to_string(),
        found: "a number"
      }
    );
  }

  #[test]
  fn test_set_rejects_oversized_index() {
    for expr in ["list[18446744073709551615]", "list[4000000000]"] {
      let mut doc = json!({});
      let err = Path::parse(expr).unwrap().set(&mut doc, json!(1)).unwrap_err();
      assert!(matches!(err, PathError::IndexTooLarge { .. }), "{}", expr);
      assert_eq!(doc, json!({ "list": [] }));
    }
  }

  #[test]
  fn test_set_pads_up_to_limit() {
    let mut doc = json!({ "list": [0] });
    let index = MAX_ARRAY_PADDING;
    Path::parse(&format!("list[{}]", index))
      .unwrap()
      .set(&mut doc, json!("last"))
      .unwrap();
    let items = doc["list"].as_array().unwrap();
    assert_eq!(items.len(), index + 1);
    assert_eq!(items[index], json!("last"));

    let len = items.len();
    let err = Path::parse(&format!("list[{}]", len + MAX_ARRAY_PADDING))
      .unwrap()
      .set(&mut doc, json!(1))
      .unwrap_err();
    assert!(matches!(err, PathError::IndexTooLarge { .. }));
  }
}
