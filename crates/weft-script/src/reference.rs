//! `"$ref:a.b.c"` reference resolution.
//!
//! A reference is a string in a definition that points at a value in the
//! surrounding context instead of embedding it. The path after the prefix is
//! split on `.` and walked one segment at a time; walking into anything that
//! is not an object or array yields `undefined` (`None`).

use std::borrow::Cow;

use serde_json::Value;

pub const REF_PREFIX: &str = "$ref:";

/// A root that references are resolved against.
pub trait Scope {
  /// Look up a dotted path, already split into segments.
  fn lookup(&self, segments: &[&str]) -> Option<Cow<'_, Value>>;
}

impl Scope for Value {
  fn lookup(&self, segments: &[&str]) -> Option<Cow<'_, Value>> {
    walk(self, segments)
  }
}

impl Scope for serde_json::Map<String, Value> {
  fn lookup(&self, segments: &[&str]) -> Option<Cow<'_, Value>> {
    let (first, rest) = segments.split_first()?;
    walk(self.get(*first)?, rest)
  }
}

/// The path of a reference string, without its prefix.
pub fn reference_path(value: &Value) -> Option<&str> {
  value.as_str()?.strip_prefix(REF_PREFIX)
}

/// Resolve `reference` against `scope`.
///
/// Anything that is not a `"$ref:"` string is returned unchanged.
pub fn resolve<S: Scope + ?Sized>(reference: &Value, scope: &S) -> Option<Value> {
  match reference_path(reference) {
    Some(path) => lookup_path(path, scope).map(Cow::into_owned),
    None => Some(reference.clone()),
  }
}

/// Walk a dotted path (without the prefix) through `scope`.
pub fn lookup_path<'a, S: Scope + ?Sized>(path: &str, scope: &'a S) -> Option<Cow<'a, Value>> {
  let segments: Vec<&str> = path.split('.').collect();
  scope.lookup(&segments)
}

/// Walk `segments` starting at `start`.
pub(crate) fn walk<'a>(start: &'a Value, segments: &[&str]) -> Option<Cow<'a, Value>> {
  let mut current = start;
  for (i, segment) in segments.iter().enumerate() {
    match current {
      Value::Object(map) => current = map.get(*segment)?,
      Value::Array(items) => {
        if *segment == "length" && i + 1 == segments.len() {
          return Some(Cow::Owned(Value::from(items.len())));
        }
        current = segment
          .parse::<usize>()
          .ok()
          .and_then(|idx| items.get(idx))?;
      }
      _ => return None,
    }
  }
  Some(Cow::Borrowed(current))
}
