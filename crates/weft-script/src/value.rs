//! Loose-typing rules for JSON values.
//!
//! Operators follow dynamic-language semantics: `+` concatenates when either
//! side is a string, arithmetic coerces to numbers, and truthiness treats
//! `undefined`, `null`, `false`, `0` and `""` as false. `None` is `undefined`.
//!
//! JSON cannot hold NaN or infinities, so non-finite arithmetic results
//! become `null`.

use serde_json::Value;

/// Largest integer that survives a round trip through `f64`.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

pub fn truthy(value: Option<&Value>) -> bool {
  match value {
    None | Some(Value::Null) => false,
    Some(Value::Bool(b)) => *b,
    Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
    Some(Value::String(s)) => !s.is_empty(),
    Some(Value::Array(_)) | Some(Value::Object(_)) => true,
  }
}

pub fn to_number(value: Option<&Value>) -> f64 {
  match value {
    None => f64::NAN,
    Some(Value::Null) => 0.0,
    Some(Value::Bool(b)) => {
      if *b {
        1.0
      } else {
        0.0
      }
    }
    Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
    Some(Value::String(s)) => parse_number(s),
    Some(Value::Array(items)) => match items.as_slice() {
      [] => 0.0,
      [single] => to_number(Some(single)),
      _ => f64::NAN,
    },
    Some(Value::Object(_)) => f64::NAN,
  }
}

fn parse_number(s: &str) -> f64 {
  let trimmed = s.trim();
  if trimmed.is_empty() {
    return 0.0;
  }
  match trimmed {
    "Infinity" | "+Infinity" => return f64::INFINITY,
    "-Infinity" => return f64::NEG_INFINITY,
    _ => {}
  }
  // Rust also accepts "inf" and "nan", which are not numbers here.
  if trimmed
    .chars()
    .any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E')
  {
    return f64::NAN;
  }
  trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// Convert an `f64` back to a JSON value, preferring an integer
/// representation when the value is integral.
pub fn number_value(n: f64) -> Value {
  if !n.is_finite() {
    return Value::Null;
  }
  if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
    return Value::from(n as i64);
  }
  serde_json::Number::from_f64(n)
    .map(Value::Number)
    .unwrap_or(Value::Null)
}

fn format_number(n: f64) -> String {
  if n.is_nan() {
    "NaN".to_string()
  } else if n.is_infinite() {
    let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
    text.to_string()
  } else if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
    format!("{}", n as i64)
  } else {
    format!("{}", n)
  }
}

/// String conversion used by templates and string concatenation.
pub fn to_display(value: Option<&Value>) -> String {
  match value {
    None => "undefined".to_string(),
    Some(Value::Null) => "null".to_string(),
    Some(Value::Bool(b)) => b.to_string(),
    Some(Value::Number(n)) => format_number(n.as_f64().unwrap_or(f64::NAN)),
    Some(Value::String(s)) => s.clone(),
    Some(Value::Array(items)) => items
      .iter()
      .map(|item| match item {
        Value::Null => String::new(),
        other => to_display(Some(other)),
      })
      .collect::<Vec<_>>()
      .join(","),
    Some(Value::Object(_)) => "[object Object]".to_string(),
  }
}

pub fn type_of(value: Option<&Value>) -> &'static str {
  match value {
    None => "undefined",
    Some(Value::Bool(_)) => "boolean",
    Some(Value::Number(_)) => "number",
    Some(Value::String(_)) => "string",
    Some(Value::Null) | Some(Value::Array(_)) | Some(Value::Object(_)) => "object",
  }
}

/// Strict equality. Numbers compare by value regardless of their JSON
/// representation; arrays and objects compare structurally.
pub fn strict_equals(left: Option<&Value>, right: Option<&Value>) -> bool {
  match (left, right) {
    (None, None) => true,
    (Some(l), Some(r)) => json_equals(l, r),
    _ => false,
  }
}

fn json_equals(left: &Value, right: &Value) -> bool {
  match (left, right) {
    (Value::Number(l), Value::Number(r)) => l.as_f64() == r.as_f64(),
    (Value::Array(l), Value::Array(r)) => {
      l.len() == r.len() && l.iter().zip(r).all(|(a, b)| json_equals(a, b))
    }
    (Value::Object(l), Value::Object(r)) => {
      l.len() == r.len()
        && l
          .iter()
          .all(|(k, v)| r.get(k).is_some_and(|other| json_equals(v, other)))
    }
    (l, r) => l == r,
  }
}

/// Arrays and objects become their string form; everything else is kept.
pub(crate) fn to_primitive(value: Option<&Value>) -> Option<Value> {
  match value {
    Some(Value::Array(_)) | Some(Value::Object(_)) => Some(Value::String(to_display(value))),
    other => other.cloned(),
  }
}

/// Integer conversion used by bitwise operators.
pub(crate) fn to_int32(n: f64) -> i32 {
  if !n.is_finite() {
    return 0;
  }
  const TWO_32: f64 = 4_294_967_296.0;
  let wrapped = n.trunc().rem_euclid(TWO_32);
  if wrapped >= TWO_32 / 2.0 {
    (wrapped - TWO_32) as i32
  } else {
    wrapped as i32
  }
}
