//! Expression evaluation.

use std::cmp::Ordering;

use serde_json::{Map, Value};
use tracing::warn;

use crate::ast::{BinaryOp, Expression, LogicalOp, Property, UnaryOp};
use crate::context::ExecutionContext;
use crate::error::ScriptError;
use crate::interpreter::Interpreter;
use crate::reference::{REF_PREFIX, lookup_path, resolve};
use crate::value::{
  number_value, strict_equals, to_display, to_int32, to_number, to_primitive, truthy, type_of,
};

/// Namespace prefix of callee references.
const FUNCTIONS_PREFIX: &str = "functions.";

impl Interpreter {
  /// Evaluate an expression. `Ok(None)` is `undefined`.
  ///
  /// Member access on a non-object and calls to unbound functions yield
  /// `undefined` rather than an error.
  pub fn evaluate(
    &self,
    expr: &Expression,
    ctx: &ExecutionContext,
  ) -> Result<Option<Value>, ScriptError> {
    match expr {
      Expression::Value(value) => Ok(resolve(value, ctx)),
      Expression::StringLiteral(s) => Ok(Some(Value::String(s.clone()))),
      Expression::NumberLiteral(n) => Ok(Some(Value::Number(n.clone()))),
      Expression::BooleanLiteral(b) => Ok(Some(Value::Bool(*b))),
      Expression::NullLiteral => Ok(Some(Value::Null)),
      Expression::Template(template) => Ok(Some(Value::String(render_template(template, ctx)))),

      Expression::Binary { op, left, right } => {
        let left = self.evaluate(left, ctx)?;
        let right = self.evaluate(right, ctx)?;
        Ok(Some(binary(*op, left.as_ref(), right.as_ref())))
      }

      Expression::Logical { op, left, right } => {
        let left = self.evaluate(left, ctx)?;
        let short_circuit = match op {
          LogicalOp::And => !truthy(left.as_ref()),
          LogicalOp::Or => truthy(left.as_ref()),
          LogicalOp::Coalesce => !matches!(left, None | Some(Value::Null)),
        };
        if short_circuit {
          Ok(left)
        } else {
          self.evaluate(right, ctx)
        }
      }

      Expression::Unary { op, argument } => {
        let argument = self.evaluate(argument, ctx)?;
        Ok(Some(unary(*op, argument.as_ref())))
      }

      Expression::Conditional {
        test,
        consequent,
        alternate,
      } => {
        let test = self.evaluate(test, ctx)?;
        if truthy(test.as_ref()) {
          self.evaluate(consequent, ctx)
        } else {
          self.evaluate(alternate, ctx)
        }
      }

      Expression::Member { object, property } => {
        let base = self.evaluate(object, ctx)?;
        let Some(base @ (Value::Object(_) | Value::Array(_))) = base else {
          return Ok(None);
        };
        let key = match property {
          Property::Named(name) => name.clone(),
          Property::Computed(expr) => {
            let key = self.evaluate(expr, ctx)?;
            to_display(key.as_ref())
          }
        };
        Ok(member(&base, &key))
      }

      Expression::Call { callee, args } => {
        let function = callee
          .strip_prefix(REF_PREFIX)
          .and_then(|path| path.strip_prefix(FUNCTIONS_PREFIX))
          .and_then(|name| self.functions.get(name));

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
          values.push(self.evaluate(arg, ctx)?.unwrap_or(Value::Null));
        }

        match function {
          Some(function) => function(&values).map(Some),
          None => Ok(None),
        }
      }

      Expression::Object(properties) => {
        let mut object = Map::new();
        for (key, expr) in properties {
          if let Some(value) = self.evaluate(expr, ctx)? {
            object.insert(key.clone(), value);
          }
        }
        Ok(Some(Value::Object(object)))
      }

      Expression::Array(elements) => {
        let mut items = Vec::with_capacity(elements.len());
        for expr in elements {
          items.push(self.evaluate(expr, ctx)?.unwrap_or(Value::Null));
        }
        Ok(Some(Value::Array(items)))
      }

      Expression::Unknown { kind } => {
        if self.options.strict_kinds {
          return Err(ScriptError::UnknownExpressionKind { kind: kind.clone() });
        }
        warn!(kind = %kind, "unknown expression kind evaluated as undefined");
        Ok(None)
      }
    }
  }
}

/// Substitute `${name}` placeholders with local variables. Unresolved
/// placeholders become the empty string.
fn render_template(template: &str, ctx: &ExecutionContext) -> String {
  let mut out = String::with_capacity(template.len());
  let mut rest = template;

  while let Some(start) = rest.find("${") {
    let after = &rest[start + 2..];
    match after.find('}') {
      Some(0) => {
        // `${}` is not a placeholder.
        out.push_str(&rest[..start + 3]);
        rest = &after[1..];
      }
      Some(end) => {
        out.push_str(&rest[..start]);
        let name = &after[..end];
        if let Some(value) = lookup_path(&format!("local.{}", name), ctx) {
          out.push_str(&to_display(Some(&*value)));
        }
        rest = &after[end + 1..];
      }
      None => break,
    }
  }

  out.push_str(rest);
  out
}

fn member(base: &Value, key: &str) -> Option<Value> {
  match base {
    Value::Object(map) => map.get(key).cloned(),
    Value::Array(items) => {
      if key == "length" {
        return Some(Value::from(items.len()));
      }
      key.parse::<usize>().ok().and_then(|i| items.get(i)).cloned()
    }
    _ => None,
  }
}

fn binary(op: BinaryOp, left: Option<&Value>, right: Option<&Value>) -> Value {
  match op {
    BinaryOp::Add => {
      let left = to_primitive(left);
      let right = to_primitive(right);
      if matches!(left, Some(Value::String(_))) || matches!(right, Some(Value::String(_))) {
        let mut s = to_display(left.as_ref());
        s.push_str(&to_display(right.as_ref()));
        Value::String(s)
      } else {
        number_value(to_number(left.as_ref()) + to_number(right.as_ref()))
      }
    }
    BinaryOp::Sub => number_value(to_number(left) - to_number(right)),
    BinaryOp::Mul => number_value(to_number(left) * to_number(right)),
    BinaryOp::Div => number_value(to_number(left) / to_number(right)),
    BinaryOp::Rem => number_value(to_number(left) % to_number(right)),
    BinaryOp::Eq => Value::Bool(strict_equals(left, right)),
    BinaryOp::NotEq => Value::Bool(!strict_equals(left, right)),
    BinaryOp::Lt => Value::Bool(matches!(compare(left, right), Some(Ordering::Less))),
    BinaryOp::Gt => Value::Bool(matches!(compare(left, right), Some(Ordering::Greater))),
    BinaryOp::LtEq => Value::Bool(matches!(
      compare(left, right),
      Some(Ordering::Less | Ordering::Equal)
    )),
    BinaryOp::GtEq => Value::Bool(matches!(
      compare(left, right),
      Some(Ordering::Greater | Ordering::Equal)
    )),
  }
}

/// Strings compare lexicographically; anything else numerically. `None`
/// when either side is not a number.
fn compare(left: Option<&Value>, right: Option<&Value>) -> Option<Ordering> {
  let left = to_primitive(left);
  let right = to_primitive(right);
  if let (Some(Value::String(l)), Some(Value::String(r))) = (&left, &right) {
    return Some(l.cmp(r));
  }
  to_number(left.as_ref()).partial_cmp(&to_number(right.as_ref()))
}

fn unary(op: UnaryOp, argument: Option<&Value>) -> Value {
  match op {
    UnaryOp::Not => Value::Bool(!truthy(argument)),
    UnaryOp::Neg => number_value(-to_number(argument)),
    UnaryOp::Plus => number_value(to_number(argument)),
    UnaryOp::BitNot => Value::from(!to_int32(to_number(argument))),
    UnaryOp::TypeOf => Value::String(type_of(argument).to_string()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::interpreter::InterpreterOptions;
  use serde_json::json;

  fn eval(expr: Value, ctx: &ExecutionContext) -> Option<Value> {
    let expr = Expression::from_value(expr).unwrap();
    Interpreter::new().evaluate(&expr, ctx).unwrap()
  }

  fn binary_expr(op: &str, left: Value, right: Value) -> Value {
    json!({ "type": "binary_expression", "operator": op, "left": left, "right": right })
  }

  #[test]
  fn test_literals() {
    let ctx = ExecutionContext::new();
    assert_eq!(
      eval(json!({ "type": "string_literal", "value": "hi" }), &ctx),
      Some(json!("hi"))
    );
    assert_eq!(
      eval(json!({ "type": "number_literal", "value": 1.5 }), &ctx),
      Some(json!(1.5))
    );
    assert_eq!(
      eval(json!({ "type": "boolean_literal", "value": true }), &ctx),
      Some(json!(true))
    );
    assert_eq!(eval(json!({ "type": "null_literal" }), &ctx), Some(json!(null)));
  }

  #[test]
  fn test_arithmetic() {
    let ctx = ExecutionContext::new();
    assert_eq!(eval(binary_expr("+", json!(2), json!(3)), &ctx), Some(json!(5)));
    assert_eq!(eval(binary_expr("-", json!(2), json!(3)), &ctx), Some(json!(-1)));
    assert_eq!(eval(binary_expr("*", json!(4), json!(2.5)), &ctx), Some(json!(10)));
    assert_eq!(eval(binary_expr("/", json!(5), json!(2)), &ctx), Some(json!(2.5)));
    assert_eq!(eval(binary_expr("%", json!(-7), json!(3)), &ctx), Some(json!(-1)));
    assert_eq!(eval(binary_expr("/", json!(1), json!(0)), &ctx), Some(json!(null)));
  }

  #[test]
  fn test_string_concatenation() {
    let ctx = ExecutionContext::new();
    assert_eq!(
      eval(binary_expr("+", json!("a"), json!(1)), &ctx),
      Some(json!("a1"))
    );
    assert_eq!(
      eval(binary_expr("+", json!(1), json!("2")), &ctx),
      Some(json!("12"))
    );
    assert_eq!(
      eval(binary_expr("+", json!([1, 2]), json!(3)), &ctx),
      Some(json!("1,23"))
    );
  }

  #[test]
  fn test_comparisons() {
    let ctx = ExecutionContext::new();
    assert_eq!(eval(binary_expr("===", json!(1), json!(1.0)), &ctx), Some(json!(true)));
    assert_eq!(eval(binary_expr("==", json!(1), json!("1")), &ctx), Some(json!(false)));
    assert_eq!(eval(binary_expr("!=", json!("a"), json!("b")), &ctx), Some(json!(true)));
    assert_eq!(eval(binary_expr("<", json!(2), json!(10)), &ctx), Some(json!(true)));
    assert_eq!(eval(binary_expr("<", json!("2"), json!("10")), &ctx), Some(json!(false)));
    assert_eq!(eval(binary_expr(">=", json!(3), json!(3)), &ctx), Some(json!(true)));
    assert_eq!(
      eval(binary_expr("<=", json!("$ref:local.missing"), json!(3)), &ctx),
      Some(json!(false))
    );
  }

  #[test]
  fn test_logical_short_circuit() {
    let ctx = ExecutionContext::new();
    // The right side would fail in strict mode if it were evaluated.
    let unknown = json!({ "type": "bogus" });
    assert_eq!(
      eval(
        json!({ "type": "logical_expression", "operator": "&&", "left": 0, "right": unknown }),
        &ctx
      ),
      Some(json!(0))
    );
    assert_eq!(
      eval(
        json!({ "type": "logical_expression", "operator": "or", "left": "x", "right": unknown }),
        &ctx
      ),
      Some(json!("x"))
    );
    assert_eq!(
      eval(
        json!({ "type": "logical_expression", "operator": "??", "left": null, "right": 7 }),
        &ctx
      ),
      Some(json!(7))
    );
    assert_eq!(
      eval(
        json!({ "type": "logical_expression", "operator": "??", "left": 0, "right": 7 }),
        &ctx
      ),
      Some(json!(0))
    );
  }

  #[test]
  fn test_unary() {
    let ctx = ExecutionContext::new().with_local("n", json!("5"));
    let unary = |op: &str, arg: Value| json!({ "type": "unary_expression", "operator": op, "argument": arg });
    assert_eq!(eval(unary("!", json!(0)), &ctx), Some(json!(true)));
    assert_eq!(eval(unary("not", json!("x")), &ctx), Some(json!(false)));
    assert_eq!(eval(unary("-", json!("$ref:local.n")), &ctx), Some(json!(-5)));
    assert_eq!(eval(unary("+", json!("$ref:local.n")), &ctx), Some(json!(5)));
    assert_eq!(eval(unary("~", json!(5)), &ctx), Some(json!(-6)));
    assert_eq!(eval(unary("typeof", json!("$ref:local.nope")), &ctx), Some(json!("undefined")));
    assert_eq!(eval(unary("typeof", json!("$ref:local.n")), &ctx), Some(json!("string")));
  }

  #[test]
  fn test_conditional_evaluates_one_branch() {
    let ctx = ExecutionContext::new();
    let expr = json!({
      "type": "conditional_expression",
      "test": true,
      "consequent": "yes",
      "alternate": { "type": "bogus" }
    });
    assert_eq!(eval(expr, &ctx), Some(json!("yes")));
  }

  #[test]
  fn test_template_literal() {
    let template = json!({ "type": "template_literal", "template": "hi ${name}" });

    let ctx = ExecutionContext::new().with_local("name", json!("Ann"));
    assert_eq!(eval(template.clone(), &ctx), Some(json!("hi Ann")));

    let ctx = ExecutionContext::new();
    assert_eq!(eval(template, &ctx), Some(json!("hi ")));
  }

  #[test]
  fn test_template_nested_paths_and_edges() {
    let ctx = ExecutionContext::new()
      .with_local("user", json!({ "name": "Bo", "age": 30 }))
      .with_local("none", json!(null));
    let render = |t: &str| eval(json!({ "type": "template_literal", "template": t }), &ctx);
    assert_eq!(render("${user.name} is ${user.age}"), Some(json!("Bo is 30")));
    assert_eq!(render("${none}"), Some(json!("null")));
    assert_eq!(render("cost: ${} ${unclosed"), Some(json!("cost: ${} ${unclosed")));
  }

  #[test]
  fn test_member_access() {
    let ctx = ExecutionContext::new()
      .with_local("user", json!({ "name": "Ann", "tags": ["a", "b"] }))
      .with_local("key", json!("name"))
      .with_local("i", json!(1));

    let named = json!({ "type": "member_access", "object": "$ref:local.user", "property": "name" });
    assert_eq!(eval(named, &ctx), Some(json!("Ann")));

    let computed = json!({
      "type": "member_access",
      "object": "$ref:local.user",
      "property": "$ref:local.key",
      "computed": true
    });
    assert_eq!(eval(computed, &ctx), Some(json!("Ann")));

    let index = json!({
      "type": "member_access",
      "object": { "type": "member_access", "object": "$ref:local.user", "property": "tags" },
      "property": "$ref:local.i",
      "computed": true
    });
    assert_eq!(eval(index, &ctx), Some(json!("b")));

    let on_scalar = json!({ "type": "member_access", "object": "$ref:local.key", "property": "length" });
    assert_eq!(eval(on_scalar, &ctx), None);
  }

  #[test]
  fn test_call_expression() {
    let ctx = ExecutionContext::new().with_local("name", json!("ann"));
    let call = json!({
      "type": "call_expression",
      "callee": "$ref:functions.string.upper",
      "args": ["$ref:local.name"]
    });
    assert_eq!(eval(call, &ctx), Some(json!("ANN")));

    let missing = json!({ "type": "call_expression", "callee": "$ref:functions.nope", "args": [] });
    assert_eq!(eval(missing, &ctx), None);
  }

  #[test]
  fn test_call_propagates_throw() {
    let expr = Expression::from_value(json!({
      "type": "call_expression",
      "callee": "$ref:functions.error",
      "args": ["bad"]
    }))
    .unwrap();
    let err = Interpreter::new()
      .evaluate(&expr, &ExecutionContext::new())
      .unwrap_err();
    assert!(err.is_catchable());
  }

  #[test]
  fn test_object_and_array_literals() {
    let ctx = ExecutionContext::new().with_local("x", json!(1));
    let object = json!({
      "type": "object_literal",
      "properties": { "a": "$ref:local.x", "gone": "$ref:local.missing" }
    });
    assert_eq!(eval(object, &ctx), Some(json!({ "a": 1 })));

    let array = json!({
      "type": "array_literal",
      "elements": [ "$ref:local.x", "$ref:local.missing", { "type": "string_literal", "value": "s" } ]
    });
    assert_eq!(eval(array, &ctx), Some(json!([1, null, "s"])));
  }

  #[test]
  fn test_unknown_kind_strict_and_permissive() {
    let expr = Expression::from_value(json!({ "type": "regex_literal" })).unwrap();
    let ctx = ExecutionContext::new();

    let err = Interpreter::new().evaluate(&expr, &ctx).unwrap_err();
    assert_eq!(
      err,
      ScriptError::UnknownExpressionKind {
        kind: "regex_literal".to_string()
      }
    );

    let permissive =
      Interpreter::new().with_options(InterpreterOptions { strict_kinds: false });
    assert_eq!(permissive.evaluate(&expr, &ctx).unwrap(), None);
  }
}
