use serde_json::{Value, json};
use weft_script::{Interpreter, InterpreterOptions, ScriptDefinition, ScriptError};

fn script(value: Value) -> ScriptDefinition {
  ScriptDefinition::from_value(value).unwrap()
}

fn run(def: &ScriptDefinition, name: &str, args: &[Value]) -> Result<Option<Value>, ScriptError> {
  Interpreter::new().run_function(def, name, args)
}

#[test]
fn test_arithmetic_function() {
  let def = script(json!({
    "functions": [{
      "name": "calc",
      "params": [{ "name": "a" }, { "name": "b" }],
      "body": [{
        "type": "return",
        "value": {
          "type": "object_literal",
          "properties": {
            "sum": { "type": "binary_expression", "operator": "+", "left": "$ref:params.a", "right": "$ref:params.b" },
            "diff": { "type": "binary_expression", "operator": "-", "left": "$ref:params.a", "right": "$ref:params.b" }
          }
        }
      }]
    }]
  }));

  let result = run(&def, "calc", &[json!(2), json!(3)]).unwrap();
  assert_eq!(result, Some(json!({ "sum": 5, "diff": -1 })));
}

#[test]
fn test_greeting_template() {
  let def = script(json!({
    "functions": [{
      "name": "greet",
      "params": [{ "name": "who" }],
      "body": [
        { "type": "const_declaration", "name": "name", "value": "$ref:params.who" },
        { "type": "return", "value": { "type": "template_literal", "template": "hi ${name}" } }
      ]
    }]
  }));

  assert_eq!(run(&def, "greet", &[json!("Ann")]).unwrap(), Some(json!("hi Ann")));
  assert_eq!(run(&def, "greet", &[]).unwrap(), Some(json!("hi ")));
}

#[test]
fn test_reassign_const() {
  let def = script(json!({
    "functions": [{
      "name": "main",
      "body": [
        { "type": "const_declaration", "name": "x", "value": 5 },
        {
          "type": "assignment",
          "target": "$ref:local.x",
          "value": { "type": "binary_expression", "operator": "+", "left": "$ref:local.x", "right": 1 }
        },
        { "type": "return", "value": "$ref:local.x" }
      ]
    }]
  }));

  assert_eq!(run(&def, "main", &[]).unwrap(), Some(json!(6)));
}

#[test]
fn test_find_first_match() {
  let def = script(json!({
    "functions": [{
      "name": "find",
      "params": [{ "name": "items" }, { "name": "wanted" }],
      "body": [
        {
          "type": "for_each_loop",
          "iterator": "item",
          "iterable": "$ref:params.items",
          "body": [{
            "type": "if_statement",
            "condition": {
              "type": "binary_expression",
              "operator": "===",
              "left": { "type": "member_access", "object": "$ref:local.item", "property": "id" },
              "right": "$ref:params.wanted"
            },
            "then": [{ "type": "return", "value": "$ref:local.item" }]
          }]
        },
        { "type": "return", "value": null }
      ]
    }]
  }));

  let items = json!([{ "id": 1, "v": "a" }, { "id": 2, "v": "b" }, { "id": 2, "v": "c" }]);
  assert_eq!(
    run(&def, "find", &[items.clone(), json!(2)]).unwrap(),
    Some(json!({ "id": 2, "v": "b" }))
  );
  assert_eq!(run(&def, "find", &[items, json!(9)]).unwrap(), Some(json!(null)));
}

#[test]
fn test_defaults_from_constants() {
  let def = script(json!({
    "constants": [{ "name": "LIMIT", "value": 10 }],
    "functions": [{
      "name": "limit",
      "params": [
        { "name": "limit", "default": "$ref:constants.LIMIT" },
        { "name": "double", "default": {
          "type": "binary_expression", "operator": "*", "left": "$ref:params.limit", "right": 2
        } },
        { "name": "extra" }
      ],
      "body": [{
        "type": "return",
        "value": {
          "type": "array_literal",
          "elements": [
            "$ref:params.limit",
            "$ref:params.double",
            { "type": "unary_expression", "operator": "typeof", "argument": "$ref:params.extra" }
          ]
        }
      }]
    }]
  }));

  assert_eq!(run(&def, "limit", &[]).unwrap(), Some(json!([10, 20, "undefined"])));
  assert_eq!(run(&def, "limit", &[json!(3)]).unwrap(), Some(json!([3, 6, "undefined"])));
}

#[test]
fn test_try_catch_finally() {
  let def = script(json!({
    "functions": [{
      "name": "safe_parse",
      "params": [{ "name": "text" }],
      "body": [
        { "type": "let_declaration", "name": "log", "value": "start" },
        {
          "type": "try_catch",
          "try": [{
            "type": "return",
            "value": {
              "type": "call_expression",
              "callee": "$ref:functions.json.parse",
              "args": ["$ref:params.text"]
            }
          }],
          "catch": {
            "body": [{
              "type": "return",
              "value": {
                "type": "object_literal",
                "properties": { "failed": "$ref:catch.err.name" }
              }
            }]
          },
          "finally": [{ "type": "comment", "text": "nothing to release" }]
        }
      ]
    }]
  }));

  assert_eq!(
    run(&def, "safe_parse", &[json!("{\"a\":1}")]).unwrap(),
    Some(json!({ "a": 1 }))
  );
  assert_eq!(
    run(&def, "safe_parse", &[json!("{")]).unwrap(),
    Some(json!({ "failed": "SyntaxError" }))
  );
}

#[test]
fn test_no_return_is_undefined() {
  let def = script(json!({
    "functions": [{ "name": "noop", "body": [{ "type": "comment", "text": "empty" }] }]
  }));
  assert_eq!(run(&def, "noop", &[]).unwrap(), None);
}

#[test]
fn test_function_not_found() {
  let def = script(json!({ "functions": [] }));
  let err = run(&def, "missing", &[]).unwrap_err();
  assert_eq!(
    err,
    ScriptError::FunctionNotFound {
      name: "missing".to_string()
    }
  );
  assert_eq!(err.to_string(), "Function not found: missing");
}

#[test]
fn test_strict_and_permissive_unknown_kinds() {
  let def = script(json!({
    "functions": [{
      "name": "main",
      "body": [
        { "type": "let_declaration", "name": "x", "value": { "type": "arrow_function" } },
        { "type": "return", "value": { "type": "unary_expression", "operator": "typeof", "argument": "$ref:local.x" } }
      ]
    }]
  }));

  let err = run(&def, "main", &[]).unwrap_err();
  assert!(matches!(err, ScriptError::UnknownExpressionKind { ref kind } if kind == "arrow_function"));

  let permissive = Interpreter::new().with_options(InterpreterOptions {
    strict_kinds: false,
  });
  assert_eq!(
    permissive.run_function(&def, "main", &[]).unwrap(),
    Some(json!("undefined"))
  );
}

#[test]
fn test_custom_native_function() {
  let mut interpreter = Interpreter::new();
  interpreter
    .functions_mut()
    .register("tax", |args: &[Value]| {
      let amount = args.first().and_then(Value::as_f64).unwrap_or(0.0);
      Ok(json!(amount * 0.25))
    });

  let def = script(json!({
    "functions": [{
      "name": "main",
      "params": [{ "name": "amount" }],
      "body": [{
        "type": "return",
        "value": { "type": "call_expression", "callee": "$ref:functions.tax", "args": ["$ref:params.amount"] }
      }]
    }]
  }));

  assert_eq!(
    interpreter.run_function(&def, "main", &[json!(100)]).unwrap(),
    Some(json!(25.0))
  );
}
