//! Expression and statement trees.
//!
//! Definitions arrive as JSON objects discriminated by a `type` field. They
//! are parsed once into these enums; evaluation then matches exhaustively
//! instead of dispatching on strings. Unrecognized `type` values parse into
//! the `Unknown` variants so the interpreter can decide, per its options,
//! whether they are an error or a silent `undefined`.
//!
//! A bare JSON scalar where an expression is expected (`5`, `"text"`,
//! `"$ref:local.x"`) parses as [`Expression::Value`] and goes through the
//! reference resolver when evaluated.

use std::collections::BTreeMap;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::reference::REF_PREFIX;

const EXPRESSION_KINDS: &[&str] = &[
  "string_literal",
  "number_literal",
  "boolean_literal",
  "null_literal",
  "template_literal",
  "binary_expression",
  "logical_expression",
  "unary_expression",
  "conditional_expression",
  "member_access",
  "call_expression",
  "object_literal",
  "array_literal",
];

const STATEMENT_KINDS: &[&str] = &[
  "const_declaration",
  "let_declaration",
  "assignment",
  "if_statement",
  "return",
  "try_catch",
  "call_expression",
  "for_each_loop",
  "comment",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
  #[serde(rename = "+")]
  Add,
  #[serde(rename = "-")]
  Sub,
  #[serde(rename = "*")]
  Mul,
  #[serde(rename = "/")]
  Div,
  #[serde(rename = "%")]
  Rem,
  #[serde(rename = "===", alias = "==")]
  Eq,
  #[serde(rename = "!==", alias = "!=")]
  NotEq,
  #[serde(rename = "<")]
  Lt,
  #[serde(rename = ">")]
  Gt,
  #[serde(rename = "<=")]
  LtEq,
  #[serde(rename = ">=")]
  GtEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
  #[serde(rename = "&&", alias = "and")]
  And,
  #[serde(rename = "||", alias = "or")]
  Or,
  #[serde(rename = "??")]
  Coalesce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
  #[serde(rename = "!", alias = "not")]
  Not,
  #[serde(rename = "-")]
  Neg,
  #[serde(rename = "+")]
  Plus,
  #[serde(rename = "~")]
  BitNot,
  #[serde(rename = "typeof")]
  TypeOf,
}

/// Property selector of a member access.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
  /// `object.name`
  Named(String),
  /// `object[expr]`
  Computed(Box<Expression>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
  /// Bare JSON value; `"$ref:"` strings are resolved at evaluation time.
  Value(Value),
  StringLiteral(String),
  NumberLiteral(serde_json::Number),
  BooleanLiteral(bool),
  NullLiteral,
  /// Text with `${name}` placeholders looked up in local variables.
  Template(String),
  Binary {
    op: BinaryOp,
    left: Box<Expression>,
    right: Box<Expression>,
  },
  Logical {
    op: LogicalOp,
    left: Box<Expression>,
    right: Box<Expression>,
  },
  Unary {
    op: UnaryOp,
    argument: Box<Expression>,
  },
  Conditional {
    test: Box<Expression>,
    consequent: Box<Expression>,
    alternate: Box<Expression>,
  },
  Member {
    object: Box<Expression>,
    property: Property,
  },
  /// Call of a bound native function; `callee` is a reference string such
  /// as `"$ref:functions.string.upper"`.
  Call {
    callee: String,
    args: Vec<Expression>,
  },
  Object(BTreeMap<String, Expression>),
  Array(Vec<Expression>),
  Unknown {
    kind: String,
  },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
  Const,
  Let,
}

/// Where an assignment writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignTarget {
  Local(String),
  Param(String),
  /// A reference target outside the writable namespaces. Assigning to it
  /// has no effect.
  Unsupported(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
  pub param: String,
  pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
  Declaration {
    kind: DeclarationKind,
    name: String,
    value: Option<Expression>,
  },
  Assignment {
    target: AssignTarget,
    value: Option<Expression>,
  },
  If {
    condition: Expression,
    then: Vec<Statement>,
    otherwise: Vec<Statement>,
  },
  Return {
    value: Option<Expression>,
  },
  TryCatch {
    body: Vec<Statement>,
    catch: Option<CatchClause>,
    finally: Vec<Statement>,
  },
  /// A call evaluated for its side effects only.
  Call(Expression),
  ForEach {
    iterator: String,
    iterable: Expression,
    body: Vec<Statement>,
  },
  Comment,
  Unknown {
    kind: String,
  },
}

impl Expression {
  /// Parse an expression from a JSON definition.
  pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
    let kind = match &value {
      Value::Object(map) => match map.get("type").and_then(Value::as_str) {
        Some(kind) => kind.to_string(),
        None => {
          return Ok(Self::Unknown {
            kind: String::new(),
          });
        }
      },
      _ => return Ok(Self::Value(value)),
    };

    if !EXPRESSION_KINDS.contains(&kind.as_str()) {
      return Ok(Self::Unknown { kind });
    }

    let raw: RawExpression = serde_json::from_value(value)?;
    raw.into_expression()
  }

  /// A reference expression, e.g. `Expression::reference("local.x")`.
  pub fn reference(path: &str) -> Self {
    Self::Value(Value::String(format!("{}{}", REF_PREFIX, path)))
  }
}

impl<'de> Deserialize<'de> for Expression {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Expression::from_value(value).map_err(de::Error::custom)
  }
}

impl Statement {
  /// Parse a statement from a JSON definition.
  pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
    let kind = value
      .get("type")
      .and_then(Value::as_str)
      .unwrap_or_default()
      .to_string();

    if !STATEMENT_KINDS.contains(&kind.as_str()) {
      return Ok(Self::Unknown { kind });
    }

    let raw: RawStatement = serde_json::from_value(value)?;
    Ok(raw.into_statement())
  }
}

impl<'de> Deserialize<'de> for Statement {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Statement::from_value(value).map_err(de::Error::custom)
  }
}

impl AssignTarget {
  fn parse(target: &str) -> Self {
    let Some(path) = target.strip_prefix(REF_PREFIX) else {
      return Self::Local(target.to_string());
    };
    match path.split_once('.') {
      Some(("local" | "local_vars", name)) if !name.contains('.') => Self::Local(name.to_string()),
      Some(("params", name)) if !name.contains('.') => Self::Param(name.to_string()),
      _ => Self::Unsupported(target.to_string()),
    }
  }
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawExpression {
  StringLiteral {
    value: String,
  },
  NumberLiteral {
    value: serde_json::Number,
  },
  BooleanLiteral {
    value: bool,
  },
  NullLiteral {},
  TemplateLiteral {
    template: String,
  },
  BinaryExpression {
    operator: BinaryOp,
    left: Box<Expression>,
    right: Box<Expression>,
  },
  LogicalExpression {
    operator: LogicalOp,
    left: Box<Expression>,
    right: Box<Expression>,
  },
  UnaryExpression {
    operator: UnaryOp,
    argument: Box<Expression>,
  },
  ConditionalExpression {
    test: Box<Expression>,
    consequent: Box<Expression>,
    alternate: Box<Expression>,
  },
  MemberAccess {
    object: Box<Expression>,
    property: Value,
    #[serde(default)]
    computed: bool,
  },
  CallExpression {
    callee: String,
    #[serde(default)]
    args: Vec<Expression>,
  },
  ObjectLiteral {
    #[serde(default)]
    properties: BTreeMap<String, Expression>,
  },
  ArrayLiteral {
    #[serde(default)]
    elements: Vec<Expression>,
  },
}

impl RawExpression {
  fn into_expression(self) -> Result<Expression, serde_json::Error> {
    Ok(match self {
      Self::StringLiteral { value } => Expression::StringLiteral(value),
      Self::NumberLiteral { value } => Expression::NumberLiteral(value),
      Self::BooleanLiteral { value } => Expression::BooleanLiteral(value),
      Self::NullLiteral {} => Expression::NullLiteral,
      Self::TemplateLiteral { template } => Expression::Template(template),
      Self::BinaryExpression {
        operator,
        left,
        right,
      } => Expression::Binary {
        op: operator,
        left,
        right,
      },
      Self::LogicalExpression {
        operator,
        left,
        right,
      } => Expression::Logical {
        op: operator,
        left,
        right,
      },
      Self::UnaryExpression { operator, argument } => Expression::Unary {
        op: operator,
        argument,
      },
      Self::ConditionalExpression {
        test,
        consequent,
        alternate,
      } => Expression::Conditional {
        test,
        consequent,
        alternate,
      },
      Self::MemberAccess {
        object,
        property,
        computed,
      } => {
        let property = if computed {
          Property::Computed(Box::new(Expression::from_value(property)?))
        } else {
          match property {
            Value::String(name) => Property::Named(name),
            other => Property::Named(other.to_string()),
          }
        };
        Expression::Member { object, property }
      }
      Self::CallExpression { callee, args } => Expression::Call { callee, args },
      Self::ObjectLiteral { properties } => Expression::Object(properties),
      Self::ArrayLiteral { elements } => Expression::Array(elements),
    })
  }
}

/// Deserialize a field that is present in the definition, keeping an
/// explicit `null` as a null expression rather than `None`.
pub(crate) fn present<'de, D: Deserializer<'de>>(
  deserializer: D,
) -> Result<Option<Expression>, D::Error> {
  Expression::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
struct RawCatch {
  #[serde(default)]
  param: Option<String>,
  #[serde(default)]
  body: Vec<Statement>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawStatement {
  ConstDeclaration {
    name: String,
    #[serde(default, deserialize_with = "present")]
    value: Option<Expression>,
  },
  LetDeclaration {
    name: String,
    #[serde(default, deserialize_with = "present")]
    value: Option<Expression>,
  },
  Assignment {
    target: String,
    #[serde(default, deserialize_with = "present")]
    value: Option<Expression>,
  },
  IfStatement {
    condition: Expression,
    #[serde(default)]
    then: Vec<Statement>,
    #[serde(default, rename = "else")]
    otherwise: Vec<Statement>,
  },
  Return {
    #[serde(default, deserialize_with = "present")]
    value: Option<Expression>,
  },
  TryCatch {
    #[serde(default, rename = "try")]
    body: Vec<Statement>,
    #[serde(default)]
    catch: Option<RawCatch>,
    #[serde(default)]
    finally: Vec<Statement>,
  },
  CallExpression {
    callee: String,
    #[serde(default)]
    args: Vec<Expression>,
  },
  ForEachLoop {
    iterator: String,
    iterable: Expression,
    #[serde(default)]
    body: Vec<Statement>,
  },
  Comment {},
}

impl RawStatement {
  fn into_statement(self) -> Statement {
    match self {
      Self::ConstDeclaration { name, value } => Statement::Declaration {
        kind: DeclarationKind::Const,
        name,
        value,
      },
      Self::LetDeclaration { name, value } => Statement::Declaration {
        kind: DeclarationKind::Let,
        name,
        value,
      },
      Self::Assignment { target, value } => Statement::Assignment {
        target: AssignTarget::parse(&target),
        value,
      },
      Self::IfStatement {
        condition,
        then,
        otherwise,
      } => Statement::If {
        condition,
        then,
        otherwise,
      },
      Self::Return { value } => Statement::Return { value },
      Self::TryCatch {
        body,
        catch,
        finally,
      } => Statement::TryCatch {
        body,
        catch: catch.map(|c| CatchClause {
          param: c.param.unwrap_or_else(|| "err".to_string()),
          body: c.body,
        }),
        finally,
      },
      Self::CallExpression { callee, args } => Statement::Call(Expression::Call { callee, args }),
      Self::ForEachLoop {
        iterator,
        iterable,
        body,
      } => Statement::ForEach {
        iterator,
        iterable,
        body,
      },
      Self::Comment {} => Statement::Comment,
    }
  }
}
