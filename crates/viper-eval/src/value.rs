//! Runtime values.

use crate::config::Truthiness;
use crate::error::{EvalError, EvalResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;
use viper_types::ast::{BinaryOp, FuncDef};

/// The discriminant of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    None,
    Bool,
    Int,
    Function,
    Unsupported,
}

impl Kind {
    /// Python's name for the kind, used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Kind::None => "NoneType",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Function => "function",
            Kind::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A dynamically-typed runtime value. Cheap to clone.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    /// Shares the definition with the AST that declared it.
    Function(Rc<FuncDef>),
    /// Placeholder for kinds this subset does not produce yet.
    Unsupported(String),
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::None => Kind::None,
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::Function(_) => Kind::Function,
            Value::Unsupported(_) => Kind::Unsupported,
        }
    }

    pub fn is_truthy(&self, mode: Truthiness) -> bool {
        match (mode, self) {
            (_, Value::Bool(b)) => *b,
            (Truthiness::Strict, _) => false,
            (Truthiness::Python, Value::Int(n)) => *n != 0,
            (Truthiness::Python, Value::Function(_)) => true,
            (Truthiness::Python, Value::None | Value::Unsupported(_)) => false,
        }
    }

    pub fn add(&self, other: &Value) -> EvalResult<Value> {
        self.int_arith(other, BinaryOp::Add, i64::checked_add)
    }

    pub fn sub(&self, other: &Value) -> EvalResult<Value> {
        self.int_arith(other, BinaryOp::Sub, i64::checked_sub)
    }

    fn int_arith(
        &self,
        other: &Value,
        op: BinaryOp,
        apply: fn(i64, i64) -> Option<i64>,
    ) -> EvalResult<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => apply(*a, *b)
                .map(Value::Int)
                .ok_or_else(|| EvalError::ArithmeticOverflow(format!("{a} {op} {b}"))),
            _ => Err(unsupported_operands(op, self, other)),
        }
    }

    /// Evaluate one link of a comparison chain.
    pub fn compare(&self, op: BinaryOp, other: &Value) -> EvalResult<bool> {
        match op {
            BinaryOp::Eq => Ok(self == other),
            BinaryOp::NotEq => Ok(self != other),
            // Values are immutable, so identity coincides with equality.
            BinaryOp::Is => Ok(self == other),
            BinaryOp::IsNot => Ok(self != other),
            BinaryOp::In | BinaryOp::NotIn => Err(EvalError::TypeMismatch(format!(
                "argument of type '{}' is not iterable",
                other.kind()
            ))),
            BinaryOp::Lt | BinaryOp::LtE | BinaryOp::Gt | BinaryOp::GtE => match (self, other) {
                (Value::Int(a), Value::Int(b)) => Ok(match op {
                    BinaryOp::Lt => a < b,
                    BinaryOp::LtE => a <= b,
                    BinaryOp::Gt => a > b,
                    _ => a >= b,
                }),
                _ => Err(EvalError::TypeMismatch(format!(
                    "'{op}' not supported between instances of '{}' and '{}'",
                    self.kind(),
                    other.kind()
                ))),
            },
            _ => Err(EvalError::NotImplemented(format!("'{op}' is not a comparison"))),
        }
    }

    /// Unwrap into the raw payload handed to host code.
    pub fn to_host(&self) -> HostValue {
        match self {
            Value::None | Value::Unsupported(_) => HostValue::None,
            Value::Bool(b) => HostValue::Bool(*b),
            Value::Int(n) => HostValue::Int(*n),
            Value::Function(def) => HostValue::Function(def.name.clone()),
        }
    }
}

fn unsupported_operands(op: BinaryOp, lhs: &Value, rhs: &Value) -> EvalError {
    EvalError::TypeMismatch(format!(
        "unsupported operand type(s) for {op}: '{}' and '{}'",
        lhs.kind(),
        rhs.kind()
    ))
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Unsupported(a), Value::Unsupported(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Function(def) => write!(f, "<function {}>", def.name),
            Value::Unsupported(what) => write!(f, "<{what}>"),
        }
    }
}

/// A raw payload crossing the host boundary.
///
/// Serialises as plain JSON: `null`, `true`, `7`, or a function's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostValue {
    None,
    Bool(bool),
    Int(i64),
    Function(String),
}

impl From<i64> for HostValue {
    fn from(n: i64) -> Self {
        HostValue::Int(n)
    }
}

impl From<bool> for HostValue {
    fn from(b: bool) -> Self {
        HostValue::Bool(b)
    }
}
