//! Sandboxed expression language for substrate metrics and thresholds
//!
//! Substrate definitions carry small formulas such as `r / g` or
//! `1.5 <= value <= 2`. They are tokenized, parsed into a typed tree and
//! checked against an allow-list of variables and functions when the
//! substrate is loaded. Nothing outside the allow-list can be named, so an
//! expression can never reach the host environment.
//!
//! - Metric scope: variables `r`, `g`, `b`; must produce a number.
//! - Threshold scope: variable `value`; must produce a boolean.
//! - Functions: `hue_angle(r, g, b)`.

mod eval;
mod lexer;
mod parser;

use std::fmt;

use thiserror::Error;

pub use eval::Bindings;
pub use parser::Expr;

/// Free variables an expression may reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variable {
    R,
    G,
    B,
    Value,
}

impl Variable {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "r" => Some(Variable::R),
            "g" => Some(Variable::G),
            "b" => Some(Variable::B),
            "value" => Some(Variable::Value),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Variable::R => "r",
            Variable::G => "g",
            Variable::B => "b",
            Variable::Value => "value",
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Allow-listed functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    HueAngle,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "hue_angle" => Some(Function::HueAngle),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::HueAngle => "hue_angle",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Function::HueAngle => 3,
        }
    }
}

/// Context an expression is compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Metric formula over channel means
    Metric,
    /// Classification predicate over the metric value
    Threshold,
}

impl Scope {
    fn allows(self, variable: Variable) -> bool {
        match self {
            Scope::Metric => matches!(variable, Variable::R | Variable::G | Variable::B),
            Scope::Threshold => variable == Variable::Value,
        }
    }

    fn result_kind(self) -> ValueKind {
        match self {
            Scope::Metric => ValueKind::Number,
            Scope::Threshold => ValueKind::Boolean,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Metric => f.write_str("metric (r, g, b)"),
            Scope::Threshold => f.write_str("threshold (value)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Number,
    Boolean,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Number => f.write_str("number"),
            ValueKind::Boolean => f.write_str("boolean"),
        }
    }
}

/// Compile- and run-time failures of an expression
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("expression is empty")]
    Empty,

    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("invalid number '{literal}' at offset {offset}")]
    InvalidNumber { literal: String, offset: usize },

    #[error("unexpected {found} at offset {offset}")]
    UnexpectedToken { found: String, offset: usize },

    #[error("unexpected end of expression, expected {expected}")]
    UnexpectedEnd { expected: String },

    #[error("unknown identifier '{name}' at offset {offset} in {scope} expression")]
    UnknownIdentifier {
        name: String,
        offset: usize,
        scope: Scope,
    },

    #[error("unknown function '{name}' at offset {offset}")]
    UnknownFunction { name: String, offset: usize },

    #[error("function '{function}' takes {expected} arguments, got {found}")]
    Arity {
        function: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("expected {expected} at offset {offset}, found {found}")]
    TypeMismatch {
        expected: ValueKind,
        found: ValueKind,
        offset: usize,
    },

    #[error("variable '{variable}' is not bound")]
    Unbound { variable: Variable },

    #[error("expression does not produce a number")]
    NotNumeric,

    #[error("expression does not produce a boolean")]
    NotBoolean,

    #[error("expression evaluated to a non-finite number ({value})")]
    NonFinite { value: f64 },
}

/// A parsed and type-checked expression
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpression {
    source: String,
    scope: Scope,
    tree: Expr,
}

impl CompiledExpression {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn tree(&self) -> &Expr {
        &self.tree
    }

    /// Evaluate a metric expression; non-finite results are errors
    pub fn evaluate_number(&self, bindings: &Bindings) -> Result<f64, ExpressionError> {
        let value = eval::eval_number(&self.tree, bindings)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ExpressionError::NonFinite { value })
        }
    }

    /// Evaluate a threshold predicate
    pub fn evaluate_bool(&self, bindings: &Bindings) -> Result<bool, ExpressionError> {
        eval::eval_bool(&self.tree, bindings)
    }
}

impl fmt::Display for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Tokenize, parse and type-check `source` for `scope`
pub fn compile(source: &str, scope: Scope) -> Result<CompiledExpression, ExpressionError> {
    let tokens = lexer::tokenize(source)?;
    let tree = parser::parse(&tokens, scope, source.len())?;

    let expected = scope.result_kind();
    if tree.kind() != expected {
        return Err(ExpressionError::TypeMismatch {
            expected,
            found: tree.kind(),
            offset: 0,
        });
    }

    Ok(CompiledExpression {
        source: source.trim().to_string(),
        scope,
        tree,
    })
}
