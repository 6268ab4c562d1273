//! Tree-walking evaluator

use super::parser::{ArithOp, Expr, LogicOp};
use super::{ExpressionError, Function, Variable};
use crate::color::conversion::hue_angle;

/// Values bound to the free variables of an expression
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bindings {
    pub r: Option<f64>,
    pub g: Option<f64>,
    pub b: Option<f64>,
    pub value: Option<f64>,
}

impl Bindings {
    /// Bindings for a metric expression
    pub fn channels(r: f64, g: f64, b: f64) -> Self {
        Self {
            r: Some(r),
            g: Some(g),
            b: Some(b),
            value: None,
        }
    }

    /// Bindings for a threshold predicate
    pub fn value(value: f64) -> Self {
        Self {
            value: Some(value),
            ..Self::default()
        }
    }

    fn get(&self, variable: Variable) -> Result<f64, ExpressionError> {
        let bound = match variable {
            Variable::R => self.r,
            Variable::G => self.g,
            Variable::B => self.b,
            Variable::Value => self.value,
        };
        bound.ok_or(ExpressionError::Unbound { variable })
    }
}

pub fn eval_number(expr: &Expr, bindings: &Bindings) -> Result<f64, ExpressionError> {
    match expr {
        Expr::Number(value) => Ok(*value),
        Expr::Var(variable) => bindings.get(*variable),
        Expr::Neg(inner) => Ok(-eval_number(inner, bindings)?),
        Expr::Arith { op, lhs, rhs } => {
            let lhs = eval_number(lhs, bindings)?;
            let rhs = eval_number(rhs, bindings)?;
            Ok(match op {
                ArithOp::Add => lhs + rhs,
                ArithOp::Sub => lhs - rhs,
                ArithOp::Mul => lhs * rhs,
                ArithOp::Div => lhs / rhs,
            })
        }
        Expr::Call { function, args } => {
            let values = args
                .iter()
                .map(|arg| eval_number(arg, bindings))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(call(*function, &values))
        }
        Expr::Compare { .. } | Expr::Logic { .. } | Expr::Not(_) => {
            Err(ExpressionError::NotNumeric)
        }
    }
}

pub fn eval_bool(expr: &Expr, bindings: &Bindings) -> Result<bool, ExpressionError> {
    match expr {
        Expr::Compare { first, rest } => {
            let mut lhs = eval_number(first, bindings)?;
            for (op, rhs_expr) in rest {
                let rhs = eval_number(rhs_expr, bindings)?;
                if !op.apply(lhs, rhs) {
                    return Ok(false);
                }
                lhs = rhs;
            }
            Ok(true)
        }
        Expr::Logic { op, lhs, rhs } => match op {
            LogicOp::And => Ok(eval_bool(lhs, bindings)? && eval_bool(rhs, bindings)?),
            LogicOp::Or => Ok(eval_bool(lhs, bindings)? || eval_bool(rhs, bindings)?),
        },
        Expr::Not(inner) => Ok(!eval_bool(inner, bindings)?),
        _ => Err(ExpressionError::NotBoolean),
    }
}

fn call(function: Function, args: &[f64]) -> f64 {
    match function {
        Function::HueAngle => hue_angle(args[0], args[1], args[2]),
    }
}
